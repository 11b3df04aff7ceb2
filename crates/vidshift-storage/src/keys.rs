//! Shared key generation for storage backends.

use uuid::Uuid;

/// Prefix under which every video is stored.
pub const VIDEO_PREFIX: &str = "videos";

/// Generate a fresh key for a video with the given (lowercase) extension.
pub fn generate_video_key(extension: &str) -> String {
    format!("{}/{}.{}", VIDEO_PREFIX, Uuid::new_v4(), extension)
}

/// Reject keys that could escape the storage root.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty() && !key.contains("..") && !key.starts_with('/') && !key.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_unique() {
        let a = generate_video_key("mp4");
        let b = generate_video_key("mp4");
        assert_ne!(a, b);
        assert!(a.starts_with("videos/"));
        assert!(a.ends_with(".mp4"));
        assert!(is_safe_key(&a));
    }

    #[test]
    fn test_unsafe_keys() {
        assert!(!is_safe_key(""));
        assert!(!is_safe_key("../etc/passwd"));
        assert!(!is_safe_key("/videos/a.mp4"));
        assert!(!is_safe_key("videos\\a.mp4"));
    }
}
