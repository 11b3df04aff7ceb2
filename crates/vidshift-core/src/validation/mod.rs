//! Upload validation for incoming videos.

use std::path::Path;

use crate::error::AppError;

/// Video extensions accepted by default.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "m4v", "avi", "mkv"];

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Missing file extension (filename: {0})")]
    MissingExtension(String),

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { size, max } => {
                AppError::PayloadTooLarge(format!("{} bytes exceeds max {} bytes", size, max))
            }
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Lowercased extension of `filename`, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Expected MIME type for a video extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "m4v" => "video/x-m4v",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Extension for a video MIME type; parameters such as `; codecs=...` are ignored.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime.to_ascii_lowercase().as_str() {
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        "video/x-m4v" => Some("m4v"),
        "video/x-msvideo" | "video/avi" => Some("avi"),
        "video/x-matroska" => Some("mkv"),
        _ => None,
    }
}

/// Size and extension checks for video files.
#[derive(Debug, Clone)]
pub struct VideoValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl VideoValidator {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate the extension and return it lowercased.
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = extension_of(filename)
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Whether `extension` (lowercase) is accepted.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.iter().any(|e| e == extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> VideoValidator {
        VideoValidator::new(
            1024,
            DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    #[test]
    fn test_accepts_every_default_extension() {
        let v = validator();
        for ext in DEFAULT_VIDEO_EXTENSIONS {
            let name = format!("clip.{}", ext.to_uppercase());
            assert_eq!(v.validate_extension(&name).unwrap(), *ext);
        }
    }

    #[test]
    fn test_rejects_other_extensions() {
        let v = validator();
        assert!(matches!(
            v.validate_extension("image.png"),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            v.validate_extension("noextension"),
            Err(ValidationError::MissingExtension(_))
        ));
    }

    #[test]
    fn test_file_size_limits() {
        let v = validator();
        assert!(matches!(
            v.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(v.validate_file_size(1024).is_ok());
        let err: AppError = v.validate_file_size(2048).unwrap_err().into();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for_extension("mov"), "video/quicktime");
        assert_eq!(content_type_for_extension("xyz"), "application/octet-stream");
        assert_eq!(extension_for_content_type("video/webm; codecs=vp9"), Some("webm"));
        assert_eq!(extension_for_content_type("text/html"), None);
    }
}
