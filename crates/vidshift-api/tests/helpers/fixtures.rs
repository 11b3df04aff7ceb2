//! Test fixtures: request bodies and fake video payloads.

use axum_test::multipart::{MultipartForm, Part};

/// Bytes starting with an ISO BMFF `ftyp` box; enough to pass as an mp4.
pub fn sample_video_bytes() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypmp42");
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    data.extend_from_slice(b"mp42isom");
    data.extend(std::iter::repeat(0xAB).take(512));
    data
}

/// Multipart form with a single `file` field.
pub fn video_form(filename: &str, data: Vec<u8>) -> MultipartForm {
    let part = Part::bytes(data)
        .file_name(filename.to_string())
        .mime_type("video/mp4");
    MultipartForm::new().add_part("file", part)
}

pub fn generate_body(video_url: &str) -> serde_json::Value {
    serde_json::json!({
        "video": video_url,
        "prompt_text": "cinematic color grade",
    })
}
