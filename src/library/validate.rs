//! Upload validation
//!
//! Rejections happen before a file enters the pipeline and are reported
//! per file; one bad file never blocks its siblings.

use base64::Engine;

/// Image MIME types the pipeline accepts
const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/bmp",
    "image/tiff",
];

/// Validate a single upload before it enters the pipeline.
///
/// Returns the resolved MIME type on success, a human-readable reason
/// on rejection.
pub fn validate_file(name: &str, size: u64, max_size: u64) -> Result<String, String> {
    if size == 0 {
        return Err("file is empty".to_string());
    }

    if size > max_size {
        return Err(format!("file too large: {} bytes (max {})", size, max_size));
    }

    let mime = mime_guess::from_path(name).first_or_octet_stream();
    let mime = mime.essence_str().to_string();

    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(format!("unsupported file type: {}", mime));
    }

    Ok(mime)
}

/// Read the pixel dimensions of an image without decoding it fully.
///
/// Returns None for unreadable data; dimensions are advisory (the
/// coordinate transform degrades to identity without them).
pub fn sniff_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Decode a `data:<mime>;base64,<payload>` URI into its MIME type and
/// raw bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URI".to_string())?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URI has no payload".to_string())?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| "only base64 data URIs are supported".to_string())?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| format!("invalid base64 payload: {}", e))?;

    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_image_types() {
        assert_eq!(validate_file("scan.jpg", 100, 1000).unwrap(), "image/jpeg");
        assert_eq!(validate_file("scan.png", 100, 1000).unwrap(), "image/png");
    }

    #[test]
    fn test_rejects_bad_files() {
        assert!(validate_file("notes.txt", 100, 1000).is_err());
        assert!(validate_file("scan.jpg", 0, 1000).is_err());
        assert!(validate_file("scan.jpg", 2000, 1000).is_err());
    }

    #[test]
    fn test_decode_data_uri() {
        let uri = "data:image/png;base64,aGVsbG8=";
        let (mime, bytes) = decode_data_uri(uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_malformed_uris() {
        assert!(decode_data_uri("http://example.com/x.png").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:image/png,plain").is_err());
        assert!(decode_data_uri("data:image/png;base64,!!!").is_err());
    }
}
