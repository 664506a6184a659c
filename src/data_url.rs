//! Converting binary data to and from `data:` URLs.
//!
//! Batch inputs may carry an inline image payload instead of a filesystem
//! path, and preprocessed images can be handed to URL-based consumers, so we
//! support both directions.

use std::sync::LazyLock;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use regex::Regex;

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// Pattern for parsing a `data:` URL.
static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(?P<mime_type>[^;]+);base64,(?P<data>.+)$")
        .expect("data-URL pattern should compile")
});

/// Decode a `data:` URL into a MIME type and its raw bytes.
///
/// Returns `None` when the URL is not a Base64 `data:` URL or the payload is
/// not valid Base64.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let captures = DATA_URL.captures(url)?;
    let mime_type = captures.name("mime_type")?.as_str().to_string();
    let data = BASE64_STANDARD
        .decode(captures.name("data")?.as_str())
        .ok()?;
    Some((mime_type, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let url = data_url("image/png", b"pretend this is a PNG");
        let (mime_type, data) = decode_data_url(&url).expect("our own URL should decode");
        assert_eq!(mime_type, "image/png");
        assert_eq!(data, b"pretend this is a PNG");
    }

    #[test]
    fn rejects_non_data_urls() {
        assert!(decode_data_url("https://example.com/scan.png").is_none());
        assert!(decode_data_url("data:image/png;base64,@@not base64@@").is_none());
    }
}
