//! Attachment handling.
//!
//! An uploaded file is base64-encoded once into a [`NormalizedMedia`]; each
//! provider derives its own inline-content shape from that value through its
//! [`ContentAdapter`](crate::providers::ContentAdapter).

pub mod upload;

use base64::engine::general_purpose::STANDARD as B64_ENGINE;
use base64::Engine;

pub use upload::TempUpload;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// An attachment encoded for inline embedding in provider requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMedia {
    mime_type: String,
    data: String,
}

impl NormalizedMedia {
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Standard base64 of the original bytes.
    pub fn base64(&self) -> &str {
        &self.data
    }

    /// `data:` URL form, as used by OpenAI image parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encode raw attachment bytes. The bytes are consumed and not retained.
pub fn normalize(bytes: Vec<u8>, mime_type: &str) -> NormalizedMedia {
    let mime_type = mime_type.trim();
    let mime_type = if mime_type.is_empty() {
        FALLBACK_MIME_TYPE
    } else {
        mime_type
    };

    NormalizedMedia {
        mime_type: mime_type.to_string(),
        data: B64_ENGINE.encode(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_encodes_once() {
        let media = normalize(b"hello".to_vec(), "text/plain");
        assert_eq!(media.base64(), "aGVsbG8=");
        assert_eq!(media.mime_type(), "text/plain");
        assert_eq!(media.data_url(), "data:text/plain;base64,aGVsbG8=");
    }

    #[test]
    fn test_missing_mime_type_falls_back() {
        let media = normalize(vec![0, 1, 2], "  ");
        assert_eq!(media.mime_type(), "application/octet-stream");
        assert_eq!(media.base64(), "AAEC");
    }
}
