//! Base64 data-URI envelopes for documents and images.

use crate::error::{MergeError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Media type of a WordprocessingML document.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Exact prefix every template payload must start with.
pub const DOCX_DATA_URI_PREFIX: &str =
    "data:application/vnd.openxmlformats-officedocument.wordprocessingml.document;base64,";

/// Decode a base64 payload, ignoring embedded whitespace and line breaks.
fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Check the envelope prefix and decode the DOCX bytes.
///
/// The prefix is checked before anything is decoded, so a mismatch never
/// reaches the archive.
pub fn decode_docx(uri: &str) -> Result<Vec<u8>> {
    let payload = uri
        .strip_prefix(DOCX_DATA_URI_PREFIX)
        .ok_or(MergeError::Envelope(DOCX_DATA_URI_PREFIX))?;
    decode_base64(payload)
}

/// Wrap DOCX bytes in the same envelope the template arrived in.
pub fn encode_docx(bytes: &[u8]) -> String {
    format!("{}{}", DOCX_DATA_URI_PREFIX, STANDARD.encode(bytes))
}

/// Decoded image payload with the media type it declared.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// e.g. `image/png`
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    /// Parse `data:image/<subtype>;base64,<payload>`.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| MergeError::InvalidImage("missing \"data:\" prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| MergeError::InvalidImage("missing ',' separator".into()))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| MergeError::InvalidImage("payload is not base64-encoded".into()))?;

        let subtype = media_type
            .strip_prefix("image/")
            .filter(|s| !s.is_empty() && !s.contains(';'))
            .ok_or_else(|| {
                MergeError::InvalidImage(format!("unsupported media type {:?}", media_type))
            })?;
        log::debug!("Decoding {} image payload", subtype);

        Ok(Self {
            media_type: media_type.to_ascii_lowercase(),
            bytes: decode_base64(payload)?,
        })
    }

    /// File extension derived from the media type
    /// (`image/png` → `png`, `image/svg+xml` → `svg`, `image/x-icon` → `icon`).
    pub fn extension(&self) -> &str {
        let subtype = self
            .media_type
            .split_once('/')
            .map_or(self.media_type.as_str(), |(_, s)| s);
        let subtype = subtype.split('+').next().unwrap_or(subtype);
        subtype.strip_prefix("x-").unwrap_or(subtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_docx_rejects_wrong_prefix() {
        let err = decode_docx("data:application/pdf;base64,AAAA").unwrap_err();
        assert!(matches!(err, MergeError::Envelope(_)));
        assert!(err.to_string().contains(".docx"));
    }

    #[test]
    fn test_docx_envelope_round_trip() {
        let uri = encode_docx(b"PK\x03\x04");
        assert!(uri.starts_with(DOCX_DATA_URI_PREFIX));
        assert_eq!(decode_docx(&uri).unwrap(), b"PK\x03\x04");
    }

    #[test]
    fn test_decode_ignores_line_breaks() {
        let uri = format!("{}UEsD\r\nBA==", DOCX_DATA_URI_PREFIX);
        assert_eq!(decode_docx(&uri).unwrap(), b"PK\x03\x04");
    }

    #[test]
    fn test_bad_base64_is_an_error() {
        let uri = format!("{}not*base64", DOCX_DATA_URI_PREFIX);
        assert!(matches!(decode_docx(&uri), Err(MergeError::Base64(_))));
    }

    #[test]
    fn test_image_data_uri() {
        let img = ImageData::from_data_uri("data:image/png;base64,iVBORw==").unwrap();
        assert_eq!(img.media_type, "image/png");
        assert_eq!(img.extension(), "png");
        assert_eq!(img.bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_image_extensions() {
        let ext = |mt: &str| {
            ImageData {
                media_type: mt.to_string(),
                bytes: Vec::new(),
            }
            .extension()
            .to_string()
        };
        assert_eq!(ext("image/jpeg"), "jpeg");
        assert_eq!(ext("image/svg+xml"), "svg");
        assert_eq!(ext("image/x-emf"), "emf");
    }

    #[test]
    fn test_image_rejects_non_images() {
        assert!(matches!(
            ImageData::from_data_uri("data:text/plain;base64,aGk="),
            Err(MergeError::InvalidImage(_))
        ));
        assert!(matches!(
            ImageData::from_data_uri("image/png;base64,aGk="),
            Err(MergeError::InvalidImage(_))
        ));
        assert!(matches!(
            ImageData::from_data_uri("data:image/png,aGk="),
            Err(MergeError::InvalidImage(_))
        ));
    }
}
