//! Mime-aware codec for the message `content` string.
//!
//! The envelope always carries content as a string. Its meaning depends on
//! the message mime type:
//!
//! | encoding | stored as | decoded to |
//! |----------|-----------|------------|
//! | text     | verbatim  | [`Content::Text`] |
//! | JSON     | serialized JSON | [`Content::Json`] |
//! | binary   | standard base64 | [`Content::Binary`] |

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use thiserror::Error;

use crate::mime::{ContentEncoding, MimeType};

/// Decoded message payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// Structured JSON.
    Json(Value),
    /// Raw bytes (files, images).
    Binary(Vec<u8>),
}

impl Content {
    /// The text, when this is [`Content::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The JSON value, when this is [`Content::Json`].
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The bytes, when this is [`Content::Binary`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

/// Errors raised while encoding or decoding message content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Content of a binary mime type is not valid base64.
    #[error("invalid base64 content for {mime_type}: {source}")]
    Base64 {
        /// Mime type of the message.
        mime_type: String,
        /// Underlying decode failure.
        #[source]
        source: base64::DecodeError,
    },

    /// Content of a JSON mime type does not parse.
    #[error("invalid JSON content: {source}")]
    Json {
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// Bytes supplied for a textual mime type are not UTF-8.
    #[error("binary content is not valid UTF-8 for {mime_type}")]
    NotUtf8 {
        /// Mime type of the message.
        mime_type: String,
    },
}

/// Decode a raw content string according to `mime_type`.
pub fn decode(mime_type: &MimeType, raw: &str) -> Result<Content, ContentError> {
    match mime_type.encoding() {
        ContentEncoding::Text => Ok(Content::Text(raw.to_owned())),
        ContentEncoding::Json => serde_json::from_str(raw)
            .map(Content::Json)
            .map_err(|source| ContentError::Json { source }),
        ContentEncoding::Base64 => STANDARD
            .decode(raw)
            .map(Content::Binary)
            .map_err(|source| ContentError::Base64 {
                mime_type: mime_type.to_string(),
                source,
            }),
    }
}

/// Encode `content` into the wire string expected for `mime_type`.
pub fn encode(mime_type: &MimeType, content: &Content) -> Result<String, ContentError> {
    match mime_type.encoding() {
        ContentEncoding::Text => match content {
            Content::Text(text) => Ok(text.clone()),
            Content::Json(value) => Ok(value.to_string()),
            Content::Binary(bytes) => utf8(mime_type, bytes),
        },
        ContentEncoding::Json => match content {
            Content::Json(value) => Ok(value.to_string()),
            Content::Text(text) => validated_json(text.clone()),
            Content::Binary(bytes) => validated_json(utf8(mime_type, bytes)?),
        },
        ContentEncoding::Base64 => Ok(match content {
            Content::Binary(bytes) => STANDARD.encode(bytes),
            Content::Text(text) => STANDARD.encode(text.as_bytes()),
            Content::Json(value) => STANDARD.encode(value.to_string().as_bytes()),
        }),
    }
}

fn utf8(mime_type: &MimeType, bytes: &[u8]) -> Result<String, ContentError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ContentError::NotUtf8 {
        mime_type: mime_type.to_string(),
    })
}

fn validated_json(text: String) -> Result<String, ContentError> {
    let _ = serde_json::from_str::<Value>(&text).map_err(|source| ContentError::Json { source })?;
    Ok(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn text_passes_through() {
        let raw = encode(&MimeType::Text, &Content::from("hello")).unwrap();
        assert_eq!(raw, "hello");
        assert_eq!(decode(&MimeType::Text, &raw).unwrap(), Content::Text("hello".into()));
    }

    #[test]
    fn json_is_parsed() {
        let value = json!({"name": "get_weather", "output": "27C"});
        let raw = encode(&MimeType::SerializedJson, &Content::Json(value.clone())).unwrap();
        assert_eq!(decode(&MimeType::SerializedJson, &raw).unwrap(), Content::Json(value));
    }

    #[test]
    fn json_mime_rejects_non_json_text() {
        let err = encode(&MimeType::SerializedJson, &Content::from("not json")).unwrap_err();
        assert_matches!(err, ContentError::Json { .. });
    }

    #[test]
    fn binary_is_base64() {
        let raw = encode(&MimeType::Png, &Content::Binary(vec![0x89, b'P', b'N', b'G'])).unwrap();
        assert_eq!(raw, "iVBORw==");
        assert_eq!(decode(&MimeType::Png, &raw).unwrap().as_bytes(), Some(&[0x89, b'P', b'N', b'G'][..]));
    }

    #[test]
    fn malformed_base64_is_a_decode_error() {
        let err = decode(&MimeType::OctetStream, "%%% not base64").unwrap_err();
        assert_matches!(err, ContentError::Base64 { ref mime_type, .. } if mime_type == "application/octet-stream");
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode(&MimeType::SerializedJson, "{broken").unwrap_err();
        assert_matches!(err, ContentError::Json { .. });
    }

    #[test]
    fn non_utf8_bytes_rejected_for_text() {
        let err = encode(&MimeType::Text, &Content::Binary(vec![0xff, 0xfe])).unwrap_err();
        assert_matches!(err, ContentError::NotUtf8 { .. });
    }
}
