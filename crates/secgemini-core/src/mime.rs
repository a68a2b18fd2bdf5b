//! Mime types carried in the message envelope.

use crate::enums::wire_enum;

wire_enum! {
    /// Mime type of a message payload or attached file.
    MimeType {
        /// Plain text, carried verbatim.
        Text => "text/plain",
        /// JSON document serialized into the content string.
        SerializedJson => "text/serialized-json",
        /// Arbitrary bytes.
        OctetStream => "application/octet-stream",
        /// PDF document.
        Pdf => "application/pdf",
        /// PNG image.
        Png => "image/png",
        /// JPEG image.
        Jpeg => "image/jpeg",
    }
}

/// How the `content` string of a message is encoded for a mime type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEncoding {
    /// Stored verbatim.
    Text,
    /// A JSON document stored as its serialized text.
    Json,
    /// Raw bytes stored as standard base64.
    Base64,
}

impl MimeType {
    /// The content encoding this mime type implies.
    pub fn encoding(&self) -> ContentEncoding {
        match self {
            Self::SerializedJson => ContentEncoding::Json,
            Self::Text => ContentEncoding::Text,
            other if other.as_str().starts_with("text/") => ContentEncoding::Text,
            _ => ContentEncoding::Base64,
        }
    }
}

impl Default for MimeType {
    fn default() -> Self {
        Self::Text
    }
}
