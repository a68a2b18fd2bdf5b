//! Tool error types.

use thiserror::Error;

/// Errors raised while decoding, validating or running a local tool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Arguments do not match the tool's declaration.
    #[error("{message}")]
    Validation {
        /// Description of the mismatch.
        message: String,
    },

    /// The tool body failed.
    #[error("{message}")]
    Failed {
        /// Failure reported by the tool.
        message: String,
    },

    /// The tool body panicked.
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },

    /// A `LOCAL_TOOL_CALL` payload could not be decoded.
    #[error("malformed tool call: {message}")]
    MalformedCall {
        /// What was wrong with the payload.
        message: String,
    },
}

impl ToolError {
    /// A failure reported by a tool body.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed {
            message: message.to_string(),
        }
    }

    /// An argument validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_displays_bare_message() {
        assert_eq!(ToolError::failed("disk full").to_string(), "disk full");
    }

    #[test]
    fn panicked_display() {
        let err = ToolError::Panicked {
            message: "index out of bounds".into(),
        };
        assert_eq!(err.to_string(), "panicked: index out of bounds");
    }

    #[test]
    fn malformed_call_display() {
        let err = ToolError::MalformedCall {
            message: "content is not a JSON object".into(),
        };
        assert!(err.to_string().starts_with("malformed tool call"));
    }
}
