//! Client error types.

use std::time::Duration;

use thiserror::Error;

/// Failures of the duplex connection. All of them are retried by the
/// stream engine until its attempt budget is spent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The handshake failed.
    #[error("connect to {url} failed: {message}")]
    Connect {
        /// Target URL with credentials removed.
        url: String,
        /// Underlying failure.
        message: String,
    },
    /// An operation did not finish in time.
    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// What was being waited for.
        operation: &'static str,
        /// The bound that was exceeded.
        timeout: Duration,
    },
    /// The peer went away.
    #[error("connection closed: {reason}")]
    Closed {
        /// Close reason, if the peer sent one.
        reason: String,
    },
    /// No pong arrived within the heartbeat timeout.
    #[error("heartbeat failed: {message}")]
    Heartbeat {
        /// Detail.
        message: String,
    },
    /// Reading or writing a frame failed.
    #[error("websocket I/O error: {message}")]
    Io {
        /// Underlying failure.
        message: String,
    },
    /// A frame could not be encoded or decoded as a message.
    #[error("protocol error: {message}")]
    Protocol {
        /// Detail.
        message: String,
    },
}

impl TransportError {
    /// Connection closed with a reason.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::Closed {
            reason: reason.into(),
        }
    }
}

/// The one failure a stream surfaces to its consumer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// Every allowed connection attempt failed.
    #[error("stream failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Connection attempts made.
        attempts: u32,
        /// The error that ended the final attempt.
        last_error: TransportError,
    },
}

/// Failures of session operations that cannot degrade to a sentinel.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A precondition failed before any I/O.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },
    /// The request did not produce a usable HTTP response.
    #[error("{operation} failed: {message}")]
    Http {
        /// Operation name.
        operation: &'static str,
        /// Transport or HTTP status detail.
        message: String,
    },
    /// The service answered with a non-OK application status.
    #[error("{operation} rejected with status {status}: {message}")]
    Status {
        /// Operation name.
        operation: &'static str,
        /// Application status code.
        status: u16,
        /// Service status message.
        message: String,
    },
    /// The response body did not have the expected shape.
    #[error("{operation} returned an unexpected body: {source}")]
    Decode {
        /// Operation name.
        operation: &'static str,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Local file access failed.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Invalid client configuration.
    #[error(transparent)]
    Settings(#[from] secgemini_settings::SettingsError),
}

impl SessionError {
    /// Shorthand for [`SessionError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_in_millis() {
        let err = TransportError::Timeout {
            operation: "websocket handshake",
            timeout: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "websocket handshake timed out after 2000ms");
    }

    #[test]
    fn retries_exhausted_display() {
        let err = StreamError::RetriesExhausted {
            attempts: 5,
            last_error: TransportError::closed("going away"),
        };
        assert_eq!(
            err.to_string(),
            "stream failed after 5 attempts: connection closed: going away"
        );
    }

    #[test]
    fn status_display() {
        let err = SessionError::Status {
            operation: "register session",
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(err.to_string(), "register session rejected with status 401: bad key");
    }

    #[test]
    fn invalid_helper() {
        let err = SessionError::invalid("TTL must be greater than 300 seconds");
        assert!(matches!(err, SessionError::InvalidArgument { .. }));
        assert_eq!(err.to_string(), "invalid argument: TTL must be greater than 300 seconds");
    }
}
