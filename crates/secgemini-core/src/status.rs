//! Application-level response status codes.
//!
//! These travel inside messages and operation results and are distinct from
//! the HTTP status of the request that carried them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Application-level status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseStatus(pub u16);

impl ResponseStatus {
    /// Success.
    pub const OK: Self = Self(200);
    /// Partial content.
    pub const PARTIAL_CONTENT: Self = Self(206);
    /// Malformed request.
    pub const BAD_REQUEST: Self = Self(400);
    /// Missing or invalid API key.
    pub const AUTHENTICATION_ERROR: Self = Self(401);
    /// Unknown resource.
    pub const NOT_FOUND: Self = Self(404);
    /// Resource already exists.
    pub const ALREADY_EXISTS: Self = Self(409);
    /// Rate or token quota exceeded.
    pub const QUOTA_EXCEEDED: Self = Self(429);
    /// Server-side or local execution failure.
    pub const SERVER_ERROR: Self = Self(500);

    /// Whether this is exactly [`ResponseStatus::OK`].
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Numeric code.
    pub fn code(self) -> u16 {
        self.0
    }
}

impl Default for ResponseStatus {
    fn default() -> Self {
        Self::OK
    }
}

impl From<u16> for ResponseStatus {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
