//! Protocol constants and REST endpoint paths.

/// Parent id carried by session-initial messages.
pub const ROOT_ID: &str = "3713";

/// Smallest session time-to-live the service accepts, in seconds.
pub const MIN_TTL_SECS: u64 = 300;

/// Default session time-to-live (one day).
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default session language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Header carrying the API key on REST calls.
pub const API_KEY_HEADER: &str = "x-api-key";

/// REST control-plane endpoints, relative to the HTTP base URL.
pub mod endpoints {
    /// User info, sessions and available models.
    pub const USER_INFO: &str = "/v1/user/info";
    /// Single-shot generation.
    pub const GENERATE: &str = "/v1/session/generate";
    /// Session registration.
    pub const REGISTER_SESSION: &str = "/v1/session/register";
    /// Session fetch (`?session_id=`).
    pub const GET_SESSION: &str = "/v1/session/get";
    /// Session metadata update.
    pub const UPDATE_SESSION: &str = "/v1/session/update";
    /// Session deletion.
    pub const DELETE_SESSION: &str = "/v1/session/delete";
    /// Feedback and bug reports.
    pub const SEND_FEEDBACK: &str = "/v1/session/feedback";
    /// File attachment.
    pub const ATTACH_FILE: &str = "/v1/session/attach_file";
    /// File detachment by position.
    pub const DETACH_FILE: &str = "/v1/session/detach_file";
    /// Links an uploaded logs table to a session.
    pub const ATTACH_LOGS: &str = "/v1/session/attach_logs";
    /// Default duplex stream path, relative to the websocket base URL.
    pub const STREAM: &str = "/v1/session/stream";
}

/// Log-ingestion sidecar endpoints, relative to the logs processor URL.
pub mod logs_endpoints {
    /// Creates (or detects) the table for a content hash.
    pub const CREATE_LOGS_TABLE: &str = "/create_logs_table";
    /// Uploads one batch of JSONL lines.
    pub const UPLOAD_LOGS: &str = "/upload_logs";
}
