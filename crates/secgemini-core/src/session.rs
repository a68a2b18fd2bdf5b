//! Server-owned records exchanged on the REST control plane.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::constants::DEFAULT_LANGUAGE;
use crate::enums::{FeedbackType, MessageType, State, UserType};
use crate::messages::{Message, now};
use crate::mime::MimeType;
use crate::model::ModelInfo;
use crate::status::ResponseStatus;
use crate::tools::LocalTool;
use crate::usage::Usage;

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// The canonical session record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicSession {
    /// Session id.
    #[serde(default = "new_session_id")]
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Owning organization.
    pub org_id: String,
    /// Model configuration.
    pub model: ModelInfo,
    /// Inactivity time-to-live in seconds.
    pub ttl: u64,
    /// Conversation language.
    #[serde(default = "default_language")]
    pub language: String,
    /// Completed turns.
    #[serde(default)]
    pub turns: u64,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Creation time, unix seconds.
    #[serde(default = "now")]
    pub create_time: f64,
    /// Last update time, unix seconds.
    #[serde(default = "now")]
    pub update_time: f64,
    /// Server-side message count.
    #[serde(default)]
    pub num_messages: u64,
    /// Messages in causal order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Accumulated usage.
    #[serde(default)]
    pub usage: Usage,
    /// Whether the service may log this session.
    #[serde(default = "default_true")]
    pub can_log: bool,
    /// Session lifecycle state.
    #[serde(default)]
    pub state: State,
    /// Attached files. Positions shift down when an earlier file is detached.
    #[serde(default)]
    pub files: Vec<PublicSessionFile>,
    /// Uploaded logs table, if any.
    #[serde(default)]
    pub logs_table: Option<PublicLogsTable>,
    /// Local tools declared at registration.
    #[serde(default)]
    pub local_tools: Vec<LocalTool>,
}

impl PublicSession {
    /// A fresh record owned by `user`, ready for registration.
    pub fn new(user: &PublicUser, model: ModelInfo, ttl: u64) -> Self {
        let created = now();
        Self {
            id: new_session_id(),
            user_id: user.id.clone(),
            org_id: user.org_id.clone(),
            model,
            ttl,
            language: default_language(),
            turns: 0,
            name: String::new(),
            description: String::new(),
            create_time: created,
            update_time: created,
            num_messages: 0,
            messages: Vec::new(),
            usage: Usage::default(),
            can_log: true,
            state: State::Start,
            files: Vec::new(),
            logs_table: None,
            local_tools: Vec::new(),
        }
    }

    /// User-facing messages: text queries and text results.
    pub fn conversation(&self) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| {
                m.mime_type == MimeType::Text
                    && matches!(m.message_type, MessageType::Query | MessageType::Result)
            })
            .collect()
    }
}

/// A file attached to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicSessionFile {
    /// Stored file name.
    #[serde(default)]
    pub filename: String,
    /// Name the file was uploaded with.
    #[serde(default)]
    pub original_filename: Option<String>,
    /// Detected mime type.
    #[serde(default)]
    pub mime_type: Option<MimeType>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A logs table linked to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicLogsTable {
    /// Content hash identifying the uploaded log file.
    #[serde(default)]
    pub logs_hash: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticated user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    /// User id.
    pub id: String,
    /// Organization id.
    pub org_id: String,
    /// Account type.
    #[serde(rename = "type", default)]
    pub user_type: UserType,
    /// Whether the account forbids logging.
    #[serde(default)]
    pub never_log: bool,
    /// Whether the user may disable logging per session.
    #[serde(default)]
    pub can_disable_logging: bool,
    /// API key expiry, unix seconds.
    #[serde(default)]
    pub key_expire_time: u64,
    /// Tokens-per-minute quota.
    #[serde(default)]
    pub tpm: u64,
    /// Requests-per-minute quota.
    #[serde(default)]
    pub rpm: u64,
    /// Whether experimental models are available.
    #[serde(default)]
    pub allow_experimental: bool,
    /// Vendor integrations, passed through untouched.
    #[serde(default)]
    pub vendors: Vec<Value>,
}

/// Response of the user-info endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// The user.
    pub user: PublicUser,
    /// Active sessions.
    #[serde(default)]
    pub sessions: Vec<PublicSession>,
    /// Models the user may select.
    #[serde(default)]
    pub available_models: Vec<ModelInfo>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────────────────────────

/// Application-level result of a control-plane operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpResult {
    /// Application status; only [`ResponseStatus::OK`] is success.
    pub status_code: ResponseStatus,
    /// Human-readable status.
    #[serde(default)]
    pub status_message: String,
    /// Operation payload.
    #[serde(default)]
    pub data: Option<Value>,
}

impl OpResult {
    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.status_code.is_ok()
    }
}

/// Feedback or bug report for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Target session.
    pub session_id: String,
    /// Message group the feedback refers to; empty for the whole session.
    #[serde(default)]
    pub group_id: String,
    /// Feedback kind.
    #[serde(rename = "type")]
    pub kind: FeedbackType,
    /// Score; zero for bug reports.
    #[serde(default)]
    pub score: i32,
    /// Free text.
    #[serde(default)]
    pub comment: String,
}

/// A file upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Target session.
    pub session_id: String,
    /// File name.
    pub filename: String,
    /// Caller-supplied mime type; the service detects one when absent.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Base64-encoded bytes.
    pub content: String,
}

/// Detach a file by its position in the session's file list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachFileRequest {
    /// Target session.
    pub session_id: String,
    /// Position in [`PublicSession::files`].
    pub file_idx: usize,
}

/// Single-shot generation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Session id.
    pub id: String,
    /// Input messages.
    pub messages: Vec<Message>,
    /// Local tools available to the model.
    #[serde(default)]
    pub local_tools: Vec<LocalTool>,
}

/// Single-shot generation response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Session id.
    pub id: String,
    /// Generated messages.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Application status.
    pub status_code: ResponseStatus,
    /// Human-readable status.
    #[serde(default)]
    pub status_message: String,
    /// Usage for this generation.
    #[serde(default)]
    pub usage: Usage,
}

impl SessionResponse {
    /// The text answer: text results joined by spaces, with a line break
    /// after every group that is not the last message.
    pub fn text(&self) -> String {
        let last = self.messages.len().saturating_sub(1);
        let mut parts: Vec<&str> = Vec::new();
        for (idx, msg) in self.messages.iter().enumerate() {
            if msg.mime_type == MimeType::Text && msg.message_type == MessageType::Result {
                parts.push(msg.content.as_deref().unwrap_or_default());
            }
            if msg.message_type == MessageType::GroupEnd && idx < last {
                parts.push("\n");
            }
        }
        parts.join(" ")
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

fn default_true() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
