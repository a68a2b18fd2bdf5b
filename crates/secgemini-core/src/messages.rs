//! The message envelope.
//!
//! A [`Message`] is the unit exchanged over both the REST control plane and
//! the duplex stream. Outgoing messages are built with [`Message::build`] or
//! one of the shorthand constructors; incoming messages are decoded with
//! [`Message::from_json`]. Fields the client does not model are kept in
//! [`Message::extra`] so a decode/encode round trip is lossless.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::constants::ROOT_ID;
use crate::content::{self, Content, ContentError};
use crate::enums::{MessageType, Role, State};
use crate::mime::MimeType;
use crate::status::ResponseStatus;
use crate::tools::ToolOutput;
use crate::usage::Usage;

/// Protocol message envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id.
    #[serde(default = "new_id")]
    pub id: String,
    /// Id of the causally preceding message, or [`ROOT_ID`].
    #[serde(default = "root_id")]
    pub parent_id: String,
    /// Conversation turn this message belongs to.
    #[serde(default = "new_turn")]
    pub turn: String,
    /// Group of related messages.
    #[serde(default = "new_id")]
    pub group: String,
    /// Producer label (user, agent or sub-agent name).
    #[serde(default = "default_actor")]
    pub actor: String,
    /// Who produced the message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    /// Unix timestamp in seconds.
    #[serde(default = "now")]
    pub created_at: f64,
    /// What the message carries.
    pub message_type: MessageType,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Lifecycle marker.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: State,
    /// Encoded payload; see [`Message::get_content`].
    #[serde(default)]
    pub content: Option<String>,
    /// Mime type governing how `content` is encoded.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mime_type: MimeType,
    /// Application-level status.
    #[serde(default)]
    pub status_code: ResponseStatus,
    /// Human-readable status.
    #[serde(default = "ok_message")]
    pub status_message: String,
    /// Token usage attributed to this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Server fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// An empty envelope with a fresh id, parented on [`ROOT_ID`].
    pub fn new(role: Role, message_type: MessageType, mime_type: MimeType) -> Self {
        Self {
            id: new_id(),
            parent_id: root_id(),
            turn: new_turn(),
            group: new_id(),
            actor: default_actor(),
            role,
            created_at: now(),
            message_type,
            title: None,
            state: State::Start,
            content: None,
            mime_type,
            status_code: ResponseStatus::OK,
            status_message: ok_message(),
            usage: None,
            extra: Map::new(),
        }
    }

    /// A complete envelope carrying `content`, encoded for `mime_type`.
    pub fn build(
        role: Role,
        message_type: MessageType,
        mime_type: MimeType,
        content: impl Into<Content>,
    ) -> Result<Self, ContentError> {
        Self::new(role, message_type, mime_type).with_content(content)
    }

    /// The user query that opens a stream.
    pub fn query(prompt: &str) -> Self {
        Self {
            state: State::Query,
            content: Some(prompt.to_owned()),
            ..Self::new(Role::User, MessageType::Query, MimeType::Text)
        }
    }

    /// The `LOCAL_TOOL_RESULT` reply to `call`, parented on it.
    ///
    /// Failures carry [`ResponseStatus::SERVER_ERROR`] with the failure text
    /// as status message.
    pub fn tool_result(call: &Message, output: &ToolOutput) -> Self {
        let reply = Self::new(Role::User, MessageType::LocalToolResult, MimeType::SerializedJson)
            .with_parent(call.id.clone());
        let reply = if output.is_error() {
            reply.with_status(ResponseStatus::SERVER_ERROR, output.output.clone())
        } else {
            reply
        };
        let payload = serde_json::to_value(output).unwrap_or(Value::Null);
        Self {
            content: Some(payload.to_string()),
            turn: call.turn.clone(),
            group: call.group.clone(),
            ..reply
        }
    }

    /// Link this message to its causal predecessor.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    /// Set the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    /// Set the application-level status.
    #[must_use]
    pub fn with_status(mut self, status: ResponseStatus, message: impl Into<String>) -> Self {
        self.status_code = status;
        self.status_message = message.into();
        self
    }

    /// Set the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Encode `content` according to this message's mime type.
    pub fn with_content(mut self, content: impl Into<Content>) -> Result<Self, ContentError> {
        self.content = Some(content::encode(&self.mime_type, &content.into())?);
        Ok(self)
    }

    /// Decode the payload according to this message's mime type.
    ///
    /// Returns `Ok(None)` when the message has no content.
    pub fn get_content(&self) -> Result<Option<Content>, ContentError> {
        self.content
            .as_deref()
            .map(|raw| content::decode(&self.mime_type, raw))
            .transpose()
    }

    /// Whether this message legitimately ends a stream.
    pub fn is_terminal(&self) -> bool {
        self.state == State::End || !self.status_code.is_ok()
    }

    /// Whether the content is absent or empty.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty)
    }

    /// Decode a wire frame.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Encode as a wire frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn new_turn() -> String {
    let mut id = new_id();
    id.truncate(8);
    id
}

fn root_id() -> String {
    ROOT_ID.to_owned()
}

fn default_actor() -> String {
    "user".to_owned()
}

fn ok_message() -> String {
    "OK".to_owned()
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
