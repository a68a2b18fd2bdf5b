//! # secgemini-core
//!
//! Wire types and protocol vocabulary shared by every Sec-Gemini crate.
//!
//! - **Messages**: the [`Message`] envelope exchanged over REST and the duplex stream
//! - **Content**: mime-aware payload codec ([`Content`], [`ContentError`])
//! - **Enums**: roles, message types, lifecycle states, response status codes
//! - **Usage**: additive token accounting with [`Usage::tally`]
//! - **Models**: [`ModelInfo`] and model-string parsing
//! - **Session records**: server-owned session, file, user and operation result types
//! - **Tools**: [`LocalTool`] declarations and [`ToolOutput`] payloads
//! - **Retry**: linear reconnect backoff for the streaming engine

#![deny(unsafe_code)]

pub mod constants;
pub mod content;
pub mod enums;
pub mod messages;
pub mod mime;
pub mod model;
pub mod retry;
pub mod session;
pub mod status;
pub mod tools;
pub mod usage;

pub use content::{Content, ContentError};
pub use enums::{FeedbackType, MessageType, Role, State, UserType};
pub use messages::Message;
pub use mime::MimeType;
pub use model::{ModelInfo, ModelParseError};
pub use retry::Backoff;
pub use session::{
    Attachment, DetachFileRequest, Feedback, OpResult, PublicLogsTable, PublicSession,
    PublicSessionFile, PublicUser, SessionRequest, SessionResponse, UserInfo,
};
pub use status::ResponseStatus;
pub use tools::{LocalTool, ParamType, ToolOutput, ToolParam, ToolParameterSchema};
pub use usage::Usage;
