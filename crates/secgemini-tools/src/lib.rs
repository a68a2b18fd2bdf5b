//! # secgemini-tools
//!
//! Local tools: functions that run on the client machine but are invoked by
//! the remote model.
//!
//! - **Handler trait**: [`LocalToolHandler`] pairs a declaration with its body
//! - **Registry**: [`ToolRegistry`] resolves names, validates arguments and
//!   executes, turning every failure into a [`ToolOutput`](secgemini_core::ToolOutput)
//! - **Calls**: [`ToolCall`] decodes both `tool_name`/`tool_args` and
//!   `name`/`args` envelopes
//! - **Dispatch**: [`ToolRegistry::dispatch`] answers a `LOCAL_TOOL_CALL`
//!   message with the matching `LOCAL_TOOL_RESULT`

#![deny(unsafe_code)]

pub mod call;
pub mod errors;
pub mod registry;
pub mod traits;
mod validate;

pub use call::ToolCall;
pub use errors::ToolError;
pub use registry::ToolRegistry;
pub use traits::{FnTool, LocalToolHandler, ToolArgs};
