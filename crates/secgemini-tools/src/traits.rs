//! The handler trait every local tool implements.

use serde_json::{Map, Value};
use secgemini_core::LocalTool;

use crate::errors::ToolError;

/// Keyword arguments of a tool call.
pub type ToolArgs = Map<String, Value>;

/// A local tool: its declaration plus the function that runs it.
///
/// Execution is synchronous and runs on the stream's receive path, so a slow
/// tool stalls only the session that called it.
pub trait LocalToolHandler: Send + Sync {
    /// Declaration sent to the service.
    fn definition(&self) -> &LocalTool;

    /// Run the tool. The returned value is string-converted for the reply:
    /// JSON strings are sent verbatim, anything else as serialized JSON.
    fn call(&self, args: &ToolArgs) -> Result<Value, ToolError>;

    /// Tool name, the key used for dispatch.
    fn name(&self) -> &str {
        &self.definition().name
    }
}

/// Adapter turning a closure into a [`LocalToolHandler`].
pub struct FnTool<F> {
    definition: LocalTool,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<Value, ToolError> + Send + Sync,
{
    /// Pair a declaration with its body.
    pub fn new(definition: LocalTool, func: F) -> Self {
        Self { definition, func }
    }
}

impl<F> LocalToolHandler for FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<Value, ToolError> + Send + Sync,
{
    fn definition(&self) -> &LocalTool {
        &self.definition
    }

    fn call(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        (self.func)(args)
    }
}
