//! Tool registry: central index of the local tools a session exposes.
//!
//! The [`ToolRegistry`] maps tool names to their [`LocalToolHandler`]s. It is
//! filled once when a session is created and only read afterwards, so it is
//! shared behind an `Arc` without locking.
//!
//! Execution never fails outward: unknown tools, invalid arguments, tool
//! errors and panics all become a failure [`ToolOutput`] that is sent back to
//! the remote model.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use secgemini_core::{LocalTool, Message, ToolOutput};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::call::ToolCall;
use crate::errors::ToolError;
use crate::traits::{FnTool, LocalToolHandler, ToolArgs};
use crate::validate::prepare_args;

/// Central registry mapping tool names to their implementations.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn LocalToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool and return its declaration.
    ///
    /// Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn LocalToolHandler>) -> LocalTool {
        let definition = tool.definition().clone();
        if self.tools.contains_key(&definition.name) {
            debug!(tool_name = %definition.name, "replacing previously registered tool");
        }
        info!(tool_name = %definition.name, description = %definition.description, "registered local tool");
        let _ = self.tools.insert(definition.name.clone(), tool);
        definition
    }

    /// Register a closure as a tool.
    pub fn register_fn<F>(&mut self, definition: LocalTool, func: F) -> LocalTool
    where
        F: Fn(&ToolArgs) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnTool::new(definition, func)))
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn LocalToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Declarations of every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<LocalTool> {
        let mut definitions: Vec<LocalTool> =
            self.tools.values().map(|t| t.definition().clone()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Return all tool names, sorted alphabetically.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Whether a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Run `name` with `args`.
    ///
    /// Success wraps the string-converted return value; every failure is
    /// reported in the output with `is_error` set.
    pub fn execute(&self, name: &str, args: ToolArgs) -> ToolOutput {
        let Some(tool) = self.tools.get(name) else {
            let message = format!("Tool '{name}' not found.");
            warn!(tool_name = %name, "{message}");
            return ToolOutput::failure(name, message);
        };

        let shown = Value::Object(args.clone());
        debug!(tool_name = %name, args = %shown, "executing local tool");
        match run(tool.as_ref(), args) {
            Ok(value) => ToolOutput::success(name, stringify(value)),
            Err(e) => {
                let message = format!("Tool '{name}' execution failed: {e}");
                warn!(tool_name = %name, error = %e, "local tool failed");
                ToolOutput::failure(name, message)
            }
        }
    }

    /// Answer a `LOCAL_TOOL_CALL` message with its `LOCAL_TOOL_RESULT`.
    ///
    /// The reply is parented on the call. Failures carry
    /// a server-error status and the failure text as status message.
    pub fn dispatch(&self, call_message: &Message) -> Message {
        let output = match ToolCall::from_message(call_message) {
            Ok(call) => {
                info!(tool_name = %call.name, call_id = %call_message.id, "received tool call");
                self.execute(&call.name, call.args)
            }
            Err(e) => {
                warn!(call_id = %call_message.id, error = %e, "undecodable tool call");
                ToolOutput::failure("", e.to_string())
            }
        };
        Message::tool_result(call_message, &output)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

fn run(tool: &dyn LocalToolHandler, args: ToolArgs) -> Result<Value, ToolError> {
    let args = prepare_args(&tool.definition().parameters, args)?;
    catch_unwind(AssertUnwindSafe(|| tool.call(&args))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_owned());
        Err(ToolError::Panicked { message })
    })
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
