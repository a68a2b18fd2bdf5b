//! Decoding of `LOCAL_TOOL_CALL` payloads.
//!
//! Two envelope conventions are in use and both are accepted:
//!
//! ```text
//! {"tool_name": "get_weather", "tool_args": {"city": "nyc"}}
//! {"name": "get_weather", "args": {"city": "nyc"}}
//! ```
//!
//! The `tool_*` keys win when present and non-empty.

use secgemini_core::{Content, Message};
use serde_json::Value;

use crate::errors::ToolError;
use crate::traits::ToolArgs;

/// A decoded request to run a local tool.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    /// Requested tool; empty when the envelope names none.
    pub name: String,
    /// Keyword arguments.
    pub args: ToolArgs,
}

impl ToolCall {
    /// Decode from a JSON envelope.
    pub fn from_value(value: &Value) -> Result<Self, ToolError> {
        let object = value.as_object().ok_or_else(|| ToolError::MalformedCall {
            message: "payload is not a JSON object".into(),
        })?;

        let name = ["tool_name", "name"]
            .iter()
            .filter_map(|key| object.get(*key).and_then(Value::as_str))
            .find(|name| !name.is_empty())
            .unwrap_or_default()
            .to_owned();

        let mut args = ToolArgs::new();
        for key in ["tool_args", "args"] {
            match object.get(key) {
                Some(Value::Object(found)) if !found.is_empty() => {
                    args.clone_from(found);
                    break;
                }
                None | Some(Value::Null | Value::Object(_)) => {}
                Some(other) => {
                    return Err(ToolError::MalformedCall {
                        message: format!("'{key}' must be an object, got {other}"),
                    });
                }
            }
        }

        Ok(Self { name, args })
    }

    /// Decode from a `LOCAL_TOOL_CALL` message.
    ///
    /// JSON and text payloads are both parsed as JSON; binary payloads are
    /// rejected.
    pub fn from_message(message: &Message) -> Result<Self, ToolError> {
        let malformed = |message: String| ToolError::MalformedCall { message };
        let content = message
            .get_content()
            .map_err(|e| malformed(e.to_string()))?
            .ok_or_else(|| malformed("message has no content".into()))?;

        match content {
            Content::Json(value) => Self::from_value(&value),
            Content::Text(text) => {
                let value: Value = serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;
                Self::from_value(&value)
            }
            Content::Binary(_) => Err(malformed("binary payload".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use secgemini_core::{MessageType, MimeType, Role};
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_tool_prefixed_keys() {
        let call = ToolCall::from_value(&json!({"tool_name": "get_weather", "tool_args": {"city": "nyc"}})).unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.args["city"], "nyc");
    }

    #[test]
    fn decodes_short_keys() {
        let call = ToolCall::from_value(&json!({"name": "get_weather", "args": {"city": "nyc"}})).unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.args["city"], "nyc");
    }

    #[test]
    fn empty_prefixed_keys_fall_back() {
        let call = ToolCall::from_value(&json!({
            "tool_name": "",
            "name": "ls",
            "tool_args": {},
            "args": {"path": "/tmp"}
        }))
        .unwrap();
        assert_eq!(call.name, "ls");
        assert_eq!(call.args["path"], "/tmp");
    }

    #[test]
    fn missing_name_and_args_decode_empty() {
        let call = ToolCall::from_value(&json!({})).unwrap();
        assert!(call.name.is_empty());
        assert!(call.args.is_empty());
    }

    #[test]
    fn non_object_args_are_malformed() {
        let err = ToolCall::from_value(&json!({"name": "ls", "args": [1, 2]})).unwrap_err();
        assert_matches!(err, ToolError::MalformedCall { .. });
    }

    #[test]
    fn decodes_from_json_and_text_messages() {
        let json_msg = Message::build(
            Role::Agent,
            MessageType::LocalToolCall,
            MimeType::SerializedJson,
            json!({"name": "ls", "args": {}}),
        )
        .unwrap();
        assert_eq!(ToolCall::from_message(&json_msg).unwrap().name, "ls");

        let text_msg = Message::build(
            Role::Agent,
            MessageType::LocalToolCall,
            MimeType::Text,
            r#"{"tool_name": "pwd"}"#,
        )
        .unwrap();
        assert_eq!(ToolCall::from_message(&text_msg).unwrap().name, "pwd");
    }

    #[test]
    fn message_without_content_is_malformed() {
        let msg = Message::new(Role::Agent, MessageType::LocalToolCall, MimeType::SerializedJson);
        assert_matches!(ToolCall::from_message(&msg), Err(ToolError::MalformedCall { .. }));
    }
}
