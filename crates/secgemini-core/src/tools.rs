//! Local tool declarations and result payloads.
//!
//! A [`LocalTool`] is the declarative description sent to the service at
//! session registration. It is filled in explicitly per tool with
//! [`ToolParam`] entries; the service turns it into a callable for the remote
//! model. The function that actually runs lives in the client-side registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ─────────────────────────────────────────────────────────────────────────────
// Tool schema
// ─────────────────────────────────────────────────────────────────────────────

/// JSON Schema-compatible parameter definition for a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Top-level JSON Schema type.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property definitions (when type is `object`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    /// Required property names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Description of the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Catch-all for additional JSON Schema properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolParameterSchema {
    /// An `object` schema with no properties.
    pub fn empty_object() -> Self {
        Self {
            schema_type: "object".into(),
            properties: Some(Map::new()),
            required: Some(Vec::new()),
            description: None,
            extra: Map::new(),
        }
    }

    /// Property definition for `name`, if declared.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(name)
    }

    /// Whether `name` is a required property.
    pub fn is_required(&self, name: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|required| required.iter().any(|r| r == name))
    }
}

/// JSON Schema primitive types a tool parameter can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// UTF-8 string.
    String,
    /// Any JSON number.
    Number,
    /// Integral JSON number.
    Integer,
    /// `true` / `false`.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl ParamType {
    /// JSON Schema type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether `value` conforms to this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Parse a JSON Schema type name.
    pub fn from_schema_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

/// One parameter of a local tool.
///
/// Parameters are required unless given a default with
/// [`ToolParam::default_value`] or marked [`ToolParam::optional`].
#[derive(Clone, Debug, PartialEq)]
pub struct ToolParam {
    /// Parameter name, as the keyword the tool receives.
    pub name: String,
    /// JSON Schema type.
    pub param_type: ParamType,
    /// What the parameter means.
    pub description: Option<String>,
    /// Whether the caller must supply it.
    pub required: bool,
    /// Value used when the caller omits it.
    pub default: Option<Value>,
    /// Closed set of accepted literal values.
    pub enum_values: Option<Vec<Value>>,
    /// Element type for arrays.
    pub items: Option<ParamType>,
}

impl ToolParam {
    /// A required parameter of `param_type`.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: true,
            default: None,
            enum_values: None,
            items: None,
        }
    }

    /// A required string parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    /// A required integer parameter.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    /// A required number parameter.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }

    /// A required boolean parameter.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    /// A required array parameter whose elements are `items`.
    pub fn array(name: impl Into<String>, items: ParamType) -> Self {
        Self {
            items: Some(items),
            ..Self::new(name, ParamType::Array)
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Make the parameter optional with `value` as its default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Make the parameter optional without a default.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Restrict the parameter to a set of literal values.
    #[must_use]
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// JSON Schema property definition.
    pub fn to_property(&self) -> Value {
        let mut property = Map::new();
        let _ = property.insert("type".into(), json!(self.param_type.as_str()));
        if let Some(description) = &self.description {
            let _ = property.insert("description".into(), json!(description));
        }
        if let Some(default) = &self.default {
            let _ = property.insert("default".into(), default.clone());
        }
        if let Some(values) = &self.enum_values {
            let _ = property.insert("enum".into(), Value::Array(values.clone()));
        }
        if let Some(items) = self.items {
            let _ = property.insert("items".into(), json!({ "type": items.as_str() }));
        }
        Value::Object(property)
    }
}

/// Declarative description of a local tool, as sent to the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTool {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description shown to the remote model.
    pub description: String,
    /// JSON Schema for the tool's keyword arguments.
    pub parameters: ToolParameterSchema,
    /// JSON Schema for the return value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ToolParameterSchema>,
    /// Tool version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl LocalTool {
    /// A tool with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ToolParameterSchema::empty_object(),
            returns: None,
            version: None,
            tags: None,
        }
    }

    /// Declare a parameter. Re-declaring a name replaces the earlier entry.
    #[must_use]
    pub fn param(mut self, param: ToolParam) -> Self {
        let properties = self.parameters.properties.get_or_insert_with(Map::new);
        let _ = properties.insert(param.name.clone(), param.to_property());

        let required = self.parameters.required.get_or_insert_with(Vec::new);
        required.retain(|name| name != &param.name);
        if param.required {
            required.push(param.name);
        }
        self
    }

    /// Set the tool version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the tool tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool result payload
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of a `LOCAL_TOOL_RESULT` message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Name of the tool that was called.
    pub name: String,
    /// String-converted return value, or the failure message.
    pub output: String,
    /// Set only on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolOutput {
    /// Successful output.
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            is_error: None,
        }
    }

    /// Failure output.
    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: message.into(),
            is_error: Some(true),
        }
    }

    /// Whether this reports a failure.
    pub fn is_error(&self) -> bool {
        self.is_error == Some(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
