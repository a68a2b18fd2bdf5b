//! Argument checking against a tool's declared parameter schema.

use secgemini_core::{ParamType, ToolParameterSchema};
use serde_json::Value;

use crate::errors::ToolError;
use crate::traits::ToolArgs;

/// Check `args` against `schema` and fill in declared defaults.
///
/// Rejects unknown keywords, missing required parameters, values of the
/// wrong JSON type and values outside an `enum`.
pub(crate) fn prepare_args(schema: &ToolParameterSchema, mut args: ToolArgs) -> Result<ToolArgs, ToolError> {
    let Some(properties) = schema.properties.as_ref() else {
        return Ok(args);
    };

    if let Some(unexpected) = args.keys().find(|key| !properties.contains_key(*key)) {
        return Err(ToolError::validation(format!("unexpected argument '{unexpected}'")));
    }

    for (name, property) in properties {
        match args.get(name) {
            Some(value) => check_value(name, property, value)?,
            None => {
                if let Some(default) = property.get("default") {
                    let _ = args.insert(name.clone(), default.clone());
                } else if schema.is_required(name) {
                    return Err(ToolError::validation(format!("missing required argument '{name}'")));
                }
            }
        }
    }
    Ok(args)
}

fn check_value(name: &str, property: &Value, value: &Value) -> Result<(), ToolError> {
    let declared = property
        .get("type")
        .and_then(Value::as_str)
        .and_then(ParamType::from_schema_name);
    if let Some(param_type) = declared {
        if !param_type.accepts(value) {
            return Err(ToolError::validation(format!(
                "argument '{name}' must be of type {}",
                param_type.as_str()
            )));
        }
    }

    if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(ToolError::validation(format!(
                "argument '{name}' must be one of {}",
                Value::Array(allowed.clone())
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use secgemini_core::{LocalTool, ToolParam};
    use serde_json::json;

    use super::*;

    fn schema() -> ToolParameterSchema {
        LocalTool::new("get_weather", "weather")
            .param(ToolParam::string("city"))
            .param(ToolParam::string("units").one_of(["c", "f"]).default_value("c"))
            .param(ToolParam::integer("days").optional())
            .parameters
    }

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn fills_defaults() {
        let prepared = prepare_args(&schema(), args(json!({"city": "nyc"}))).unwrap();
        assert_eq!(prepared["units"], "c");
        assert!(!prepared.contains_key("days"));
    }

    #[test]
    fn rejects_missing_required() {
        let err = prepare_args(&schema(), args(json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "missing required argument 'city'");
    }

    #[test]
    fn rejects_unknown_keywords() {
        let err = prepare_args(&schema(), args(json!({"city": "nyc", "zip": "10001"}))).unwrap_err();
        assert_eq!(err.to_string(), "unexpected argument 'zip'");
    }

    #[test]
    fn rejects_wrong_type() {
        let err = prepare_args(&schema(), args(json!({"city": "nyc", "days": "two"}))).unwrap_err();
        assert_eq!(err.to_string(), "argument 'days' must be of type integer");
    }

    #[test]
    fn rejects_values_outside_enum() {
        let err = prepare_args(&schema(), args(json!({"city": "nyc", "units": "k"}))).unwrap_err();
        assert_matches!(err, ToolError::Validation { .. });
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn schema_without_properties_accepts_anything() {
        let mut open = ToolParameterSchema::empty_object();
        open.properties = None;
        let prepared = prepare_args(&open, args(json!({"anything": 1}))).unwrap();
        assert_eq!(prepared["anything"], 1);
    }
}
