//! Model descriptors and model-string parsing.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const EXPERIMENTAL_SUFFIX: &str = "experimental";

/// A model string that is not `name-version` or `name-version-experimental`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid model string: {model_string}")]
pub struct ModelParseError {
    /// The rejected input.
    pub model_string: String,
}

/// A Sec-Gemini model configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model family name.
    pub model_name: String,
    /// Model version.
    pub version: String,
    /// Whether experimental sub-agents and tools are enabled.
    #[serde(default)]
    pub use_experimental: bool,
    /// The string the configuration was selected with.
    pub model_string: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional toolsets the model exposes, passed through untouched.
    #[serde(default)]
    pub toolsets: Vec<Value>,
}

impl ModelInfo {
    /// Build a descriptor from a model string.
    pub fn parse(model_string: &str) -> Result<Self, ModelParseError> {
        let (model_name, version, use_experimental) = parse_model_string(model_string)?;
        Ok(Self {
            model_name,
            version,
            use_experimental,
            model_string: model_string.to_owned(),
            description: Some(String::new()),
            toolsets: Vec::new(),
        })
    }
}

impl FromStr for ModelInfo {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split a model string into `(model_name, version, use_experimental)`.
///
/// `name-version` splits on the last hyphen. `name-version-experimental`
/// splits on the last two. Neither part may be empty.
pub fn parse_model_string(model_string: &str) -> Result<(String, String, bool), ModelParseError> {
    let invalid = || ModelParseError {
        model_string: model_string.to_owned(),
    };

    let (rest, use_experimental) = match model_string.rsplit_once('-') {
        Some((rest, EXPERIMENTAL_SUFFIX)) => (rest, true),
        _ => (model_string, false),
    };
    let (name, version) = rest.rsplit_once('-').ok_or_else(invalid)?;
    if name.is_empty() || version.is_empty() {
        return Err(invalid());
    }
    Ok((name.to_owned(), version.to_owned(), use_experimental))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_name_and_version() {
        let (name, version, experimental) = parse_model_string("sec-gemini-1.1").unwrap();
        assert_eq!(name, "sec-gemini");
        assert_eq!(version, "1.1");
        assert!(!experimental);
    }

    #[test]
    fn parses_experimental_suffix() {
        let (name, version, experimental) = parse_model_string("sec-gemini-1.1-experimental").unwrap();
        assert_eq!(name, "sec-gemini");
        assert_eq!(version, "1.1");
        assert!(experimental);
    }

    #[test]
    fn rejects_strings_without_version() {
        assert_matches!(parse_model_string("gemini"), Err(_));
        assert_matches!(parse_model_string("gemini-experimental"), Err(_));
        assert_matches!(parse_model_string("-1"), Err(_));
        assert_matches!(parse_model_string("gemini-"), Err(_));
    }

    #[test]
    fn model_info_from_str_keeps_original_string() {
        let info: ModelInfo = "sec-gemini-stable".parse().unwrap();
        assert_eq!(info.model_name, "sec-gemini");
        assert_eq!(info.version, "stable");
        assert_eq!(info.model_string, "sec-gemini-stable");
        assert!(info.toolsets.is_empty());
    }

    #[test]
    fn error_names_the_input() {
        let err = ModelInfo::parse("nope").unwrap_err();
        assert_eq!(err.to_string(), "invalid model string: nope");
    }
}
