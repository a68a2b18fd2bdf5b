//! Settings loading with layered providers and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientSettings::default()`]
//! 2. If the settings file exists, merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Empty environment variables are ignored.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Json, Serialized};
use tracing::debug;

use crate::errors::Result;
use crate::types::ClientSettings;

/// Environment variables and the settings field each one overrides.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SG_API_KEY", "api_key"),
    ("SEC_GEMINI_API_HTTP_URL", "base_url"),
    ("SEC_GEMINI_API_WEBSOCKET_URL", "base_websockets_url"),
    ("SEC_GEMINI_LOGS_PROCESSOR_API_URL", "logs_processor_api_url"),
];

/// Resolve the path to the settings file (`~/.secgemini/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".secgemini").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. A file that is not valid JSON, or whose
/// values have the wrong type, is an error. The result is not validated;
/// call [`ClientSettings::validate`] before use.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    let mut figment = Figment::from(Serialized::defaults(ClientSettings::default()));

    if path.exists() {
        debug!(?path, "loading settings from file");
        figment = figment.merge(Json::file(path));
    } else {
        debug!(?path, "settings file not found, using defaults");
    }

    for (var, field) in ENV_OVERRIDES {
        if let Some(value) = read_env_string(var) {
            debug!(env = var, field, "settings override from environment");
            figment = figment.merge((*field, value));
        }
    }

    Ok(figment.extract()?)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::errors::SettingsError;

    fn clear_overrides(jail: &mut Jail) {
        for (var, _) in ENV_OVERRIDES {
            jail.set_env(var, "");
        }
    }

    fn load(path: &str) -> figment::error::Result<ClientSettings> {
        load_settings_from_path(Path::new(path)).map_err(|e| e.to_string().into())
    }

    #[test]
    fn settings_path_under_home() {
        let path = settings_path();
        assert!(path.ends_with(".secgemini/settings.json"));
    }

    #[test]
    fn missing_file_returns_defaults() {
        Jail::expect_with(|jail| {
            clear_overrides(jail);
            let settings = load("nope.json")?;
            assert_eq!(settings, ClientSettings::default());
            Ok(())
        });
    }

    #[test]
    fn file_values_override_defaults() {
        Jail::expect_with(|jail| {
            clear_overrides(jail);
            let _ = jail.create_file(
                "settings.json",
                r#"{"api_key": "file-key", "stream": {"max_attempts": 3}}"#,
            )?;
            let settings = load("settings.json")?;
            assert_eq!(settings.api_key, "file-key");
            assert_eq!(settings.stream.max_attempts, 3);
            assert_eq!(settings.stream.ping_interval_secs, 20);
            assert_eq!(settings.base_url, "https://api.secgemini.google");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            clear_overrides(jail);
            let _ = jail.create_file(
                "settings.json",
                r#"{"api_key": "file-key", "base_url": "http://file"}"#,
            )?;
            jail.set_env("SG_API_KEY", "env-key");
            jail.set_env("SEC_GEMINI_API_WEBSOCKET_URL", "ws://localhost:9000");
            jail.set_env("SEC_GEMINI_LOGS_PROCESSOR_API_URL", "http://logs");
            let settings = load("settings.json")?;
            assert_eq!(settings.api_key, "env-key");
            assert_eq!(settings.base_url, "http://file");
            assert_eq!(settings.base_websockets_url, "ws://localhost:9000");
            assert_eq!(settings.logs_processor_api_url.as_deref(), Some("http://logs"));
            Ok(())
        });
    }

    #[test]
    fn empty_env_is_ignored() {
        Jail::expect_with(|jail| {
            clear_overrides(jail);
            let settings = load("nope.json")?;
            assert_eq!(settings.base_url, "https://api.secgemini.google");
            Ok(())
        });
    }

    #[test]
    fn invalid_json_is_error() {
        Jail::expect_with(|jail| {
            clear_overrides(jail);
            let _ = jail.create_file("settings.json", "{ not json")?;
            let result = load_settings_from_path(Path::new("settings.json"));
            assert!(matches!(result, Err(SettingsError::Figment(_))));
            Ok(())
        });
    }

    #[test]
    fn wrong_type_is_error() {
        Jail::expect_with(|jail| {
            clear_overrides(jail);
            let _ = jail.create_file("settings.json", r#"{"http_timeout_secs": "soon"}"#)?;
            let result = load_settings_from_path(Path::new("settings.json"));
            assert!(matches!(result, Err(SettingsError::Figment(_))));
            Ok(())
        });
    }
}
