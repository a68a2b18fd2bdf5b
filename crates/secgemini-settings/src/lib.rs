//! # secgemini-settings
//!
//! Client configuration with layered sources:
//!
//! 1. Compiled [`ClientSettings::default()`]
//! 2. `~/.secgemini/settings.json`, if present
//! 3. Environment variables (highest priority)
//!
//! | env var | field |
//! |---------|-------|
//! | `SG_API_KEY` | `api_key` |
//! | `SEC_GEMINI_API_HTTP_URL` | `base_url` |
//! | `SEC_GEMINI_API_WEBSOCKET_URL` | `base_websockets_url` |
//! | `SEC_GEMINI_LOGS_PROCESSOR_API_URL` | `logs_processor_api_url` |

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{ClientSettings, StreamSettings};
