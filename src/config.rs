//! Settings for opconf itself.
//!
//! These are separate from the OpenCode configuration the crate resolves.
//! Layering, lowest to highest:
//! - Default values
//! - TOML settings file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `OPCONF_` and use double
//! underscores to separate nested levels:
//! - `OPCONF_WATCH__DEBOUNCE_MS=250` sets `watch.debounce_ms`
//! - `OPCONF_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::watcher::{DEFAULT_DEBOUNCE_MS, DEFAULT_EVENT_CAPACITY, DEFAULT_SELF_WRITE_WINDOW_MS};

/// Directory name under the user config dir.
const APP_DIR: &str = "opconf";
const SETTINGS_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "OPCONF_";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Change watcher timings
    #[serde(default)]
    pub watch: WatchSettings,

    /// Schema validation defaults
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchSettings {
    /// Quiet period before a changed path is reported
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long our own writes are ignored by the watcher
    #[serde(default = "default_self_write_window_ms")]
    pub self_write_window_ms: u64,

    /// Broadcast channel capacity for change events
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ValidationSettings {
    /// Schema used by `opconf validate` when `--schema` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_self_write_window_ms() -> u64 {
    DEFAULT_SELF_WRITE_WINDOW_MS
}
fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            self_write_window_ms: default_self_write_window_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        match Self::default_path() {
            Some(path) => Self::load_from(path),
            None => Self::figment(None).extract().map_err(Box::new),
        }
    }

    /// Load settings from a specific file. A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(Some(path.as_ref()))
            .extract()
            .map_err(Box::new)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        // Double underscore separates nested levels; single underscores stay
        // inside field names.
        figment.merge(
            Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
        )
    }

    /// `<user config dir>/opconf/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Save current settings to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.watch.debounce_ms, 100);
        assert_eq!(settings.watch.self_write_window_ms, 500);
        assert_eq!(settings.watch.event_capacity, 256);
        assert_eq!(settings.logging.default, "warn");
        assert!(settings.validation.schema.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[watch]
debounce_ms = 250
self_write_window_ms = 1000

[validation]
schema = "/etc/opencode/config.schema.json"

[logging.modules]
watcher = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.watch.debounce_ms, 250);
        assert_eq!(settings.watch.self_write_window_ms, 1000);
        // Untouched keys keep their defaults
        assert_eq!(settings.watch.event_capacity, 256);
        assert_eq!(
            settings.validation.schema,
            Some(PathBuf::from("/etc/opencode/config.schema.json"))
        );
        assert_eq!(settings.logging.modules["watcher"], "debug");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.watch.debounce_ms, 100);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 42;
        settings
            .logging
            .modules
            .insert("engine".to_string(), "trace".to_string());

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 42);
        assert_eq!(loaded.logging.modules["engine"], "trace");
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[logging]\ndefault = \"info\"\n").unwrap();

        // No other test reads logging.default through figment.
        unsafe {
            std::env::set_var("OPCONF_LOGGING__DEFAULT", "debug");
        }

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.logging.default, "debug");

        unsafe {
            std::env::remove_var("OPCONF_LOGGING__DEFAULT");
        }
    }
}
