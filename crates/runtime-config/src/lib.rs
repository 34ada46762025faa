//! Shared configuration types.
//!
//! `sessiondeck.toml` is read by the CLI; every field has a default so a
//! missing file or a partial one both load cleanly.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "sessiondeck.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DatabaseSettings {
    /// Empty means the default local database path.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSettings {
    /// Refuse malformed expressions instead of dropping their bad subtrees.
    #[serde(default = "default_false")]
    pub strict: bool,
    /// Check referenced tag ids against the catalog before running a filter.
    #[serde(default = "default_true")]
    pub validate_before_query: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            strict: false,
            validate_before_query: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Default tracing directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_loads_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.filter.validate_before_query);
        assert!(!config.filter.strict);
        assert_eq!(config.logging.level, "warn");
        assert!(config.database.path.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
[filter]
strict = true

[database]
path = "/tmp/deck.db"
"#,
        )
        .unwrap();
        assert!(config.filter.strict);
        assert!(config.filter.validate_before_query);
        assert_eq!(config.database.path, "/tmp/deck.db");
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = AppConfig::from_toml("[filter]\nlegacy_mode = 1\n").unwrap();
        assert_eq!(config.filter, FilterSettings::default());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(AppConfig::from_toml("[filter]\nstrict = \"yes\"\n").is_err());
    }

    #[test]
    fn serialized_config_loads_back() {
        let mut config = AppConfig::default();
        config.logging.level = "debug".to_string();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[logging]"));
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }
}
