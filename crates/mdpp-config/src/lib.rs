//! Configuration management for mdpp.
//!
//! Parses `mdpp.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [directives]
//! # Directive name prefix: "mdpp" selects `<!-- mdppcode src=... -->`.
//! prefix = ""
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override directive name prefix.
    pub prefix: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdpp.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directive recognition configuration.
    pub directives: DirectivesConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Directive recognition configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectivesConfig {
    /// Prefix prepended to every directive name.
    ///
    /// Default: empty (`<!-- code src=... -->`)
    pub prefix: String,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdpp.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(prefix) = &settings.prefix {
            self.directives.prefix.clone_from(prefix);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        discover_from(&current)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.directives.prefix;
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Validation(format!(
                "directives.prefix must contain only ASCII letters, digits and underscores, got {prefix:?}"
            )));
        }
        Ok(())
    }
}

/// Walk from `start` up to the filesystem root looking for `mdpp.toml`.
fn discover_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.directives.prefix, "");
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.directives.prefix, "");
    }

    #[test]
    fn test_parse_directives_config() {
        let toml = r#"
[directives]
prefix = "mdpp"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.directives.prefix, "mdpp");
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let toml = r#"
[directives]
prefx = "mdpp"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[directives]\nprefix = \"doc_\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.directives.prefix, "doc_");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("missing.toml");

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mdpp.toml");
        std::fs::write(&path, "[directives\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_invalid_prefix_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mdpp.toml");
        std::fs::write(&path, "[directives]\nprefix = \"md-pp\"\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("directives.prefix"));
    }

    #[test]
    fn test_cli_settings_override_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mdpp.toml");
        std::fs::write(&path, "[directives]\nprefix = \"mdpp\"\n").unwrap();
        let settings = CliSettings {
            prefix: Some(String::new()),
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.directives.prefix, "");
    }

    #[test]
    fn test_cli_settings_are_validated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mdpp.toml");
        std::fs::write(&path, "").unwrap();
        let settings = CliSettings {
            prefix: Some("<!--".to_owned()),
        };

        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.directives.prefix = "mdpp".to_owned();

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.directives.prefix, "mdpp");
    }

    #[test]
    fn test_discover_from_parent_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("docs/guides");
        std::fs::create_dir_all(&nested).unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(&config_path, "").unwrap();

        assert_eq!(discover_from(&nested), Some(config_path));
    }

    #[test]
    fn test_discover_prefers_nearest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("docs");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILENAME), "").unwrap();
        std::fs::write(nested.join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(discover_from(&nested), Some(nested.join(CONFIG_FILENAME)));
    }

    #[test]
    fn test_validate_accepts_identifier_prefixes() {
        for prefix in ["", "mdpp", "doc_", "X1"] {
            let config = Config {
                directives: DirectivesConfig {
                    prefix: prefix.to_owned(),
                },
                config_path: None,
            };
            assert!(config.validate().is_ok(), "prefix {prefix:?}");
        }
    }
}
