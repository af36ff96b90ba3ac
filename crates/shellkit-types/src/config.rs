//! Shell configuration loaded from TOML.
//!
//! Every field has a default, so an empty document (or no file at all)
//! yields a usable configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, ShellError};

/// Top-level shell configuration (`shellkit.toml`).
#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    /// Prompt shown while the default context is active.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Output filter (`| include` / `| exclude`) settings.
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Settings for the output-filter pipe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Compile include/exclude patterns case-insensitively.
    #[serde(default)]
    pub case_insensitive: bool,
}

fn default_prompt() -> String {
    "> ".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            log_filter: default_log_filter(),
            filter: FilterConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Parse and validate a configuration document.
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&source)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject values the line-oriented front-end cannot display.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.contains(['\n', '\r']) {
            return Err(ShellError::Config(
                "prompt must not contain line breaks".to_string(),
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ShellError::Config("log_filter must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ShellConfig::from_toml("").unwrap();
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.log_filter, "info");
        assert!(!config.filter.case_insensitive);
    }

    #[test]
    fn all_fields_parsed() {
        let config = ShellConfig::from_toml(
            r#"
            prompt = "router# "
            log_filter = "debug"

            [filter]
            case_insensitive = true
            "#,
        )
        .unwrap();
        assert_eq!(config.prompt, "router# ");
        assert_eq!(config.log_filter, "debug");
        assert!(config.filter.case_insensitive);
    }

    #[test]
    fn multiline_prompt_rejected() {
        let err = ShellConfig::from_toml("prompt = \"a\\nb\"").unwrap_err();
        assert!(matches!(err, ShellError::Config(_)));
    }

    #[test]
    fn blank_log_filter_rejected() {
        let err = ShellConfig::from_toml("log_filter = \"  \"").unwrap_err();
        assert!(matches!(err, ShellError::Config(_)));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = ShellConfig::from_toml("prompt = ").unwrap_err();
        assert!(matches!(err, ShellError::TomlParse(_)));
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let err = ShellConfig::from_toml("prompt = 42").unwrap_err();
        assert!(matches!(err, ShellError::TomlParse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prompt = \"lab> \"").unwrap();
        let config = ShellConfig::load(file.path()).unwrap();
        assert_eq!(config.prompt, "lab> ");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShellConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ShellError::Io(_)));
    }
}
