//! Loading configuration from strings and files

use crate::config::GraftConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::debug;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format implied by a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Reads and validates [`GraftConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from a file, choosing the format by extension.
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<GraftConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let format = ConfigFormat::from_path(path);
        debug!(path = %path.display(), ?format, "loading graft configuration");
        Self::load_from_str(&content, format)
    }

    /// Parse a string in the given format.
    pub fn load_from_str(content: &str, format: ConfigFormat) -> ConfigResult<GraftConfig> {
        let config: GraftConfig = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<GraftConfig> {
        Self::load_from_str(content, ConfigFormat::Toml)
    }

    /// Parse JSON text.
    pub fn from_json_str(content: &str) -> ConfigResult<GraftConfig> {
        Self::load_from_str(content, ConfigFormat::Json)
    }
}
