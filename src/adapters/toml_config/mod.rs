// Config file adapter - Pipeline configuration stored as TOML or YAML

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::domain::errors::DomainError;

/// Files probed, in order, when no config path is given
const CANDIDATE_PATHS: [&str; 2] = ["commflag.toml", "config/commflag.toml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Toml,
        }
    }
}

/// Reads and writes [`PipelineConfig`] files
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Per-user config file, `$XDG_CONFIG_HOME/commflag/config.toml` or `~/.config/...`
    pub fn user_config_path() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .map(|dir| dir.join("commflag").join("config.toml"))
    }

    /// First existing config file among the well-known locations
    pub fn discover() -> Option<PathBuf> {
        CANDIDATE_PATHS
            .iter()
            .map(PathBuf::from)
            .chain(Self::user_config_path())
            .find(|path| path.is_file())
    }

    /// Parse a config file; the format follows the extension
    pub fn load(path: &Path) -> Result<PipelineConfig, DomainError> {
        if !path.exists() {
            return Err(DomainError::FsFail(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::FsFail(format!("Failed to read config file: {}", e)))?;
        let config = Self::parse(&content, Format::of(path))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str, format: Format) -> Result<PipelineConfig, DomainError> {
        match format {
            Format::Toml => toml::from_str(content).map_err(|e| {
                DomainError::InvalidConfig(format!("Failed to parse TOML config: {}", e))
            }),
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| {
                DomainError::InvalidConfig(format!("Failed to parse YAML config: {}", e))
            }),
        }
    }

    /// Write a config file, creating its directory
    pub fn save(config: &PipelineConfig, path: &Path) -> Result<(), DomainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::FsFail(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = match Format::of(path) {
            Format::Toml => toml::to_string_pretty(config)
                .map_err(|e| DomainError::InvalidConfig(format!("Failed to serialize config: {}", e)))?,
            Format::Yaml => serde_yaml::to_string(config)
                .map_err(|e| DomainError::InvalidConfig(format!("Failed to serialize config: {}", e)))?,
        };

        std::fs::write(path, content)
            .map_err(|e| DomainError::FsFail(format!("Failed to write config file: {}", e)))?;
        debug!("Wrote configuration to {}", path.display());
        Ok(())
    }
}
