//! Configuration initialization and hierarchy management
//!
//! Precedence: CLI > environment (`COMMFLAG_*`) > config file > defaults.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::adapters::TomlConfigAdapter;
use crate::config::PipelineConfig;
use crate::devices::SingleDevicePolicy;
use crate::domain::errors::DomainError;

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub queue_capacity: Option<usize>,
    pub single_device_policy: Option<SingleDevicePolicy>,
    pub storage_dirs: Vec<PathBuf>,
}

/// Build the run configuration from every layer, then validate it
pub fn initialize_configuration(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<PipelineConfig, DomainError> {
    initialize_with_env(config_path, overrides, |key| std::env::var(key).ok())
}

/// [`initialize_configuration`] with an injectable environment
pub fn initialize_with_env(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PipelineConfig, DomainError> {
    info!("Initializing configuration hierarchy");

    // Step 1 and 2: defaults, then the file when there is one
    let mut config = match config_path {
        Some(path) => TomlConfigAdapter::load(path)?,
        None => match TomlConfigAdapter::discover() {
            Some(path) => TomlConfigAdapter::load(&path)?,
            None => {
                debug!("No configuration file found, using defaults");
                PipelineConfig::default()
            }
        },
    };

    // Step 3: environment
    apply_environment(&mut config, &env)?;

    // Step 4: CLI
    apply_cli_overrides(&mut config, overrides);

    config.validate()?;
    Ok(config)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError> {
    value
        .trim()
        .parse()
        .map_err(|_| DomainError::InvalidConfig(format!("{} has an invalid value: {}", key, value)))
}

fn apply_environment(
    config: &mut PipelineConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<(), DomainError> {
    let mut env_overrides = 0;

    if let Some(value) = env("COMMFLAG_QUEUE_CAPACITY") {
        config.queue_capacity = parse_env("COMMFLAG_QUEUE_CAPACITY", &value)?;
        env_overrides += 1;
    }
    if let Some(value) = env("COMMFLAG_SINGLE_DEVICE_POLICY") {
        config.single_device_policy = value.parse()?;
        env_overrides += 1;
    }
    if let Some(value) = env("COMMFLAG_STORAGE_DIRS") {
        config.source.storage_dirs = std::env::split_paths(&value).collect();
        env_overrides += 1;
    }
    if let Some(value) = env("COMMFLAG_SILENCE_THRESHOLD_DB") {
        config.audio.silence_threshold_db = parse_env("COMMFLAG_SILENCE_THRESHOLD_DB", &value)?;
        env_overrides += 1;
    }
    if let Some(value) = env("COMMFLAG_SCENE_CHANGE_THRESHOLD") {
        config.video.scene_change_threshold = parse_env("COMMFLAG_SCENE_CHANGE_THRESHOLD", &value)?;
        env_overrides += 1;
    }

    if env_overrides > 0 {
        info!("Applied {} environment variable overrides", env_overrides);
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut PipelineConfig, overrides: &ConfigOverrides) {
    if let Some(capacity) = overrides.queue_capacity {
        debug!("CLI override: queue_capacity = {}", capacity);
        config.queue_capacity = capacity;
    }
    if let Some(policy) = overrides.single_device_policy {
        debug!("CLI override: single_device_policy = {}", policy);
        config.single_device_policy = policy;
    }
    if !overrides.storage_dirs.is_empty() {
        config.source.storage_dirs = overrides.storage_dirs.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("commflag.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir, "queue_capacity = 100\nsingle_device_policy = \"share\"\n");

        let from_file = initialize_with_env(Some(&path), &ConfigOverrides::default(), env_from(&[]))
            .unwrap();
        assert_eq!(from_file.queue_capacity, 100);
        assert_eq!(from_file.single_device_policy, SingleDevicePolicy::Share);

        let env = env_from(&[("COMMFLAG_QUEUE_CAPACITY", "200")]);
        let from_env = initialize_with_env(Some(&path), &ConfigOverrides::default(), env).unwrap();
        assert_eq!(from_env.queue_capacity, 200);

        let overrides = ConfigOverrides {
            queue_capacity: Some(300),
            single_device_policy: Some(SingleDevicePolicy::SoftwareForAudio),
            storage_dirs: Vec::new(),
        };
        let env = env_from(&[("COMMFLAG_QUEUE_CAPACITY", "200")]);
        let from_cli = initialize_with_env(Some(&path), &overrides, env).unwrap();
        assert_eq!(from_cli.queue_capacity, 300);
        assert_eq!(
            from_cli.single_device_policy,
            SingleDevicePolicy::SoftwareForAudio
        );
    }

    #[test]
    fn test_invalid_env_value() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir, "");
        let env = env_from(&[("COMMFLAG_QUEUE_CAPACITY", "lots")]);
        let err = initialize_with_env(Some(&path), &ConfigOverrides::default(), env).unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig(_)));
    }

    #[test]
    fn test_merged_config_is_validated() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir, "");
        let overrides = ConfigOverrides {
            queue_capacity: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(initialize_with_env(Some(&path), &overrides, env_from(&[])).is_err());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let err = initialize_with_env(
            Some(Path::new("/no/such/commflag.toml")),
            &ConfigOverrides::default(),
            env_from(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::FsFail(_)));
    }
}
