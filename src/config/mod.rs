//! Pipeline configuration value
//!
//! Built once by the configuration initialization (defaults, file,
//! environment, CLI) and passed explicitly to the coordinator and the device
//! registry.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::{AudioAnalysisConfig, VideoAnalysisConfig};
use crate::devices::{DeviceKind, SingleDevicePolicy};
use crate::domain::errors::DomainError;
use crate::pipeline::DEFAULT_QUEUE_CAPACITY;

/// Largest accepted queue capacity
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Everything a run needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Depth of each per-stream queue
    pub queue_capacity: usize,
    pub single_device_policy: SingleDevicePolicy,
    pub audio: AudioAnalysisConfig,
    pub video: VideoAnalysisConfig,
    pub source: SourceConfig,
    /// Devices offered by the configured provider
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceSpec>,
    /// Job id to recording file
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub jobs: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            single_device_policy: SingleDevicePolicy::default(),
            audio: AudioAnalysisConfig::default(),
            video: VideoAnalysisConfig::default(),
            source: SourceConfig::default(),
            devices: Vec::new(),
            jobs: BTreeMap::new(),
        }
    }
}

/// Where and how sources are read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directories searched for a recording that is not found at its path
    pub storage_dirs: Vec<PathBuf>,
    /// Consecutive read failures after which the source counts as ended
    pub max_consecutive_read_errors: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            storage_dirs: Vec::new(),
            max_consecutive_read_errors: 32,
        }
    }
}

/// A device declared in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    #[serde(default = "default_vendor")]
    pub vendor: String,
    pub kind: DeviceKind,
    pub compute_units: u32,
    pub max_clock_mhz: u32,
    #[serde(default)]
    pub global_mem_mb: u64,
    /// Added to every dispatch
    #[serde(default)]
    pub latency_ms: u64,
    /// Fail every dispatch after this many have succeeded
    #[serde(default)]
    pub fail_after: Option<u64>,
}

fn default_vendor() -> String {
    "emulated".to_string()
}

impl PipelineConfig {
    /// Check ranges and cross-field constraints
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=MAX_QUEUE_CAPACITY).contains(&self.queue_capacity) {
            return Err(DomainError::InvalidConfig(format!(
                "queue_capacity must be between 1 and {}, got {}",
                MAX_QUEUE_CAPACITY, self.queue_capacity
            )));
        }

        if !self.audio.silence_threshold_db.is_finite() || self.audio.silence_threshold_db > 0.0 {
            return Err(DomainError::InvalidConfig(format!(
                "audio.silence_threshold_db must be a dBFS level <= 0, got {}",
                self.audio.silence_threshold_db
            )));
        }
        if !self.audio.min_silence_secs.is_finite() || self.audio.min_silence_secs < 0.0 {
            return Err(DomainError::InvalidConfig(
                "audio.min_silence_secs must not be negative".to_string(),
            ));
        }
        if !(0.0..=255.0).contains(&self.video.black_luma_threshold) {
            return Err(DomainError::InvalidConfig(format!(
                "video.black_luma_threshold must be within 0..=255, got {}",
                self.video.black_luma_threshold
            )));
        }
        if !(self.video.scene_change_threshold > 0.0 && self.video.scene_change_threshold <= 1.0) {
            return Err(DomainError::InvalidConfig(format!(
                "video.scene_change_threshold must be within (0, 1], got {}",
                self.video.scene_change_threshold
            )));
        }
        if self.source.max_consecutive_read_errors == 0 {
            return Err(DomainError::InvalidConfig(
                "source.max_consecutive_read_errors must be at least 1".to_string(),
            ));
        }

        for (index, device) in self.devices.iter().enumerate() {
            if device.name.trim().is_empty() {
                return Err(DomainError::InvalidConfig(format!(
                    "devices[{}] has an empty name",
                    index
                )));
            }
            if device.compute_units == 0 || device.max_clock_mhz == 0 {
                return Err(DomainError::InvalidConfig(format!(
                    "device '{}' needs non-zero compute_units and max_clock_mhz",
                    device.name
                )));
            }
        }

        for (job, file) in &self.jobs {
            if job.parse::<u64>().is_err() {
                return Err(DomainError::InvalidConfig(format!(
                    "job id '{}' is not a number",
                    job
                )));
            }
            if file.trim().is_empty() {
                return Err(DomainError::InvalidConfig(format!(
                    "job {} has no recording file",
                    job
                )));
            }
        }

        Ok(())
    }
}
