//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::config::MAX_QUEUE_CAPACITY;
use crate::config_initialization::ConfigOverrides;
use crate::devices::SingleDevicePolicy;

fn queue_capacity(s: &str) -> Result<usize, String> {
    clap_num::number_range(s, 1, MAX_QUEUE_CAPACITY)
}

/// Pipeline settings shared by the commands that run it
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Depth of each per-stream queue
    #[arg(long, value_parser = queue_capacity)]
    pub queue_capacity: Option<usize>,

    /// What audio does when only one compute device exists (software-for-audio, share)
    #[arg(long)]
    pub single_device_policy: Option<SingleDevicePolicy>,

    /// Directory searched for recordings not found at their path (repeatable)
    #[arg(long = "storage-dir")]
    pub storage_dirs: Vec<PathBuf>,
}

impl PipelineArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            queue_capacity: self.queue_capacity,
            single_device_policy: self.single_device_policy,
            storage_dirs: self.storage_dirs.clone(),
        }
    }
}

/// Report destination and format
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Recording file to analyze
    #[arg(short, long, conflicts_with = "job_id")]
    pub file: Option<String>,

    /// Queued job whose recording should be analyzed
    #[arg(short, long)]
    pub job_id: Option<u64>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub report: ReportArgs,
}

/// Arguments for the synth command
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Length of the generated recording in seconds
    #[arg(long, default_value = "120")]
    pub duration: f64,

    /// Number of silence gaps, 11 s apart from 8 s
    #[arg(long, default_value = "10")]
    pub silence_gaps: u32,

    /// Number of scene cuts, 22 s apart from 12 s
    #[arg(long, default_value = "5")]
    pub scene_cuts: u32,

    /// Black frame segment as START:END in seconds (repeatable)
    #[arg(long = "black")]
    pub black_segments: Vec<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub report: ReportArgs,
}

/// Arguments for the devices command
#[derive(Args, Debug)]
pub struct DevicesArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// What audio does when only one compute device exists
    #[arg(long)]
    pub single_device_policy: Option<SingleDevicePolicy>,
}
