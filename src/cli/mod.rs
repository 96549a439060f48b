//! CLI module for commflag
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

/// Commercial break flagging over demultiplexed audio and video streams
#[derive(Parser, Debug)]
#[command(name = "commflag")]
#[command(about = "Flag commercial break candidates in a recording")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence when set)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormat,

    /// Configuration file (TOML or YAML)
    #[arg(long, global = true, env = "COMMFLAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a recording file or queued job
    Analyze(args::AnalyzeArgs),
    /// Analyze a generated recording with known silence gaps and scene cuts
    Synth(args::SynthArgs),
    /// List compute devices and how they would be assigned
    Devices(args::DevicesArgs),
}
