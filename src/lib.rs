//! commflag library
//!
//! Commercial break flagging over a recording: one producer decodes and
//! routes media units into two bounded queues, and an audio and a video
//! analysis consumer drain them, optionally dispatching per-frame kernels to
//! compute devices picked from a ranked registry.

pub mod adapters;
pub mod analysis;
pub mod app;
pub mod cli;
pub mod config;
pub mod config_initialization;
pub mod devices;
pub mod domain;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use devices::{ComputeDeviceRegistry, SingleDevicePolicy};
pub use domain::errors::{PipelineError, QueueError, SourceError};
pub use domain::model::{DetectionMark, MarkType, MediaUnit, StreamKind, TimeSpec};
pub use error::{CommFlagError, CommFlagResult};
pub use pipeline::{BoundedFrameQueue, PipelineCoordinator, PipelineOutput, ResultSet};
