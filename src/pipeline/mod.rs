//! Producer / two-consumer analysis pipeline

use serde::Serialize;

pub mod consumer;
pub mod coordinator;
pub mod queue;
pub mod results;

pub use consumer::{AnalysisConsumer, ConsumerState, ConsumerStats};
pub use coordinator::{PipelineCoordinator, PipelineOutput, ProducerStats, RunStats};
pub use queue::{BoundedFrameQueue, DEFAULT_QUEUE_CAPACITY};
pub use results::ResultSet;

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineRunState {
    Idle,
    Running,
    Draining,
    Stopped,
}
