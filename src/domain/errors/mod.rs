// Domain errors - Error types for the domain layer

use thiserror::Error;

use crate::domain::model::StreamKind;

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),
    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// File system failure
    #[error("File system error: {0}")]
    FsFail(String),
}

/// Outcomes of queue operations that end a push or pop
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was closed before or while the push was waiting; the unit was discarded
    #[error("queue closed")]
    QueueClosed,
    /// The queue is closed and fully drained
    #[error("end of queue")]
    EndOfQueue,
}

/// Source stream failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Source not found: {identifier}")]
    SourceNotFound { identifier: String },

    #[error("Source is zero-length: {identifier}")]
    SourceEmpty { identifier: String },

    #[error("No decoder available for {identifier}: {reason}")]
    DecoderUnavailable { identifier: String, reason: String },

    /// A single read failed; the stream may still continue
    #[error("Read failed: {0}")]
    Read(String),
}

impl SourceError {
    /// Whether the error aborts the run before any consumer starts
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SourceError::Read(_))
    }
}

/// A single unit could not be scored
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("{kind} unit has an empty payload")]
    EmptyPayload { kind: StreamKind },

    #[error("expected a {expected} payload, found a {found} payload")]
    KindMismatch { expected: StreamKind, found: String },

    #[error("payload has {found} bytes, geometry requires {expected}")]
    Geometry { expected: usize, found: usize },

    #[error("invalid audio format: {0}")]
    AudioFormat(String),
}

/// Compute device failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Dispatch to device {device} failed: {reason}")]
    DispatchFailure { device: String, reason: String },
}

/// Result of dispatching a kernel: either the device failed, or the unit itself was bad
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Unit(#[from] AnalysisError),
}

/// Analysis consumer lifecycle violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsumerError {
    #[error("{kind} consumer already started")]
    AlreadyStarted { kind: StreamKind },

    #[error("{kind} consumer was never started")]
    NotStarted { kind: StreamKind },

    #[error("{kind} consumer already joined")]
    AlreadyJoined { kind: StreamKind },

    #[error("compute device for the {kind} consumer must be set before start")]
    DeviceAfterStart { kind: StreamKind },

    #[error("{kind} consumer terminated abnormally: {reason}")]
    Aborted { kind: StreamKind, reason: String },
}

/// Job metadata lookup failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("No recording data for job {0}")]
    NotFound(u64),
}

/// Pipeline coordinator failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Consumer(#[from] ConsumerError),

    #[error("producer terminated abnormally: {0}")]
    Producer(String),

    #[error("no source has been opened")]
    NotOpened,

    #[error("pipeline already ran; create a new coordinator")]
    AlreadyRun,
}
