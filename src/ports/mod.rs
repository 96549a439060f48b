// Ports - Interface definitions (contracts) for the external collaborators

use async_trait::async_trait;

use crate::analysis::{FrameFeatures, Kernel};
use crate::devices::ComputeDevice;
use crate::domain::errors::*;
use crate::domain::model::*;

/// Sequential stream of demultiplexed media units
///
/// This is the playable byte stream capability: it may be backed by a local
/// file, a remote store or a generator. Reads are blocking.
pub trait MediaSource: Send {
    /// Identifier the source was opened with
    fn identifier(&self) -> &str;

    /// Size of the underlying stream in bytes
    fn size(&self) -> u64;

    /// Read the next unit; `Ok(None)` marks end of stream
    fn read_unit(&mut self) -> Result<Option<MediaUnit>, SourceError>;
}

/// Port for acquiring a source stream by identifier
pub trait SourceOpener: Send + Sync {
    fn open(&self, identifier: &str) -> Result<Box<dyn MediaSource>, SourceError>;
}

/// Port for executing per-frame kernels on an acceleration device
///
/// Implementations must be safe to call from the consumer threads; a backend
/// shared by two roles serializes dispatch itself.
pub trait ComputeBackend: Send + Sync {
    fn execute(&self, kernel: Kernel, unit: &MediaUnit) -> Result<FrameFeatures, DispatchError>;
}

/// Port for enumerating acceleration devices
pub trait DeviceProvider: Send + Sync {
    fn enumerate(&self) -> Vec<ComputeDevice>;
}

/// Port for resolving a queued job into the file it should flag
#[async_trait]
pub trait JobLookup: Send + Sync {
    async fn lookup(&self, job_id: u64) -> Result<String, LookupError>;
}
