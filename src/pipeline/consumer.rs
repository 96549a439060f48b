//! Analysis consumer: drains one queue into one result set

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analysis::{run_kernel, FrameFeatures, Kernel, StreamDetector};
use crate::devices::ComputeDevice;
use crate::domain::errors::{AnalysisError, ConsumerError, DispatchError};
use crate::domain::model::{DetectionMark, MediaUnit, StreamKind};
use crate::pipeline::queue::BoundedFrameQueue;
use crate::pipeline::results::ResultSet;

/// Consumer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerState {
    Idle,
    Running,
    Finishing,
    Stopped,
}

#[derive(Debug, Default)]
struct Counters {
    analyzed: AtomicU64,
    degraded: AtomicU64,
    device_dispatches: AtomicU64,
    software_units: AtomicU64,
    fell_back: AtomicBool,
}

/// Snapshot of what a consumer has done so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerStats {
    pub kind: StreamKind,
    pub state: ConsumerState,
    /// Units taken off the queue and analyzed
    pub units_analyzed: u64,
    pub degraded_units: u64,
    pub device_dispatches: u64,
    pub software_units: u64,
    pub device: Option<String>,
    pub fell_back_to_software: bool,
}

/// One analysis role running on its own blocking thread
pub struct AnalysisConsumer {
    kind: StreamKind,
    queue: Arc<BoundedFrameQueue>,
    device: Option<Arc<ComputeDevice>>,
    state: Arc<watch::Sender<ConsumerState>>,
    counters: Arc<Counters>,
    pending: Option<(ResultSet, Box<dyn StreamDetector>)>,
    handle: Option<JoinHandle<ResultSet>>,
}

impl AnalysisConsumer {
    /// Consumer for the queue's stream kind, scoring units with `detector`
    pub fn new(queue: Arc<BoundedFrameQueue>, detector: Box<dyn StreamDetector>) -> Self {
        let kind = queue.kind();
        debug_assert_eq!(detector.kind(), kind);
        let (state, _) = watch::channel(ConsumerState::Idle);
        Self {
            kind,
            queue,
            device: None,
            state: Arc::new(state),
            counters: Arc::new(Counters::default()),
            pending: Some((ResultSet::new(kind), detector)),
            handle: None,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// Assign the compute device; `None` selects the software path
    pub fn set_compute_device(
        &mut self,
        device: Option<Arc<ComputeDevice>>,
    ) -> Result<(), ConsumerError> {
        if self.state() != ConsumerState::Idle {
            return Err(ConsumerError::DeviceAfterStart { kind: self.kind });
        }
        self.device = device;
        Ok(())
    }

    /// Start the pull loop on the runtime's blocking pool
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<(), ConsumerError> {
        if self.state() != ConsumerState::Idle {
            return Err(ConsumerError::AlreadyStarted { kind: self.kind });
        }
        let (results, detector) = self
            .pending
            .take()
            .ok_or(ConsumerError::AlreadyStarted { kind: self.kind })?;

        let worker = Worker {
            kind: self.kind,
            queue: Arc::clone(&self.queue),
            device: self.device.clone(),
            detector,
            results,
            counters: Arc::clone(&self.counters),
            state: Arc::clone(&self.state),
        };

        self.state.send_replace(ConsumerState::Running);
        let handle = Handle::current();
        self.handle = Some(tokio::task::spawn_blocking(move || worker.run(handle)));

        match &self.device {
            Some(device) => info!("{} consumer started on {}", self.kind, device.describe()),
            None => info!("{} consumer started on the software path", self.kind),
        }
        Ok(())
    }

    /// Ask the consumer to stop once its queue is drained
    ///
    /// Units already queued are still analyzed. Closes the queue so the drain
    /// has an end.
    pub fn request_finish(&self) -> Result<(), ConsumerError> {
        match self.state() {
            ConsumerState::Idle => Err(ConsumerError::NotStarted { kind: self.kind }),
            _ => {
                self.state.send_if_modified(|state| {
                    if *state == ConsumerState::Running {
                        *state = ConsumerState::Finishing;
                        true
                    } else {
                        false
                    }
                });
                debug!(
                    "{} consumer finishing with {} units queued",
                    self.kind,
                    self.queue.len()
                );
                self.queue.close();
                Ok(())
            }
        }
    }

    /// Wait for the consumer to stop and take back its result set
    pub async fn join(&mut self) -> Result<ResultSet, ConsumerError> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None if self.state() == ConsumerState::Idle => {
                return Err(ConsumerError::NotStarted { kind: self.kind })
            }
            None => return Err(ConsumerError::AlreadyJoined { kind: self.kind }),
        };

        match handle.await {
            Ok(results) => Ok(results),
            Err(err) => {
                self.state.send_replace(ConsumerState::Stopped);
                Err(ConsumerError::Aborted {
                    kind: self.kind,
                    reason: err.to_string(),
                })
            }
        }
    }

    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            kind: self.kind,
            state: self.state(),
            units_analyzed: self.counters.analyzed.load(Ordering::Relaxed),
            degraded_units: self.counters.degraded.load(Ordering::Relaxed),
            device_dispatches: self.counters.device_dispatches.load(Ordering::Relaxed),
            software_units: self.counters.software_units.load(Ordering::Relaxed),
            device: self.device.as_ref().map(|device| device.info().name.clone()),
            fell_back_to_software: self.counters.fell_back.load(Ordering::Relaxed),
        }
    }
}

/// Closes the queue when the worker exits, so a dead consumer never leaves
/// the producer blocked on a full queue
struct CloseOnExit(Arc<BoundedFrameQueue>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct Worker {
    kind: StreamKind,
    queue: Arc<BoundedFrameQueue>,
    device: Option<Arc<ComputeDevice>>,
    detector: Box<dyn StreamDetector>,
    results: ResultSet,
    counters: Arc<Counters>,
    state: Arc<watch::Sender<ConsumerState>>,
}

impl Worker {
    fn run(mut self, handle: Handle) -> ResultSet {
        let _guard = CloseOnExit(Arc::clone(&self.queue));

        while let Ok(unit) = self.queue.blocking_pop(&handle) {
            self.analyze(unit);
        }

        let tail = self.detector.finish();
        self.results.extend(tail);
        self.state.send_replace(ConsumerState::Stopped);

        info!(
            "{} consumer stopped: {} units, {} marks",
            self.kind,
            self.counters.analyzed.load(Ordering::Relaxed),
            self.results.len()
        );
        self.results
    }

    fn analyze(&mut self, unit: MediaUnit) {
        self.counters.analyzed.fetch_add(1, Ordering::Relaxed);

        match self.extract(Kernel::for_kind(self.kind), &unit) {
            Ok(features) => {
                let marks = self.detector.observe(unit.pts, &features);
                self.results.extend(marks);
            }
            Err(err) => {
                debug!("{} unit at {} could not be scored: {}", self.kind, unit.pts, err);
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                self.results.append(DetectionMark::degraded(unit.pts, self.kind));
            }
        }
    }

    fn extract(&mut self, kernel: Kernel, unit: &MediaUnit) -> Result<FrameFeatures, AnalysisError> {
        if let Some(device) = self.device.clone() {
            self.counters.device_dispatches.fetch_add(1, Ordering::Relaxed);
            match device.execute(kernel, unit) {
                Ok(features) => return Ok(features),
                Err(DispatchError::Unit(err)) => return Err(err),
                Err(DispatchError::Device(err)) => {
                    warn!(
                        "{} analysis falling back to software for the rest of the run: {}",
                        self.kind, err
                    );
                    self.counters.fell_back.store(true, Ordering::Relaxed);
                    self.device = None;
                }
            }
        }

        self.counters.software_units.fetch_add(1, Ordering::Relaxed);
        run_kernel(kernel, unit)
    }
}
