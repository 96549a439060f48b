//! Pipeline coordinator: open, produce, route, drain, join

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::analysis::detector_for;
use crate::config::PipelineConfig;
use crate::devices::{ComputeDevice, ComputeDeviceRegistry};
use crate::domain::errors::{ConsumerError, PipelineError, SourceError};
use crate::domain::model::{MediaUnit, StreamKind};
use crate::pipeline::consumer::{AnalysisConsumer, ConsumerStats};
use crate::pipeline::queue::BoundedFrameQueue;
use crate::pipeline::results::ResultSet;
use crate::pipeline::PipelineRunState;
use crate::ports::{MediaSource, SourceOpener};

/// What the producer loop saw
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProducerStats {
    pub units_read: u64,
    pub audio_units: u64,
    pub video_units: u64,
    /// Reads that failed and were skipped
    pub read_errors: u64,
    /// Units refused by a closed queue
    pub dropped_units: u64,
    /// The source was abandoned after too many consecutive read errors
    pub truncated: bool,
    /// Error that ended the source early, if any
    pub source_error: Option<String>,
}

impl ProducerStats {
    fn count(&mut self, kind: StreamKind) {
        self.units_read += 1;
        match kind {
            StreamKind::Audio => self.audio_units += 1,
            StreamKind::Video => self.video_units += 1,
        }
    }
}

/// Statistics for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub source: String,
    pub source_bytes: u64,
    pub queue_capacity: usize,
    pub producer: ProducerStats,
    pub audio: ConsumerStats,
    pub video: ConsumerStats,
    pub elapsed_secs: f64,
}

/// The two result sets handed to the merge stage
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub audio: ResultSet,
    pub video: ResultSet,
    pub stats: RunStats,
}

/// Runs one source through the two analysis consumers
pub struct PipelineCoordinator {
    config: Arc<PipelineConfig>,
    registry: Arc<ComputeDeviceRegistry>,
    state: PipelineRunState,
    source: Option<Box<dyn MediaSource>>,
    consumers_started: usize,
}

impl PipelineCoordinator {
    pub fn new(config: Arc<PipelineConfig>, registry: Arc<ComputeDeviceRegistry>) -> Self {
        Self {
            config,
            registry,
            state: PipelineRunState::Idle,
            source: None,
            consumers_started: 0,
        }
    }

    pub fn state(&self) -> PipelineRunState {
        self.state
    }

    /// Consumers started so far; stays zero when open fails
    pub fn consumers_started(&self) -> usize {
        self.consumers_started
    }

    /// Acquire the source through an opener
    ///
    /// `SourceNotFound` and `SourceEmpty` are returned before anything is started.
    pub fn open(&mut self, opener: &dyn SourceOpener, identifier: &str) -> Result<(), PipelineError> {
        if self.state != PipelineRunState::Idle {
            return Err(PipelineError::AlreadyRun);
        }
        let source = opener.open(identifier)?;
        self.open_source(source)
    }

    /// Take an already opened source
    pub fn open_source(&mut self, source: Box<dyn MediaSource>) -> Result<(), PipelineError> {
        if self.state != PipelineRunState::Idle {
            return Err(PipelineError::AlreadyRun);
        }
        if source.size() == 0 {
            warn!("Source {} is zero-length", source.identifier());
            return Err(SourceError::SourceEmpty {
                identifier: source.identifier().to_string(),
            }
            .into());
        }

        info!("Opened {} ({} bytes)", source.identifier(), source.size());
        self.source = Some(source);
        Ok(())
    }

    /// Run the opened source to completion and return both result sets
    pub async fn run(&mut self) -> Result<PipelineOutput, PipelineError> {
        if self.state != PipelineRunState::Idle {
            return Err(PipelineError::AlreadyRun);
        }
        let source = self.source.take().ok_or(PipelineError::NotOpened)?;
        let identifier = source.identifier().to_string();
        let source_bytes = source.size();
        let started = Instant::now();

        let assignment = self.registry.assign_roles(self.config.single_device_policy);
        let capacity = self.config.queue_capacity;
        let audio_queue = Arc::new(BoundedFrameQueue::new(StreamKind::Audio, capacity));
        let video_queue = Arc::new(BoundedFrameQueue::new(StreamKind::Video, capacity));

        let mut audio = self.consumer(Arc::clone(&audio_queue), assignment.audio.clone())?;
        let mut video = self.consumer(Arc::clone(&video_queue), assignment.video.clone())?;

        self.state = PipelineRunState::Running;
        video.start()?;
        self.consumers_started += 1;
        audio.start()?;
        self.consumers_started += 1;

        let router = Router {
            audio: Arc::clone(&audio_queue),
            video: Arc::clone(&video_queue),
        };
        let max_errors = self.config.source.max_consecutive_read_errors;
        let handle = Handle::current();
        let producer =
            tokio::task::spawn_blocking(move || produce(source, &router, &handle, max_errors)).await;

        self.state = PipelineRunState::Draining;
        info!(
            "End of source, draining {} audio and {} video units",
            audio_queue.len(),
            video_queue.len()
        );
        audio_queue.close();
        video_queue.close();

        // Join both before reporting any failure so no consumer outlives the run
        let audio_results = finish(&mut audio).await;
        let video_results = finish(&mut video).await;
        self.state = PipelineRunState::Stopped;

        let producer = producer.map_err(|err| PipelineError::Producer(err.to_string()))?;
        let audio_results = audio_results?;
        let video_results = video_results?;

        let stats = RunStats {
            source: identifier,
            source_bytes,
            queue_capacity: capacity,
            producer,
            audio: audio.stats(),
            video: video.stats(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            "Run finished in {:.2}s: {} units, {} audio marks, {} video marks",
            stats.elapsed_secs,
            stats.producer.units_read,
            audio_results.len(),
            video_results.len()
        );

        Ok(PipelineOutput {
            audio: audio_results,
            video: video_results,
            stats,
        })
    }

    fn consumer(
        &self,
        queue: Arc<BoundedFrameQueue>,
        device: Option<Arc<ComputeDevice>>,
    ) -> Result<AnalysisConsumer, ConsumerError> {
        let detector = detector_for(queue.kind(), &self.config.audio, &self.config.video);
        let mut consumer = AnalysisConsumer::new(queue, detector);
        consumer.set_compute_device(device)?;
        Ok(consumer)
    }
}

async fn finish(consumer: &mut AnalysisConsumer) -> Result<ResultSet, ConsumerError> {
    consumer.request_finish()?;
    consumer.join().await
}

/// The one place units are dispatched by stream kind
struct Router {
    audio: Arc<BoundedFrameQueue>,
    video: Arc<BoundedFrameQueue>,
}

impl Router {
    fn route(&self, unit: &MediaUnit) -> &BoundedFrameQueue {
        match unit.kind {
            StreamKind::Audio => &self.audio,
            StreamKind::Video => &self.video,
        }
    }
}

fn produce(
    mut source: Box<dyn MediaSource>,
    router: &Router,
    handle: &Handle,
    max_consecutive_errors: u32,
) -> ProducerStats {
    let mut stats = ProducerStats::default();
    let mut consecutive_errors = 0u32;

    loop {
        match source.read_unit() {
            Ok(Some(unit)) => {
                consecutive_errors = 0;
                stats.count(unit.kind);
                // A closed queue only means its consumer is gone
                if router.route(&unit).blocking_push(handle, unit).is_err() {
                    stats.dropped_units += 1;
                }
            }
            Ok(None) => break,
            Err(err) if err.is_fatal() => {
                warn!("Source {} ended early: {}", source.identifier(), err);
                stats.source_error = Some(err.to_string());
                break;
            }
            Err(err) => {
                stats.read_errors += 1;
                consecutive_errors += 1;
                debug!("Skipping unreadable unit: {}", err);
                if consecutive_errors >= max_consecutive_errors {
                    warn!(
                        "Giving up on {} after {} consecutive read errors",
                        source.identifier(),
                        consecutive_errors
                    );
                    stats.truncated = true;
                    stats.source_error = Some(err.to_string());
                    break;
                }
            }
        }
    }

    debug!(
        "Producer done: {} audio, {} video units",
        stats.audio_units, stats.video_units
    );
    stats
}
