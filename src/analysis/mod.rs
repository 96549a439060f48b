//! Per-frame analysis: feature kernels and the stateful detectors fed by them
//!
//! A kernel turns one [`MediaUnit`] into [`FrameFeatures`]. Kernels are the
//! unit of work a compute device may take over; [`run_kernel`] is the
//! software path every backend must agree with. Detectors stay on the host
//! and turn the feature sequence of one stream into [`DetectionMark`]s.

use serde::{Deserialize, Serialize};

use crate::domain::errors::AnalysisError;
use crate::domain::model::{DetectionMark, MediaUnit, StreamKind, TimeSpec};

pub mod audio;
pub mod video;

pub use audio::SilenceDetector;
pub use video::VideoDetector;

/// Number of luma histogram bins
pub const HISTOGRAM_BINS: usize = 32;

/// Per-frame kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// RMS and peak level of a PCM unit
    AudioEnergy,
    /// Mean luma and normalized histogram of a video frame
    LumaHistogram,
}

impl Kernel {
    pub fn for_kind(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Audio => Kernel::AudioEnergy,
            StreamKind::Video => Kernel::LumaHistogram,
        }
    }
}

/// Features extracted from one unit
#[derive(Debug, Clone, PartialEq)]
pub enum FrameFeatures {
    Energy {
        rms_db: f32,
        peak_db: f32,
        duration_secs: f64,
    },
    Luma {
        mean: f32,
        histogram: [f32; HISTOGRAM_BINS],
    },
}

/// Run a kernel on the host
pub fn run_kernel(kernel: Kernel, unit: &MediaUnit) -> Result<FrameFeatures, AnalysisError> {
    match kernel {
        Kernel::AudioEnergy => audio::energy(unit),
        Kernel::LumaHistogram => video::luma_histogram(unit),
    }
}

/// Stateful heuristic over the feature sequence of one stream
pub trait StreamDetector: Send {
    fn kind(&self) -> StreamKind;

    /// Feed the features of the unit at `pts`, in decode order
    fn observe(&mut self, pts: TimeSpec, features: &FrameFeatures) -> Vec<DetectionMark>;

    /// Flush any mark still pending at end of stream
    fn finish(&mut self) -> Vec<DetectionMark>;
}

/// Audio heuristic thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioAnalysisConfig {
    /// Units with an RMS level below this are silent (dBFS)
    pub silence_threshold_db: f32,
    /// Shortest silent run reported as a mark
    pub min_silence_secs: f64,
}

impl Default for AudioAnalysisConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: -45.0,
            min_silence_secs: 0.1,
        }
    }
}

/// Video heuristic thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoAnalysisConfig {
    /// Frames with a mean luma at or below this are black
    pub black_luma_threshold: f32,
    /// Histogram distance in [0, 1] that counts as a cut
    pub scene_change_threshold: f32,
}

impl Default for VideoAnalysisConfig {
    fn default() -> Self {
        Self {
            black_luma_threshold: 24.0,
            scene_change_threshold: 0.45,
        }
    }
}

/// Build the detector for a stream kind
pub fn detector_for(
    kind: StreamKind,
    audio: &AudioAnalysisConfig,
    video: &VideoAnalysisConfig,
) -> Box<dyn StreamDetector> {
    match kind {
        StreamKind::Audio => Box::new(SilenceDetector::new(audio)),
        StreamKind::Video => Box::new(VideoDetector::new(video)),
    }
}
