//! Audio energy kernel and silence detection

use crate::analysis::{AudioAnalysisConfig, FrameFeatures, StreamDetector};
use crate::domain::errors::AnalysisError;
use crate::domain::model::{DetectionMark, MarkType, MediaUnit, Payload, StreamKind, TimeSpec};

/// Level reported for digital silence
pub const FLOOR_DB: f32 = -100.0;

fn to_db(level: f32) -> f32 {
    if level <= 0.0 {
        FLOOR_DB
    } else {
        (20.0 * level.log10()).max(FLOOR_DB)
    }
}

/// RMS and peak level of a PCM unit, in dBFS
pub fn energy(unit: &MediaUnit) -> Result<FrameFeatures, AnalysisError> {
    let (sample_rate, channels, samples) = match &unit.payload {
        Payload::Pcm {
            sample_rate,
            channels,
            samples,
        } => (*sample_rate, *channels, samples),
        Payload::Empty => {
            return Err(AnalysisError::EmptyPayload {
                kind: StreamKind::Audio,
            })
        }
        Payload::Luma { .. } => {
            return Err(AnalysisError::KindMismatch {
                expected: StreamKind::Audio,
                found: "luma".to_string(),
            })
        }
    };

    if samples.is_empty() {
        return Err(AnalysisError::EmptyPayload {
            kind: StreamKind::Audio,
        });
    }
    if sample_rate == 0 || channels == 0 {
        return Err(AnalysisError::AudioFormat(format!(
            "{} Hz, {} channels",
            sample_rate, channels
        )));
    }
    if samples.len() % channels as usize != 0 {
        return Err(AnalysisError::AudioFormat(format!(
            "{} samples do not divide into {} channels",
            samples.len(),
            channels
        )));
    }

    let mut sum_squares = 0.0f64;
    let mut peak = 0.0f32;
    for &sample in samples {
        let magnitude = sample.abs();
        if !magnitude.is_finite() {
            return Err(AnalysisError::AudioFormat("non-finite sample".to_string()));
        }
        peak = peak.max(magnitude);
        sum_squares += f64::from(sample) * f64::from(sample);
    }
    let rms = (sum_squares / samples.len() as f64).sqrt() as f32;
    let frames = samples.len() / channels as usize;

    Ok(FrameFeatures::Energy {
        rms_db: to_db(rms),
        peak_db: to_db(peak),
        duration_secs: frames as f64 / f64::from(sample_rate),
    })
}

#[derive(Debug, Clone)]
struct SilenceRun {
    start: TimeSpec,
    end: f64,
    level_sum: f64,
    units: u32,
}

/// Reports one mark per run of silent units
#[derive(Debug)]
pub struct SilenceDetector {
    threshold_db: f32,
    min_duration: f64,
    run: Option<SilenceRun>,
}

impl SilenceDetector {
    pub fn new(config: &AudioAnalysisConfig) -> Self {
        Self {
            threshold_db: config.silence_threshold_db,
            min_duration: config.min_silence_secs,
            run: None,
        }
    }

    fn close_run(&mut self) -> Option<DetectionMark> {
        let run = self.run.take()?;
        if run.end - run.start.seconds + f64::EPSILON < self.min_duration {
            return None;
        }
        // Deeper silence relative to the threshold scores higher
        let mean_db = (run.level_sum / f64::from(run.units)) as f32;
        let span = (self.threshold_db - FLOOR_DB).max(1.0);
        let confidence = (self.threshold_db - mean_db) / span;
        Some(DetectionMark::new(
            run.start,
            StreamKind::Audio,
            MarkType::Silence,
            confidence.max(0.05),
        ))
    }
}

impl StreamDetector for SilenceDetector {
    fn kind(&self) -> StreamKind {
        StreamKind::Audio
    }

    fn observe(&mut self, pts: TimeSpec, features: &FrameFeatures) -> Vec<DetectionMark> {
        let FrameFeatures::Energy {
            rms_db,
            duration_secs,
            ..
        } = features
        else {
            return Vec::new();
        };

        if *rms_db < self.threshold_db {
            let run = self.run.get_or_insert(SilenceRun {
                start: pts,
                end: pts.seconds,
                level_sum: 0.0,
                units: 0,
            });
            run.end = pts.seconds + duration_secs;
            run.level_sum += f64::from(*rms_db);
            run.units += 1;
            Vec::new()
        } else {
            self.close_run().into_iter().collect()
        }
    }

    fn finish(&mut self) -> Vec<DetectionMark> {
        self.close_run().into_iter().collect()
    }
}
