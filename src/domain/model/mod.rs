// Domain models - Core types shared by the queues, consumers and coordinator

use std::fmt;

use serde::{Deserialize, Serialize};

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Format as HH:MM:SS.ms
    fn format_hms(&self) -> String {
        let total_millis = (self.seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Elementary stream kinds the pipeline splits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Audio,
    Video,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Audio => "audio",
            StreamKind::Video => "video",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded payload carried by a media unit
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Interleaved PCM samples normalized to [-1.0, 1.0]
    Pcm {
        sample_rate: u32,
        channels: u16,
        samples: Vec<f32>,
    },
    /// 8-bit luma plane, row-major, no padding
    Luma {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Decoder produced nothing usable for this unit
    Empty,
}

impl Payload {
    /// Payload size in bytes
    pub fn size(&self) -> usize {
        match self {
            Payload::Pcm { samples, .. } => samples.len() * std::mem::size_of::<f32>(),
            Payload::Luma { pixels, .. } => pixels.len(),
            Payload::Empty => 0,
        }
    }
}

/// One decoded audio or video frame
///
/// A unit is owned by exactly one queue slot at a time and moves to the
/// consumer on dequeue.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUnit {
    pub kind: StreamKind,
    pub pts: TimeSpec,
    pub payload: Payload,
}

impl MediaUnit {
    pub fn new(kind: StreamKind, pts: TimeSpec, payload: Payload) -> Self {
        Self { kind, pts, payload }
    }

    /// Audio unit from interleaved samples
    pub fn audio(pts: TimeSpec, sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self::new(
            StreamKind::Audio,
            pts,
            Payload::Pcm {
                sample_rate,
                channels,
                samples,
            },
        )
    }

    /// Video unit from a luma plane
    pub fn video(pts: TimeSpec, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(
            StreamKind::Video,
            pts,
            Payload::Luma {
                width,
                height,
                pixels,
            },
        )
    }

    pub fn payload_size(&self) -> usize {
        self.payload.size()
    }
}

/// Heuristic signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkType {
    Silence,
    BlackFrame,
    SceneChange,
    /// A unit that could not be scored
    Degraded,
}

impl fmt::Display for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkType::Silence => "silence",
            MarkType::BlackFrame => "black-frame",
            MarkType::SceneChange => "scene-change",
            MarkType::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// A timestamped heuristic signal used to infer commercial boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionMark {
    pub timestamp: TimeSpec,
    pub kind: StreamKind,
    pub mark_type: MarkType,
    /// Strength in [0.0, 1.0]; degraded marks carry 0.0
    pub confidence: f32,
}

impl DetectionMark {
    pub fn new(timestamp: TimeSpec, kind: StreamKind, mark_type: MarkType, confidence: f32) -> Self {
        Self {
            timestamp,
            kind,
            mark_type,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Placeholder mark for a unit that failed analysis
    pub fn degraded(timestamp: TimeSpec, kind: StreamKind) -> Self {
        Self::new(timestamp, kind, MarkType::Degraded, 0.0)
    }

    pub fn is_degraded(&self) -> bool {
        self.mark_type == MarkType::Degraded
    }
}

impl fmt::Display for DetectionMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({:.2})",
            self.timestamp, self.kind, self.mark_type, self.confidence
        )
    }
}

#[cfg(test)]
mod tests;
