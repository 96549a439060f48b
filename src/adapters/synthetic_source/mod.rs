// Synthetic source adapter - Deterministic recordings for tests and demos

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::domain::errors::SourceError;
use crate::domain::model::{MediaUnit, TimeSpec};
use crate::ports::{MediaSource, SourceOpener};

/// Luma level of the frames inside a black segment
const BLACK_LEVEL: u8 = 8;
const SCENE_LEVELS: [u8; 6] = [66, 130, 194, 98, 162, 226];

/// Description of a generated recording
///
/// Audio is a sine tone interrupted by silence gaps; video is a sequence of
/// flat, lightly textured scenes separated by hard cuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticProgram {
    pub duration_secs: f64,
    pub sample_rate: u32,
    /// Length of one audio unit
    pub audio_unit_secs: f64,
    pub tone_hz: f64,
    pub amplitude: f32,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Start of each silence gap, in seconds
    pub silence_gaps: Vec<f64>,
    pub silence_secs: f64,
    /// Times at which the scene changes
    pub scene_cuts: Vec<f64>,
    /// `(start, end)` spans rendered as black frames
    pub black_segments: Vec<(f64, f64)>,
    /// Video frame indices whose payload is truncated
    pub corrupt_video_frames: Vec<u64>,
}

impl Default for SyntheticProgram {
    fn default() -> Self {
        Self {
            duration_secs: 120.0,
            sample_rate: 8000,
            audio_unit_secs: 0.05,
            tone_hz: 440.0,
            amplitude: 0.5,
            fps: 10.0,
            width: 32,
            height: 18,
            silence_gaps: (0..10).map(|i| 8.0 + f64::from(i) * 11.0).collect(),
            silence_secs: 0.5,
            scene_cuts: vec![12.0, 34.0, 56.0, 78.0, 100.0],
            black_segments: Vec::new(),
            corrupt_video_frames: Vec::new(),
        }
    }
}

impl SyntheticProgram {
    pub fn identifier(&self) -> String {
        format!("synthetic:{}s", self.duration_secs)
    }

    fn audio_unit_count(&self) -> u64 {
        if self.audio_unit_secs <= 0.0 {
            return 0;
        }
        (self.duration_secs / self.audio_unit_secs - 1e-9).ceil().max(0.0) as u64
    }

    fn video_frame_count(&self) -> u64 {
        (self.duration_secs * self.fps - 1e-9).ceil().max(0.0) as u64
    }

    fn samples_per_unit(&self) -> usize {
        (self.audio_unit_secs * f64::from(self.sample_rate)).round() as usize
    }

    /// Bytes the decoded payloads would occupy
    pub fn estimated_size(&self) -> u64 {
        let audio = self.audio_unit_count() * self.samples_per_unit() as u64 * 4;
        let video = self.video_frame_count() * u64::from(self.width) * u64::from(self.height);
        audio + video
    }

    fn is_silent(&self, t: f64) -> bool {
        self.silence_gaps
            .iter()
            .any(|&start| t >= start && t < start + self.silence_secs)
    }

    fn is_black(&self, t: f64) -> bool {
        self.black_segments
            .iter()
            .any(|&(start, end)| t >= start && t < end)
    }

    fn scene_at(&self, t: f64) -> usize {
        self.scene_cuts.iter().filter(|&&cut| t >= cut).count()
    }

    fn audio_unit(&self, index: u64) -> MediaUnit {
        let start = index as f64 * self.audio_unit_secs;
        let rate = f64::from(self.sample_rate);
        let samples = (0..self.samples_per_unit())
            .map(|n| {
                let t = start + n as f64 / rate;
                if self.is_silent(t) {
                    0.0
                } else {
                    self.amplitude * (TAU * self.tone_hz * t).sin() as f32
                }
            })
            .collect();
        MediaUnit::audio(TimeSpec::from_seconds(start), self.sample_rate, 1, samples)
    }

    fn video_frame(&self, index: u64) -> MediaUnit {
        let t = index as f64 / self.fps;
        let pts = TimeSpec::from_seconds(t);
        let (width, height) = (self.width, self.height);

        if self.corrupt_video_frames.contains(&index) {
            return MediaUnit::video(pts, width, height, vec![0; 3]);
        }

        let base = if self.is_black(t) {
            BLACK_LEVEL
        } else {
            SCENE_LEVELS[self.scene_at(t) % SCENE_LEVELS.len()]
        };
        let pixels = (0..height)
            .flat_map(|_| (0..width).map(move |x| base.saturating_add((x % 4) as u8)))
            .collect();
        MediaUnit::video(pts, width, height, pixels)
    }
}

/// Streams the units of a [`SyntheticProgram`] in timestamp order
#[derive(Debug)]
pub struct SyntheticSource {
    program: SyntheticProgram,
    identifier: String,
    next_audio: u64,
    next_video: u64,
    audio_units: u64,
    video_frames: u64,
}

impl SyntheticSource {
    pub fn new(program: SyntheticProgram) -> Self {
        Self {
            identifier: program.identifier(),
            audio_units: program.audio_unit_count(),
            video_frames: program.video_frame_count(),
            next_audio: 0,
            next_video: 0,
            program,
        }
    }
}

impl MediaSource for SyntheticSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn size(&self) -> u64 {
        self.program.estimated_size()
    }

    fn read_unit(&mut self) -> Result<Option<MediaUnit>, SourceError> {
        let audio_due = (self.next_audio < self.audio_units)
            .then(|| self.next_audio as f64 * self.program.audio_unit_secs);
        let video_due = (self.next_video < self.video_frames)
            .then(|| self.next_video as f64 / self.program.fps);

        // Audio first on equal timestamps
        let unit = match (audio_due, video_due) {
            (Some(a), Some(v)) if a <= v => self.take_audio(),
            (Some(_), None) => self.take_audio(),
            (_, Some(_)) => self.take_video(),
            (None, None) => return Ok(None),
        };
        Ok(Some(unit))
    }
}

impl SyntheticSource {
    fn take_audio(&mut self) -> MediaUnit {
        let unit = self.program.audio_unit(self.next_audio);
        self.next_audio += 1;
        unit
    }

    fn take_video(&mut self) -> MediaUnit {
        let unit = self.program.video_frame(self.next_video);
        self.next_video += 1;
        unit
    }
}

impl SourceOpener for SyntheticProgram {
    fn open(&self, _identifier: &str) -> Result<Box<dyn MediaSource>, SourceError> {
        Ok(Box::new(SyntheticSource::new(self.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Payload, StreamKind};

    fn short_program() -> SyntheticProgram {
        SyntheticProgram {
            duration_secs: 2.0,
            silence_gaps: vec![1.0],
            scene_cuts: vec![1.5],
            ..SyntheticProgram::default()
        }
    }

    #[test]
    fn test_units_are_interleaved_by_timestamp() {
        let mut source = SyntheticSource::new(short_program());
        let mut last = [f64::MIN; 2];
        let mut counts = [0usize; 2];
        while let Some(unit) = source.read_unit().unwrap() {
            let slot = match unit.kind {
                StreamKind::Audio => 0,
                StreamKind::Video => 1,
            };
            assert!(unit.pts.seconds > last[slot]);
            last[slot] = unit.pts.seconds;
            counts[slot] += 1;
        }
        assert_eq!(counts, [40, 20]);
    }

    #[test]
    fn test_silence_gap_is_digital_silence() {
        let program = short_program();
        let unit = program.audio_unit(20);
        match unit.payload {
            Payload::Pcm { samples, .. } => assert!(samples.iter().all(|s| *s == 0.0)),
            _ => panic!("expected pcm"),
        }
    }

    #[test]
    fn test_corrupt_and_black_frames() {
        let program = SyntheticProgram {
            black_segments: vec![(0.0, 0.5)],
            corrupt_video_frames: vec![7],
            ..short_program()
        };
        match program.video_frame(0).payload {
            Payload::Luma { pixels, .. } => assert!(pixels.iter().all(|p| *p < 12)),
            _ => panic!("expected luma"),
        }
        assert_eq!(program.video_frame(7).payload_size(), 3);
    }

    #[test]
    fn test_zero_duration_has_zero_size() {
        let program = SyntheticProgram {
            duration_secs: 0.0,
            ..SyntheticProgram::default()
        };
        assert_eq!(SyntheticSource::new(program).size(), 0);
    }
}
