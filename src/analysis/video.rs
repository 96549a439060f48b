//! Luma histogram kernel with black-frame and scene-change detection

use crate::analysis::{FrameFeatures, StreamDetector, VideoAnalysisConfig, HISTOGRAM_BINS};
use crate::domain::errors::AnalysisError;
use crate::domain::model::{DetectionMark, MarkType, MediaUnit, Payload, StreamKind, TimeSpec};

/// Mean luma and normalized histogram of a frame
pub fn luma_histogram(unit: &MediaUnit) -> Result<FrameFeatures, AnalysisError> {
    let (width, height, pixels) = match &unit.payload {
        Payload::Luma {
            width,
            height,
            pixels,
        } => (*width as usize, *height as usize, pixels),
        Payload::Empty => {
            return Err(AnalysisError::EmptyPayload {
                kind: StreamKind::Video,
            })
        }
        Payload::Pcm { .. } => {
            return Err(AnalysisError::KindMismatch {
                expected: StreamKind::Video,
                found: "pcm".to_string(),
            })
        }
    };

    let expected = width * height;
    if expected == 0 || pixels.is_empty() {
        return Err(AnalysisError::EmptyPayload {
            kind: StreamKind::Video,
        });
    }
    if pixels.len() != expected {
        return Err(AnalysisError::Geometry {
            expected,
            found: pixels.len(),
        });
    }

    let mut counts = [0u64; HISTOGRAM_BINS];
    let mut sum = 0u64;
    for &pixel in pixels {
        counts[pixel as usize * HISTOGRAM_BINS / 256] += 1;
        sum += u64::from(pixel);
    }

    let total = expected as f32;
    let mut histogram = [0.0f32; HISTOGRAM_BINS];
    for (bin, count) in histogram.iter_mut().zip(counts) {
        *bin = count as f32 / total;
    }

    Ok(FrameFeatures::Luma {
        mean: sum as f32 / total,
        histogram,
    })
}

/// Half the L1 distance between two normalized histograms, in [0, 1]
pub fn histogram_distance(a: &[f32; HISTOGRAM_BINS], b: &[f32; HISTOGRAM_BINS]) -> f32 {
    let l1: f32 = a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum();
    (l1 / 2.0).min(1.0)
}

/// Black-frame runs and hard cuts
#[derive(Debug)]
pub struct VideoDetector {
    black_threshold: f32,
    scene_threshold: f32,
    in_black: bool,
    previous: Option<[f32; HISTOGRAM_BINS]>,
}

impl VideoDetector {
    pub fn new(config: &VideoAnalysisConfig) -> Self {
        Self {
            black_threshold: config.black_luma_threshold,
            scene_threshold: config.scene_change_threshold,
            in_black: false,
            previous: None,
        }
    }
}

impl StreamDetector for VideoDetector {
    fn kind(&self) -> StreamKind {
        StreamKind::Video
    }

    fn observe(&mut self, pts: TimeSpec, features: &FrameFeatures) -> Vec<DetectionMark> {
        let FrameFeatures::Luma { mean, histogram } = features else {
            return Vec::new();
        };

        let mut marks = Vec::new();
        let black = *mean <= self.black_threshold;

        if black && !self.in_black {
            let confidence = 1.0 - mean / (self.black_threshold + 1.0);
            marks.push(DetectionMark::new(
                pts,
                StreamKind::Video,
                MarkType::BlackFrame,
                confidence,
            ));
        }

        // Entering black is already reported as a black frame
        if !black {
            if let Some(previous) = &self.previous {
                let distance = histogram_distance(previous, histogram);
                if distance >= self.scene_threshold {
                    marks.push(DetectionMark::new(
                        pts,
                        StreamKind::Video,
                        MarkType::SceneChange,
                        distance,
                    ));
                }
            }
        }

        self.in_black = black;
        self.previous = Some(*histogram);
        marks
    }

    fn finish(&mut self) -> Vec<DetectionMark> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pts: f64, level: u8) -> MediaUnit {
        MediaUnit::video(TimeSpec::from_seconds(pts), 8, 4, vec![level; 32])
    }

    fn feed(detector: &mut VideoDetector, unit: &MediaUnit) -> Vec<DetectionMark> {
        let features = luma_histogram(unit).unwrap();
        detector.observe(unit.pts, &features)
    }

    #[test]
    fn test_histogram_is_normalized() {
        let mut pixels = vec![0u8; 16];
        pixels.extend(vec![255u8; 16]);
        let unit = MediaUnit::video(TimeSpec::default(), 8, 4, pixels);
        let FrameFeatures::Luma { mean, histogram } = luma_histogram(&unit).unwrap() else {
            panic!("expected luma features");
        };
        assert!((mean - 127.5).abs() < 1e-3);
        assert_eq!(histogram[0], 0.5);
        assert_eq!(histogram[HISTOGRAM_BINS - 1], 0.5);
        assert!((histogram.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_geometry_mismatch_is_unit_failure() {
        let unit = MediaUnit::video(TimeSpec::default(), 8, 4, vec![0; 31]);
        assert_eq!(
            luma_histogram(&unit),
            Err(AnalysisError::Geometry {
                expected: 32,
                found: 31
            })
        );
    }

    #[test]
    fn test_scene_cut_detected_once() {
        let mut detector = VideoDetector::new(&VideoAnalysisConfig::default());
        assert!(feed(&mut detector, &flat(0.0, 66)).is_empty());
        assert!(feed(&mut detector, &flat(0.1, 66)).is_empty());

        let marks = feed(&mut detector, &flat(0.2, 194));
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].mark_type, MarkType::SceneChange);
        assert_eq!(marks[0].confidence, 1.0);

        assert!(feed(&mut detector, &flat(0.3, 194)).is_empty());
    }

    #[test]
    fn test_black_run_reported_at_start() {
        let mut detector = VideoDetector::new(&VideoAnalysisConfig::default());
        feed(&mut detector, &flat(0.0, 130));

        let marks = feed(&mut detector, &flat(0.1, 8));
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].mark_type, MarkType::BlackFrame);
        assert!((marks[0].timestamp.seconds - 0.1).abs() < 1e-9);

        assert!(feed(&mut detector, &flat(0.2, 8)).is_empty());

        // Leaving black is a cut back into content
        let marks = feed(&mut detector, &flat(0.3, 130));
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].mark_type, MarkType::SceneChange);
    }
}
