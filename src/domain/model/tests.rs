// Unit tests for domain models

use super::*;

#[test]
fn test_time_spec_display() {
    assert_eq!(TimeSpec::from_seconds(3723.456).to_string(), "1:02:03.456");
    assert_eq!(TimeSpec::from_seconds(123.5).to_string(), "2:03.500");
}

#[test]
fn test_payload_size() {
    let audio = MediaUnit::audio(TimeSpec::from_seconds(0.0), 8000, 1, vec![0.0; 400]);
    assert_eq!(audio.payload_size(), 1600);

    let video = MediaUnit::video(TimeSpec::from_seconds(0.0), 4, 2, vec![0; 8]);
    assert_eq!(video.payload_size(), 8);

    let empty = MediaUnit::new(StreamKind::Video, TimeSpec::default(), Payload::Empty);
    assert_eq!(empty.payload_size(), 0);
}

#[test]
fn test_mark_confidence_is_clamped() {
    let mark = DetectionMark::new(
        TimeSpec::from_seconds(1.0),
        StreamKind::Video,
        MarkType::SceneChange,
        1.7,
    );
    assert_eq!(mark.confidence, 1.0);

    let degraded = DetectionMark::degraded(TimeSpec::from_seconds(2.0), StreamKind::Audio);
    assert!(degraded.is_degraded());
    assert_eq!(degraded.confidence, 0.0);
}

#[test]
fn test_mark_serializes_with_kebab_case_type() {
    let mark = DetectionMark::new(
        TimeSpec::from_seconds(12.5),
        StreamKind::Video,
        MarkType::BlackFrame,
        0.5,
    );
    let json = serde_json::to_value(&mark).unwrap();
    assert_eq!(json["timestamp"], 12.5);
    assert_eq!(json["kind"], "video");
    assert_eq!(json["mark_type"], "black-frame");
}
