use std::sync::Arc;

use commflag::adapters::{ConfiguredDeviceProvider, SyntheticProgram};
use commflag::config::DeviceSpec;
use commflag::devices::{ComputeDeviceRegistry, DeviceKind, SingleDevicePolicy};
use commflag::domain::errors::{PipelineError, SourceError};
use commflag::domain::model::{DetectionMark, MarkType};
use commflag::pipeline::{PipelineCoordinator, PipelineOutput};
use commflag::PipelineConfig;

/// Test fixtures for end-to-end pipeline runs
mod test_utils {
    use super::*;

    pub const TOLERANCE_SECS: f64 = 0.5;

    pub fn device(name: &str, compute_units: u32) -> DeviceSpec {
        DeviceSpec {
            name: name.to_string(),
            vendor: "emulated".to_string(),
            kind: DeviceKind::Gpu,
            compute_units,
            max_clock_mhz: 1500,
            global_mem_mb: 4096,
            latency_ms: 0,
            fail_after: None,
        }
    }

    pub async fn run(
        program: SyntheticProgram,
        config: PipelineConfig,
        devices: Vec<DeviceSpec>,
    ) -> Result<PipelineOutput, PipelineError> {
        let registry = ComputeDeviceRegistry::new(&ConfiguredDeviceProvider::new(devices));
        let mut coordinator = PipelineCoordinator::new(Arc::new(config), Arc::new(registry));
        coordinator.open(&program, &program.identifier())?;
        coordinator.run().await
    }

    /// Every expected time has a mark of `mark_type` within the tolerance
    pub fn assert_marks_near(marks: &[DetectionMark], mark_type: MarkType, expected: &[f64]) {
        for &time in expected {
            assert!(
                marks
                    .iter()
                    .filter(|mark| mark.mark_type == mark_type)
                    .any(|mark| (mark.timestamp.seconds - time).abs() <= TOLERANCE_SECS),
                "no {} mark within {}s of {}s",
                mark_type,
                TOLERANCE_SECS,
                time
            );
        }
    }
}

use test_utils::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_minute_recording_is_flagged() {
    let program = SyntheticProgram::default();
    let output = run(program.clone(), PipelineConfig::default(), vec![])
        .await
        .unwrap();

    assert!(output.audio.count_of(MarkType::Silence) >= 10);
    assert!(output.video.count_of(MarkType::SceneChange) >= 5);
    assert_marks_near(output.audio.marks(), MarkType::Silence, &program.silence_gaps);
    assert_marks_near(output.video.marks(), MarkType::SceneChange, &program.scene_cuts);

    let stats = &output.stats;
    assert_eq!(stats.producer.audio_units, 2400);
    assert_eq!(stats.producer.video_units, 1200);
    assert_eq!(stats.audio.units_analyzed, stats.producer.audio_units);
    assert_eq!(stats.video.units_analyzed, stats.producer.video_units);
    assert_eq!(stats.producer.dropped_units, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_devices_do_not_change_the_marks() {
    let program = SyntheticProgram {
        duration_secs: 60.0,
        ..SyntheticProgram::default()
    };

    let software = run(program.clone(), PipelineConfig::default(), vec![])
        .await
        .unwrap();
    let accelerated = run(
        program,
        PipelineConfig::default(),
        vec![device("gpu-a", 32), device("gpu-b", 16)],
    )
    .await
    .unwrap();

    assert_eq!(software.audio.marks(), accelerated.audio.marks());
    assert_eq!(software.video.marks(), accelerated.video.marks());
    assert!(accelerated.stats.video.device_dispatches > 0);
    assert!(accelerated.stats.audio.device_dispatches > 0);
    assert_eq!(software.stats.video.device_dispatches, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_devices_are_split_between_roles() {
    let program = SyntheticProgram {
        duration_secs: 5.0,
        ..SyntheticProgram::default()
    };
    let output = run(
        program,
        PipelineConfig::default(),
        vec![device("small", 8), device("large", 64)],
    )
    .await
    .unwrap();

    let video = output.stats.video.device.clone().unwrap();
    let audio = output.stats.audio.device.clone().unwrap();
    assert_ne!(video, audio);
    assert!(video.contains("large"));
    assert!(audio.contains("small"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_device_policies() {
    let program = SyntheticProgram {
        duration_secs: 5.0,
        ..SyntheticProgram::default()
    };

    let exclusive = run(
        program.clone(),
        PipelineConfig::default(),
        vec![device("only", 16)],
    )
    .await
    .unwrap();
    assert!(exclusive.stats.video.device.is_some());
    assert!(exclusive.stats.audio.device.is_none());

    let shared = run(
        program,
        PipelineConfig {
            single_device_policy: SingleDevicePolicy::Share,
            ..PipelineConfig::default()
        },
        vec![device("only", 16)],
    )
    .await
    .unwrap();
    assert_eq!(shared.stats.video.device, shared.stats.audio.device);
    assert_eq!(shared.audio.marks(), exclusive.audio.marks());
}

#[tokio::test]
async fn test_zero_length_source_is_rejected_before_start() {
    let program = SyntheticProgram {
        duration_secs: 0.0,
        ..SyntheticProgram::default()
    };
    let registry = ComputeDeviceRegistry::software_only();
    let mut coordinator =
        PipelineCoordinator::new(Arc::new(PipelineConfig::default()), Arc::new(registry));

    let err = coordinator.open(&program, "empty").unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Source(SourceError::SourceEmpty { .. })
    ));
    assert_eq!(coordinator.consumers_started(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_device_fault_falls_back_to_software() {
    let program = SyntheticProgram {
        duration_secs: 30.0,
        ..SyntheticProgram::default()
    };
    let baseline = run(program.clone(), PipelineConfig::default(), vec![])
        .await
        .unwrap();

    let mut flaky = device("flaky", 32);
    flaky.fail_after = Some(40);
    let output = run(program, PipelineConfig::default(), vec![flaky])
        .await
        .unwrap();

    assert!(output.stats.video.fell_back_to_software);
    assert_eq!(output.stats.video.device_dispatches, 41);
    assert_eq!(output.stats.video.degraded_units, 0);
    assert_eq!(output.video.marks(), baseline.video.marks());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_corrupt_frames_become_degraded_marks() {
    let program = SyntheticProgram {
        duration_secs: 20.0,
        scene_cuts: vec![12.0],
        corrupt_video_frames: vec![5, 50],
        ..SyntheticProgram::default()
    };
    let output = run(program.clone(), PipelineConfig::default(), vec![])
        .await
        .unwrap();

    assert_eq!(output.video.count_of(MarkType::Degraded), 2);
    assert_eq!(output.stats.video.degraded_units, 2);
    assert_eq!(output.stats.video.units_analyzed, 200);
    assert_marks_near(output.video.marks(), MarkType::SceneChange, &program.scene_cuts);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_device_with_tiny_queue_completes() {
    let program = SyntheticProgram {
        duration_secs: 10.0,
        silence_gaps: vec![3.0, 8.0],
        ..SyntheticProgram::default()
    };
    let mut slow = device("slow", 16);
    slow.latency_ms = 2;

    let output = run(
        program.clone(),
        PipelineConfig {
            queue_capacity: 1,
            ..PipelineConfig::default()
        },
        vec![slow],
    )
    .await
    .unwrap();

    assert_eq!(output.stats.queue_capacity, 1);
    assert_eq!(output.stats.video.units_analyzed, 100);
    assert_eq!(output.stats.audio.units_analyzed, 200);
    assert_marks_near(output.audio.marks(), MarkType::Silence, &program.silence_gaps);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_black_segments_are_flagged() {
    let program = SyntheticProgram {
        duration_secs: 30.0,
        black_segments: vec![(20.0, 21.0)],
        ..SyntheticProgram::default()
    };
    let output = run(program, PipelineConfig::default(), vec![])
        .await
        .unwrap();

    assert_marks_near(output.video.marks(), MarkType::BlackFrame, &[20.0]);
}
