//! Analysis reports and their output

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::model::{DetectionMark, MarkType};
use crate::pipeline::{PipelineOutput, RunStats};
use crate::utils::Utils;

pub mod writer;

pub use writer::ReportWriter;

/// Report rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

/// Everything handed to the merge stage, plus run metadata
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,
    pub audio_marks: Vec<DetectionMark>,
    pub video_marks: Vec<DetectionMark>,
    pub stats: RunStats,
}

impl AnalysisReport {
    pub fn from_output(output: PipelineOutput, job_id: Option<u64>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            source: output.stats.source.clone(),
            job_id,
            audio_marks: output.audio.into_marks(),
            video_marks: output.video.into_marks(),
            stats: output.stats,
        }
    }

    fn count(marks: &[DetectionMark], mark_type: MarkType) -> usize {
        marks.iter().filter(|m| m.mark_type == mark_type).count()
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, serde_json::Error> {
        match format {
            ReportFormat::Json => serde_json::to_string_pretty(self),
            ReportFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let stats = &self.stats;

        let _ = writeln!(out, "Source:   {} ({})", self.source, Utils::format_file_size(stats.source_bytes));
        if let Some(job) = self.job_id {
            let _ = writeln!(out, "Job:      {}", job);
        }
        let _ = writeln!(
            out,
            "Elapsed:  {} ({:.0} units/s)",
            Utils::format_duration(Duration::from_secs_f64(stats.elapsed_secs.max(0.0))),
            Utils::throughput(stats.producer.units_read, stats.elapsed_secs)
        );
        for consumer in [&stats.video, &stats.audio] {
            let device = consumer.device.as_deref().unwrap_or("software");
            let fallback = if consumer.fell_back_to_software {
                " (fell back to software)"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "{:<6}    {} units on {}{}, {} degraded",
                consumer.kind.to_string() + ":",
                consumer.units_analyzed,
                device,
                fallback,
                consumer.degraded_units
            );
        }
        if stats.producer.read_errors > 0 {
            let _ = writeln!(out, "Read errors: {}", stats.producer.read_errors);
        }

        let _ = writeln!(
            out,
            "\nAudio marks: {} silence, {} degraded",
            Self::count(&self.audio_marks, MarkType::Silence),
            Self::count(&self.audio_marks, MarkType::Degraded)
        );
        for mark in &self.audio_marks {
            let _ = writeln!(out, "  {}", mark);
        }

        let _ = writeln!(
            out,
            "\nVideo marks: {} scene-change, {} black-frame, {} degraded",
            Self::count(&self.video_marks, MarkType::SceneChange),
            Self::count(&self.video_marks, MarkType::BlackFrame),
            Self::count(&self.video_marks, MarkType::Degraded)
        );
        for mark in &self.video_marks {
            let _ = writeln!(out, "  {}", mark);
        }

        out
    }
}
