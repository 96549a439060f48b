//! Command implementations

use tracing::info;

use crate::adapters::SyntheticProgram;
use crate::app::{AnalysisTarget, AppContainer};
use crate::cli::args::{AnalyzeArgs, DevicesArgs, ReportArgs, SynthArgs};
use crate::domain::errors::DomainError;
use crate::error::{CommFlagError, CommFlagResult};
use crate::output::{AnalysisReport, ReportFormat, ReportWriter};

/// Execute the analyze command
pub async fn analyze(container: &dyn AppContainer, args: AnalyzeArgs) -> CommFlagResult<()> {
    let target = match (args.file, args.job_id) {
        (Some(file), _) => Some(AnalysisTarget::File(file)),
        (None, Some(job)) => Some(AnalysisTarget::Job(job)),
        (None, None) => None,
    };

    let report = container.analyze_interactor().execute(target).await?;
    write_report(&report, &args.report)
}

/// Execute the synth command
pub async fn synth(container: &dyn AppContainer, args: SynthArgs) -> CommFlagResult<()> {
    let program = synthetic_program(&args)?;
    info!(
        "Generating {:.0}s recording with {} silence gaps and {} scene cuts",
        program.duration_secs,
        program.silence_gaps.len(),
        program.scene_cuts.len()
    );

    let identifier = program.identifier();
    let report = container
        .synthetic_interactor(program)
        .execute(Some(AnalysisTarget::File(identifier)))
        .await?;
    write_report(&report, &args.report)
}

/// Execute the devices command
pub fn devices(container: &dyn AppContainer, args: DevicesArgs) -> CommFlagResult<()> {
    let listing = container.device_interactor().execute();
    let content = if args.json {
        serde_json::to_string_pretty(&listing).map_err(|e| CommFlagError::OutputError {
            message: e.to_string(),
        })?
    } else {
        listing.render_text()
    };
    ReportWriter::new(None).write(&content)
}

fn write_report(report: &AnalysisReport, args: &ReportArgs) -> CommFlagResult<()> {
    let format = if args.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };
    let content = report
        .render(format)
        .map_err(|e| CommFlagError::OutputError {
            message: e.to_string(),
        })?;
    ReportWriter::new(args.output.clone()).write(&content)
}

/// Build the generated recording described by the synth arguments
pub fn synthetic_program(args: &SynthArgs) -> CommFlagResult<SyntheticProgram> {
    if !(args.duration.is_finite() && args.duration > 0.0) {
        return Err(DomainError::BadArgs(format!("Invalid duration: {}", args.duration)).into());
    }

    let within = |t: &f64| *t < args.duration;
    let silence_gaps = (0..args.silence_gaps)
        .map(|i| 8.0 + f64::from(i) * 11.0)
        .filter(within)
        .collect();
    let scene_cuts = (0..args.scene_cuts)
        .map(|i| 12.0 + f64::from(i) * 22.0)
        .filter(within)
        .collect();
    let black_segments = args
        .black_segments
        .iter()
        .map(|segment| parse_segment(segment))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SyntheticProgram {
        duration_secs: args.duration,
        silence_gaps,
        scene_cuts,
        black_segments,
        ..SyntheticProgram::default()
    })
}

fn parse_segment(segment: &str) -> Result<(f64, f64), DomainError> {
    let invalid = || DomainError::BadArgs(format!("Invalid black segment '{}', expected START:END", segment));
    let (start, end) = segment.split_once(':').ok_or_else(invalid)?;
    let start: f64 = start.trim().parse().map_err(|_| invalid())?;
    let end: f64 = end.trim().parse().map_err(|_| invalid())?;
    if !(start >= 0.0 && end > start) {
        return Err(invalid());
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::PipelineArgs;

    fn synth_args(duration: f64, black: Vec<&str>) -> SynthArgs {
        SynthArgs {
            duration,
            silence_gaps: 10,
            scene_cuts: 5,
            black_segments: black.into_iter().map(String::from).collect(),
            pipeline: PipelineArgs::default(),
            report: ReportArgs::default(),
        }
    }

    #[test]
    fn test_default_program_layout() {
        let program = synthetic_program(&synth_args(120.0, vec![])).unwrap();
        assert_eq!(program.silence_gaps.len(), 10);
        assert_eq!(program.scene_cuts, vec![12.0, 34.0, 56.0, 78.0, 100.0]);
    }

    #[test]
    fn test_short_program_drops_late_events() {
        let program = synthetic_program(&synth_args(30.0, vec!["25:26.5"])).unwrap();
        assert_eq!(program.silence_gaps, vec![8.0, 19.0]);
        assert_eq!(program.scene_cuts, vec![12.0]);
        assert_eq!(program.black_segments, vec![(25.0, 26.5)]);
    }

    #[test]
    fn test_bad_segments() {
        assert!(parse_segment("5").is_err());
        assert!(parse_segment("6:5").is_err());
        assert!(parse_segment("a:b").is_err());
    }
}
