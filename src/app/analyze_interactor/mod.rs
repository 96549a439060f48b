// Analyze interactor - Resolves a recording and runs it through the pipeline

use std::sync::Arc;

use tracing::info;

use crate::config::PipelineConfig;
use crate::devices::ComputeDeviceRegistry;
use crate::error::{CommFlagError, CommFlagResult};
use crate::output::AnalysisReport;
use crate::pipeline::PipelineCoordinator;
use crate::ports::{JobLookup, SourceOpener};

/// What to analyze
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisTarget {
    /// A recording file, by path or by name within the storage directories
    File(String),
    /// A queued job, resolved through the job lookup
    Job(u64),
}

/// Interactor for the analyze use case
pub struct AnalyzeInteractor {
    config: Arc<PipelineConfig>,
    registry: Arc<ComputeDeviceRegistry>,
    opener: Arc<dyn SourceOpener>,
    jobs: Arc<dyn JobLookup>,
}

impl AnalyzeInteractor {
    /// Create new analyze interactor with injected ports
    pub fn new(
        config: Arc<PipelineConfig>,
        registry: Arc<ComputeDeviceRegistry>,
        opener: Arc<dyn SourceOpener>,
        jobs: Arc<dyn JobLookup>,
    ) -> Self {
        Self {
            config,
            registry,
            opener,
            jobs,
        }
    }

    /// Resolve the target to a source identifier
    pub async fn resolve(&self, target: Option<AnalysisTarget>) -> CommFlagResult<String> {
        match target {
            None => Err(CommFlagError::NoRecordingData {
                message: "no file or job given".to_string(),
            }),
            Some(AnalysisTarget::File(file)) => Ok(file),
            Some(AnalysisTarget::Job(job_id)) => {
                let file = self.jobs.lookup(job_id).await?;
                info!("Job {} resolves to {}", job_id, file);
                Ok(file)
            }
        }
    }

    /// Analyze one recording end to end
    pub async fn execute(&self, target: Option<AnalysisTarget>) -> CommFlagResult<AnalysisReport> {
        let job_id = match &target {
            Some(AnalysisTarget::Job(id)) => Some(*id),
            _ => None,
        };
        let identifier = self.resolve(target).await?;

        info!("Starting commercial flagging for {}", identifier);
        let mut coordinator =
            PipelineCoordinator::new(Arc::clone(&self.config), Arc::clone(&self.registry));
        coordinator.open(self.opener.as_ref(), &identifier)?;
        let output = coordinator.run().await?;

        Ok(AnalysisReport::from_output(output, job_id))
    }
}
