use std::sync::Arc;

use crate::adapters::{ConfiguredDeviceProvider, FileSourceOpener, JobCatalog, SyntheticProgram};
use crate::app::{analyze_interactor::AnalyzeInteractor, device_interactor::DeviceInteractor};
use crate::config::PipelineConfig;
use crate::devices::ComputeDeviceRegistry;
use crate::ports::{JobLookup, SourceOpener};

pub trait AppContainer: Send + Sync {
    fn analyze_interactor(&self) -> AnalyzeInteractor;
    fn synthetic_interactor(&self, program: SyntheticProgram) -> AnalyzeInteractor;
    fn device_interactor(&self) -> DeviceInteractor;
}

/// Wires the configured adapters into the interactors
pub struct DefaultAppContainer {
    config: Arc<PipelineConfig>,
    registry: Arc<ComputeDeviceRegistry>,
    files: Arc<FileSourceOpener>,
    jobs: Arc<JobCatalog>,
}

impl DefaultAppContainer {
    pub fn new(config: PipelineConfig) -> Self {
        let provider = ConfiguredDeviceProvider::new(config.devices.clone());
        let registry = Arc::new(ComputeDeviceRegistry::new(&provider));
        let files = Arc::new(FileSourceOpener::new(config.source.storage_dirs.clone()));
        let jobs = Arc::new(JobCatalog::from_entries(&config.jobs));

        Self {
            config: Arc::new(config),
            registry,
            files,
            jobs,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn interactor(&self, opener: Arc<dyn SourceOpener>) -> AnalyzeInteractor {
        AnalyzeInteractor::new(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            opener,
            Arc::clone(&self.jobs) as Arc<dyn JobLookup>,
        )
    }
}

impl AppContainer for DefaultAppContainer {
    fn analyze_interactor(&self) -> AnalyzeInteractor {
        self.interactor(Arc::clone(&self.files) as Arc<dyn SourceOpener>)
    }

    fn synthetic_interactor(&self, program: SyntheticProgram) -> AnalyzeInteractor {
        self.interactor(Arc::new(program))
    }

    fn device_interactor(&self) -> DeviceInteractor {
        DeviceInteractor::new(Arc::clone(&self.registry), self.config.single_device_policy)
    }
}
