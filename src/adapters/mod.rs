// Adapters - External system implementations

pub mod emulated_device;
pub mod file_source;
pub mod job_catalog;
pub mod synthetic_source;
pub mod toml_config;

// Re-export adapters
pub use emulated_device::{ConfiguredDeviceProvider, EmulatedBackend};
pub use file_source::FileSourceOpener;
pub use job_catalog::JobCatalog;
pub use synthetic_source::{SyntheticProgram, SyntheticSource};
pub use toml_config::TomlConfigAdapter;
