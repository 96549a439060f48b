// Application layer - Use case interactors

pub mod analyze_interactor;
pub mod container;
pub mod device_interactor;

// Re-export interactors
pub use analyze_interactor::{AnalysisTarget, AnalyzeInteractor};
pub use container::{AppContainer, DefaultAppContainer};
pub use device_interactor::{DeviceInteractor, DeviceListing};
