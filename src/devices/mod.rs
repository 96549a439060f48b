//! Compute device model, capability scoring and role assignment

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::analysis::{FrameFeatures, Kernel};
use crate::domain::errors::DispatchError;
use crate::domain::model::{MediaUnit, StreamKind};
use crate::ports::ComputeBackend;

pub mod registry;
pub mod scoring;

pub use registry::{ComputeDeviceRegistry, DeviceAssignment, SingleDevicePolicy};
pub use scoring::capability_score;

/// Stable device identity within one enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Gpu,
    Accelerator,
    Cpu,
}

/// Static capability profile of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub vendor: String,
    pub kind: DeviceKind,
    pub compute_units: u32,
    pub max_clock_mhz: u32,
    pub global_mem_mb: u64,
}

/// An acceleration device usable by the analysis consumers
pub struct ComputeDevice {
    info: DeviceInfo,
    backend: Arc<dyn ComputeBackend>,
    claimed: Mutex<Vec<StreamKind>>,
}

impl ComputeDevice {
    pub fn new(info: DeviceInfo, backend: Arc<dyn ComputeBackend>) -> Self {
        Self {
            info,
            backend,
            claimed: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.info.id
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Run a kernel on this device
    pub fn execute(&self, kernel: Kernel, unit: &MediaUnit) -> Result<FrameFeatures, DispatchError> {
        self.backend.execute(kernel, unit)
    }

    /// Roles this device was handed out to; empty when unclaimed
    pub fn claimed_roles(&self) -> Vec<StreamKind> {
        self.claimed
            .lock()
            .map(|roles| roles.clone())
            .unwrap_or_default()
    }

    pub(crate) fn claim(&self, role: StreamKind) {
        if let Ok(mut roles) = self.claimed.lock() {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
    }

    /// One-line diagnostic descriptor
    pub fn describe(&self) -> String {
        let info = &self.info;
        format!(
            "{} {} ({} {:?}, {} CU @ {} MHz, {} MB, score {})",
            info.id,
            info.name,
            info.vendor,
            info.kind,
            info.compute_units,
            info.max_clock_mhz,
            info.global_mem_mb,
            capability_score(info)
        )
    }
}

impl fmt::Debug for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeDevice")
            .field("info", &self.info)
            .field("claimed", &self.claimed_roles())
            .finish()
    }
}
