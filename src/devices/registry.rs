//! Device registry: ranked enumeration and per-role assignment

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::devices::{capability_score, ComputeDevice, DeviceId};
use crate::domain::errors::DomainError;
use crate::domain::model::StreamKind;
use crate::ports::DeviceProvider;

/// What audio does when the registry holds exactly one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SingleDevicePolicy {
    /// Video keeps the device, audio runs on the software path
    #[default]
    SoftwareForAudio,
    /// Both roles dispatch to the device; the backend serializes the work
    Share,
}

impl FromStr for SingleDevicePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "software-for-audio" | "software" => Ok(SingleDevicePolicy::SoftwareForAudio),
            "share" | "shared" => Ok(SingleDevicePolicy::Share),
            other => Err(DomainError::BadArgs(format!(
                "Invalid single device policy: {}. Valid policies: software-for-audio, share",
                other
            ))),
        }
    }
}

impl fmt::Display for SingleDevicePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleDevicePolicy::SoftwareForAudio => f.write_str("software-for-audio"),
            SingleDevicePolicy::Share => f.write_str("share"),
        }
    }
}

/// Devices handed to the two analysis roles for one run
#[derive(Debug, Clone, Default)]
pub struct DeviceAssignment {
    pub video: Option<Arc<ComputeDevice>>,
    pub audio: Option<Arc<ComputeDevice>>,
}

impl DeviceAssignment {
    pub fn for_kind(&self, kind: StreamKind) -> Option<Arc<ComputeDevice>> {
        match kind {
            StreamKind::Video => self.video.clone(),
            StreamKind::Audio => self.audio.clone(),
        }
    }

    /// Whether both roles were given the same device
    pub fn is_shared(&self) -> bool {
        match (&self.video, &self.audio) {
            (Some(video), Some(audio)) => video.id() == audio.id(),
            _ => false,
        }
    }
}

/// Ranked set of devices enumerated once at startup
#[derive(Debug, Default)]
pub struct ComputeDeviceRegistry {
    devices: Vec<Arc<ComputeDevice>>,
}

impl ComputeDeviceRegistry {
    /// Enumerate the provider and rank its devices
    pub fn new(provider: &dyn DeviceProvider) -> Self {
        Self::from_devices(provider.enumerate())
    }

    /// Registry with no devices; every role uses the software path
    pub fn software_only() -> Self {
        Self::default()
    }

    pub fn from_devices(devices: Vec<ComputeDevice>) -> Self {
        let mut devices: Vec<Arc<ComputeDevice>> = devices.into_iter().map(Arc::new).collect();
        // Highest score first, ties broken by id so the order never depends on enumeration order
        devices.sort_by_key(|device| (Reverse(capability_score(device.info())), device.id()));

        for (rank, device) in devices.iter().enumerate() {
            debug!("Device rank {}: {}", rank + 1, device.describe());
        }

        Self { devices }
    }

    /// All devices, best first
    pub fn enumerate(&self) -> &[Arc<ComputeDevice>] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Highest-ranked device whose id is not in `excluding`
    pub fn select_best(&self, excluding: &HashSet<DeviceId>) -> Option<Arc<ComputeDevice>> {
        self.devices
            .iter()
            .find(|device| !excluding.contains(&device.id()))
            .cloned()
    }

    pub fn describe(device: &ComputeDevice) -> String {
        device.describe()
    }

    /// Pick the best device for video, then the best remaining one for audio
    pub fn assign_roles(&self, policy: SingleDevicePolicy) -> DeviceAssignment {
        let video = self.select_best(&HashSet::new());

        let mut excluding = HashSet::new();
        if let Some(device) = &video {
            excluding.insert(device.id());
        }

        let audio = match self.select_best(&excluding) {
            Some(device) => Some(device),
            None if self.devices.len() == 1 => match policy {
                SingleDevicePolicy::Share => video.clone(),
                SingleDevicePolicy::SoftwareForAudio => None,
            },
            None => None,
        };

        let assignment = DeviceAssignment { video, audio };
        for kind in [StreamKind::Video, StreamKind::Audio] {
            match assignment.for_kind(kind) {
                Some(device) => {
                    device.claim(kind);
                    info!("Compute device for {} processing: {}", kind, device.describe());
                }
                None => info!("{} processing via software", kind),
            }
        }
        if assignment.is_shared() {
            info!("Single device shared by audio and video (policy {})", policy);
        }

        assignment
    }
}
