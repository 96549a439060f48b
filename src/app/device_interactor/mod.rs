// Device interactor - Lists ranked compute devices and the role assignment

use std::sync::Arc;

use serde::Serialize;

use crate::devices::{capability_score, ComputeDeviceRegistry, DeviceInfo, SingleDevicePolicy};
use crate::domain::model::StreamKind;

/// One ranked device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceEntry {
    pub rank: usize,
    pub score: u64,
    #[serde(flatten)]
    pub info: DeviceInfo,
    /// Roles this device would serve in a run
    pub roles: Vec<StreamKind>,
}

/// Ranked devices plus the policy used for the assignment
#[derive(Debug, Clone, Serialize)]
pub struct DeviceListing {
    pub policy: SingleDevicePolicy,
    pub devices: Vec<DeviceEntry>,
    pub video: Option<String>,
    pub audio: Option<String>,
}

impl DeviceListing {
    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();
        if self.devices.is_empty() {
            lines.push("No compute devices; audio and video run in software".to_string());
        }
        for entry in &self.devices {
            let roles: Vec<&str> = entry.roles.iter().map(|r| r.as_str()).collect();
            lines.push(format!(
                "{}. {} {} ({}, {:?}) score {}{}",
                entry.rank,
                entry.info.id,
                entry.info.name,
                entry.info.vendor,
                entry.info.kind,
                entry.score,
                if roles.is_empty() {
                    String::new()
                } else {
                    format!(" -> {}", roles.join(", "))
                }
            ));
        }
        lines.push(format!(
            "video: {}",
            self.video.as_deref().unwrap_or("software")
        ));
        lines.push(format!(
            "audio: {}",
            self.audio.as_deref().unwrap_or("software")
        ));
        lines.push(format!("single device policy: {}", self.policy));
        lines.join("\n")
    }
}

/// Interactor for the devices use case
pub struct DeviceInteractor {
    registry: Arc<ComputeDeviceRegistry>,
    policy: SingleDevicePolicy,
}

impl DeviceInteractor {
    pub fn new(registry: Arc<ComputeDeviceRegistry>, policy: SingleDevicePolicy) -> Self {
        Self { registry, policy }
    }

    pub fn execute(&self) -> DeviceListing {
        let assignment = self.registry.assign_roles(self.policy);
        let devices = self
            .registry
            .enumerate()
            .iter()
            .enumerate()
            .map(|(index, device)| DeviceEntry {
                rank: index + 1,
                score: capability_score(device.info()),
                info: device.info().clone(),
                roles: device.claimed_roles(),
            })
            .collect();

        DeviceListing {
            policy: self.policy,
            devices,
            video: assignment.video.map(|d| d.info().name.clone()),
            audio: assignment.audio.map(|d| d.info().name.clone()),
        }
    }
}
