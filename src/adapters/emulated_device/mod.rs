// Emulated device adapter - Configured compute devices backed by the host kernels

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::analysis::{run_kernel, FrameFeatures, Kernel};
use crate::config::DeviceSpec;
use crate::devices::{ComputeDevice, DeviceId, DeviceInfo};
use crate::domain::errors::{DeviceError, DispatchError};
use crate::domain::model::MediaUnit;
use crate::ports::{ComputeBackend, DeviceProvider};

/// Backend that runs kernels on the host behind a device-style dispatch queue
///
/// Dispatches are serialized, so a device shared by two roles behaves like a
/// single command queue.
pub struct EmulatedBackend {
    name: String,
    latency: Duration,
    fail_after: Option<u64>,
    dispatches: AtomicU64,
    queue: Mutex<()>,
}

impl EmulatedBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
            fail_after: None,
            dispatches: AtomicU64::new(0),
            queue: Mutex::new(()),
        }
    }

    /// Sleep this long inside every dispatch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every dispatch once `count` have gone through
    pub fn failing_after(mut self, count: u64) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }
}

impl ComputeBackend for EmulatedBackend {
    fn execute(&self, kernel: Kernel, unit: &MediaUnit) -> Result<FrameFeatures, DispatchError> {
        let _queue = self.queue.lock().map_err(|_| DeviceError::DispatchFailure {
            device: self.name.clone(),
            reason: "command queue poisoned".to_string(),
        })?;

        let issued = self.dispatches.fetch_add(1, Ordering::Relaxed);
        if let Some(limit) = self.fail_after {
            if issued >= limit {
                return Err(DeviceError::DispatchFailure {
                    device: self.name.clone(),
                    reason: format!("device lost after {} dispatches", limit),
                }
                .into());
            }
        }

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        Ok(run_kernel(kernel, unit)?)
    }
}

/// Devices declared in configuration
pub struct ConfiguredDeviceProvider {
    specs: Vec<DeviceSpec>,
}

impl ConfiguredDeviceProvider {
    pub fn new(specs: Vec<DeviceSpec>) -> Self {
        Self { specs }
    }
}

impl DeviceProvider for ConfiguredDeviceProvider {
    fn enumerate(&self) -> Vec<ComputeDevice> {
        self.specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let mut backend = EmulatedBackend::new(spec.name.clone())
                    .with_latency(Duration::from_millis(spec.latency_ms));
                if let Some(count) = spec.fail_after {
                    backend = backend.failing_after(count);
                }
                debug!("Enumerated device {} ({:?})", spec.name, spec.kind);

                ComputeDevice::new(
                    DeviceInfo {
                        id: DeviceId(index as u32),
                        name: spec.name.clone(),
                        vendor: spec.vendor.clone(),
                        kind: spec.kind,
                        compute_units: spec.compute_units,
                        max_clock_mhz: spec.max_clock_mhz,
                        global_mem_mb: spec.global_mem_mb,
                    },
                    Arc::new(backend),
                )
            })
            .collect()
    }
}
