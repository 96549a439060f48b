//! Static capability scoring used to rank devices

use crate::devices::{DeviceInfo, DeviceKind};

fn kind_weight(kind: DeviceKind) -> u64 {
    match kind {
        DeviceKind::Gpu => 4,
        DeviceKind::Accelerator => 2,
        DeviceKind::Cpu => 1,
    }
}

/// Capability score; higher is better
pub fn capability_score(info: &DeviceInfo) -> u64 {
    kind_weight(info.kind)
        .saturating_mul(u64::from(info.compute_units))
        .saturating_mul(u64::from(info.max_clock_mhz))
        .saturating_add(info.global_mem_mb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceId;

    fn info(kind: DeviceKind, compute_units: u32, clock: u32, mem: u64) -> DeviceInfo {
        DeviceInfo {
            id: DeviceId(0),
            name: "test".to_string(),
            vendor: "test".to_string(),
            kind,
            compute_units,
            max_clock_mhz: clock,
            global_mem_mb: mem,
        }
    }

    #[test]
    fn test_gpu_outranks_cpu_with_same_profile() {
        let gpu = info(DeviceKind::Gpu, 8, 1000, 1024);
        let cpu = info(DeviceKind::Cpu, 8, 1000, 1024);
        assert!(capability_score(&gpu) > capability_score(&cpu));
    }

    #[test]
    fn test_score_formula() {
        let accel = info(DeviceKind::Accelerator, 10, 500, 256);
        assert_eq!(capability_score(&accel), 2 * 10 * 500 + 256);
    }
}
