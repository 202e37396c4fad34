//! Storage planning and provisioning

use crate::error::InitError;
use crate::host::{HostFacts, HostProbe};
use crate::plan::{InitPlan, StorageMode, SUPPORTED_BACKENDS};
use std::path::PathBuf;
use tracing::info;

const GIB: u64 = 1024 * 1024 * 1024;

/// Bounds of the suggested loop file size, in GB
pub const MIN_SUGGESTED_LOOP_GB: u64 = 15;
pub const MAX_SUGGESTED_LOOP_GB: u64 = 100;

/// Largest loop size whose byte count fits a u64
pub const MAX_LOOP_SIZE_GB: u64 = u64::MAX / GIB;

/// Loop sizes are whole GiB, at least one, and must fit in bytes
pub fn validate_loop_size(size_gb: u64) -> Result<u64, InitError> {
    if size_gb == 0 || size_gb > MAX_LOOP_SIZE_GB {
        return Err(InitError::InvalidLoopSize(size_gb));
    }
    Ok(size_gb)
}

/// A device wins over a loop size; neither means an existing pool
pub fn storage_mode(device: Option<&str>, loop_size_gb: Option<u64>) -> StorageMode {
    match (device, loop_size_gb) {
        (Some(_), _) => StorageMode::Device,
        (None, Some(_)) => StorageMode::Loop,
        (None, None) => StorageMode::Existing,
    }
}

/// A fifth of the free space, clamped to [15, 100] GB
pub fn suggested_loop_size_gb(free_bytes: u64) -> u64 {
    (free_bytes / GIB / 5).clamp(MIN_SUGGESTED_LOOP_GB, MAX_SUGGESTED_LOOP_GB)
}

/// Reject backends hostd init can't configure or the host can't run
pub fn check_backend(backend: &str, facts: &HostFacts) -> Result<(), InitError> {
    if !SUPPORTED_BACKENDS.contains(&backend) {
        return Err(InitError::UnsupportedBackend(backend.to_string()));
    }
    if !facts.has_backend(backend) {
        return Err(InitError::BackendUnavailable(backend.to_string()));
    }
    Ok(())
}

pub fn validate_block_device<H: HostProbe + ?Sized>(host: &H, path: &str) -> Result<PathBuf, InitError> {
    let device = PathBuf::from(path);
    if !host.is_block_device(&device) {
        return Err(InitError::NotABlockDevice(path.to_string()));
    }
    Ok(device)
}

/// Create the pool the plan asks for
///
/// Only ZFS in loop or device mode creates anything; `dir` and existing
/// pools are left alone.
pub async fn provision<H: HostProbe + ?Sized>(plan: &InitPlan, host: &H) -> Result<(), InitError> {
    if !plan.creates_pool() {
        return Ok(());
    }

    let device = match plan.storage_mode {
        StorageMode::Loop => {
            let size = plan.storage_loop_size_gb.ok_or(InitError::InvalidLoopSize(0))?;
            host.create_loop_file(size).await?
        }
        StorageMode::Device => plan
            .storage_device
            .clone()
            .ok_or_else(|| InitError::StorageCreateFailed {
                output: "no block device in plan".to_string(),
            })?,
        StorageMode::Existing => return Ok(()),
    };

    host.create_zfs_pool(&plan.storage_pool, &device).await?;
    info!("Created ZFS pool {} on {}", plan.storage_pool, device.display());
    Ok(())
}
