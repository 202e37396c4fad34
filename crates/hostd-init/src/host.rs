//! Host environment probe
//!
//! Everything init needs to know about (or do to) the local machine goes
//! through [`HostProbe`], so the planners can be driven against a fake host
//! in tests.

use crate::error::InitError;
use async_trait::async_trait;
use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Backing file for loop-backed pools, relative to the var dir
pub const LOOP_FILE_NAME: &str = "zfs.img";

/// Smallest subordinate id range a usable id-map needs
pub const MIN_IDMAP_RANGE: u64 = 65536;

/// Identity map of a process outside any user namespace
const HOST_UID_MAP: &str = "0 0 4294967295";

const GIB: u64 = 1024 * 1024 * 1024;

#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Storage backends whose tools are present and working
    async fn available_backends(&self) -> Vec<String>;

    /// Free bytes on the filesystem holding the var dir
    fn free_bytes(&self) -> Result<u64, InitError>;

    fn is_block_device(&self, path: &Path) -> bool;

    /// Whether a subordinate id range big enough for unprivileged containers exists
    fn idmap_usable(&self) -> bool;

    fn running_in_userns(&self) -> bool;

    /// Path of the loop backing file
    fn loop_file(&self) -> PathBuf;

    /// Delete a leftover loop backing file, if any
    async fn remove_loop_file(&self) -> Result<(), InitError>;

    /// Create (or truncate) the sparse loop backing file
    async fn create_loop_file(&self, size_gb: u64) -> Result<PathBuf, InitError>;

    async fn create_zfs_pool(&self, pool: &str, device: &Path) -> Result<(), InitError>;
}

/// Facts gathered once before planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub backends: Vec<String>,
    pub free_bytes: u64,
    pub idmap_usable: bool,
    pub nested: bool,
}

impl HostFacts {
    pub async fn gather<H: HostProbe + ?Sized>(host: &H) -> Result<Self, InitError> {
        let facts = Self {
            backends: host.available_backends().await,
            free_bytes: host.free_bytes()?,
            idmap_usable: host.idmap_usable(),
            nested: host.running_in_userns(),
        };
        debug!("Host facts: {:?}", facts);
        Ok(facts)
    }

    pub fn has_backend(&self, backend: &str) -> bool {
        self.backends.iter().any(|b| b == backend)
    }
}

/// The machine this process runs on
#[derive(Debug, Clone)]
pub struct SystemHost {
    var_dir: PathBuf,
}

impl SystemHost {
    pub fn new(var_dir: impl Into<PathBuf>) -> Self {
        Self {
            var_dir: var_dir.into(),
        }
    }

    async fn zfs_usable(&self) -> bool {
        if !on_path("zfs") {
            debug!("zfs: binary not found on PATH");
            return false;
        }
        if self.running_in_userns() {
            debug!("zfs: unavailable inside a user namespace");
            return false;
        }

        match Command::new("modprobe").arg("zfs").output().await {
            Ok(out) if !out.status.success() => {
                warn!("modprobe zfs failed: {}", String::from_utf8_lossy(&out.stderr).trim());
            }
            Err(e) => warn!("modprobe zfs failed: {}", e),
            Ok(_) => {}
        }

        match Command::new("zpool").arg("list").output().await {
            Ok(out) => out.status.success(),
            Err(e) => {
                debug!("zfs: zpool list failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl HostProbe for SystemHost {
    async fn available_backends(&self) -> Vec<String> {
        let mut backends = vec!["dir".to_string()];
        if self.zfs_usable().await {
            backends.push("zfs".to_string());
        }
        backends
    }

    fn free_bytes(&self) -> Result<u64, InitError> {
        // The var dir may not exist before the first run
        let target = self
            .var_dir
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or(Path::new("/"));
        let stat = nix::sys::statvfs::statvfs(target).map_err(std::io::Error::from)?;
        #[allow(clippy::unnecessary_cast)]
        let free = stat.blocks_available() as u64 * stat.fragment_size() as u64;
        Ok(free)
    }

    fn is_block_device(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|m| m.file_type().is_block_device())
            .unwrap_or(false)
    }

    fn idmap_usable(&self) -> bool {
        ["/etc/subuid", "/etc/subgid"].iter().all(|path| match fs::read_to_string(path) {
            Ok(content) => has_usable_range(&content, "root"),
            Err(e) => {
                debug!("Cannot read {}: {}", path, e);
                false
            }
        })
    }

    fn running_in_userns(&self) -> bool {
        fs::read_to_string("/proc/self/uid_map")
            .map(|content| is_nested_uid_map(&content))
            .unwrap_or(false)
    }

    fn loop_file(&self) -> PathBuf {
        self.var_dir.join(LOOP_FILE_NAME)
    }

    async fn remove_loop_file(&self) -> Result<(), InitError> {
        match tokio::fs::remove_file(self.loop_file()).await {
            Ok(()) => {
                debug!("Removed stale {}", self.loop_file().display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_loop_file(&self, size_gb: u64) -> Result<PathBuf, InitError> {
        let size = size_gb.checked_mul(GIB).ok_or(InitError::InvalidLoopSize(size_gb))?;
        tokio::fs::create_dir_all(&self.var_dir).await?;
        let path = self.loop_file();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)
            .await?;
        file.set_len(size).await?;
        debug!("Created {}GB loop file {}", size_gb, path.display());
        Ok(path)
    }

    async fn create_zfs_pool(&self, pool: &str, device: &Path) -> Result<(), InitError> {
        let output = Command::new("zpool")
            .arg("create")
            .arg(pool)
            .arg(device)
            .args(["-f", "-m", "none", "-O", "compression=on"])
            .output()
            .await
            .map_err(|e| InitError::StorageCreateFailed { output: e.to_string() })?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(InitError::StorageCreateFailed {
                output: text.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn on_path(binary: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}

/// Subordinate id ranges (`user:start:count`) granted to `user`
pub fn id_ranges(content: &str, user: &str) -> Vec<(u64, u64)> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().split(':');
            if fields.next()? != user {
                return None;
            }
            let start = fields.next()?.parse().ok()?;
            let count = fields.next()?.parse().ok()?;
            Some((start, count))
        })
        .collect()
}

pub fn has_usable_range(content: &str, user: &str) -> bool {
    id_ranges(content, user)
        .iter()
        .any(|&(_, count)| count >= MIN_IDMAP_RANGE)
}

/// Anything but the full identity map means a user namespace
pub fn is_nested_uid_map(content: &str) -> bool {
    let normalized: Vec<&str> = content.split_whitespace().collect();
    normalized.join(" ") != HOST_UID_MAP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ranges_for_root() {
        let content = "alice:100000:65536\nroot:1000000:1000000000\nroot:bad:1\n";
        assert_eq!(id_ranges(content, "root"), vec![(1000000, 1000000000)]);
        assert!(has_usable_range(content, "root"));
    }

    #[test]
    fn test_small_range_is_unusable() {
        assert!(!has_usable_range("root:100000:1000\n", "root"));
        assert!(!has_usable_range("", "root"));
    }

    #[test]
    fn test_uid_map_detection() {
        assert!(!is_nested_uid_map("         0          0 4294967295\n"));
        assert!(is_nested_uid_map("         0     100000      65536\n"));
    }

    #[tokio::test]
    async fn test_loop_file_lifecycle() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let host = SystemHost::new(dir.path());

        host.remove_loop_file().await.unwrap();

        let path = host.create_loop_file(2).await.unwrap();
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.len(), 2 * GIB);
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);

        host.remove_loop_file().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_oversized_loop_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let host = SystemHost::new(dir.path());

        let err = host.create_loop_file(20_000_000_000).await.unwrap_err();
        assert!(matches!(err, InitError::InvalidLoopSize(20_000_000_000)));
        assert!(!host.loop_file().exists());
    }

    #[test]
    fn test_regular_file_is_not_block_device() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("disk");
        fs::write(&file, b"").unwrap();
        let host = SystemHost::new(dir.path());
        assert!(!host.is_block_device(&file));
        assert!(!host.is_block_device(&dir.path().join("missing")));
    }

    #[test]
    fn test_free_bytes_reads_var_dir() {
        let dir = tempfile::tempdir().unwrap();
        let host = SystemHost::new(dir.path());
        assert!(host.free_bytes().unwrap() > 0);
    }
}
