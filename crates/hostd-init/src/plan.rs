//! Initialization request and plan types
//!
//! An [`InitRequest`] is what the operator typed (or preseeded); an
//! [`InitPlan`] is the validated decision set that gets applied.

use crate::network::NetworkExposure;
use serde::Deserialize;
use std::path::PathBuf;

/// Storage backends hostd init knows how to configure
pub const SUPPORTED_BACKENDS: &[&str] = &["dir", "zfs"];

/// Backend used when none is requested
pub const DEFAULT_BACKEND: &str = "dir";

/// Pool name used when creating a new ZFS pool without an explicit name
pub const DEFAULT_POOL_NAME: &str = "hostd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    Auto,
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Use a pool or dataset that already exists (or plain directories for `dir`)
    Existing,
    /// Create a pool on a sparse backing file
    Loop,
    /// Create a pool on a block device
    Device,
}

/// Default container privilege written to the `default` profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeDefault {
    /// Leave the profile untouched
    Unset,
    False,
    True,
}

impl PrivilegeDefault {
    /// Value for `security.privileged`, or `None` when nothing is written
    pub fn profile_value(self) -> Option<&'static str> {
        match self {
            PrivilegeDefault::Unset => None,
            PrivilegeDefault::False => Some(""),
            PrivilegeDefault::True => Some("true"),
        }
    }
}

/// Raw init options, from flags or a preseed file
///
/// Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitRequest {
    pub auto: bool,
    pub storage_backend: Option<String>,
    pub storage_create_device: Option<String>,
    pub storage_create_loop: Option<u64>,
    pub storage_pool: Option<String>,
    pub network_address: Option<String>,
    pub network_port: Option<i64>,
    pub trust_password: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl InitRequest {
    pub fn storage_backend(&self) -> Option<&str> {
        non_empty(&self.storage_backend)
    }

    pub fn storage_create_device(&self) -> Option<&str> {
        non_empty(&self.storage_create_device)
    }

    pub fn storage_pool(&self) -> Option<&str> {
        non_empty(&self.storage_pool)
    }

    pub fn network_address(&self) -> Option<&str> {
        non_empty(&self.network_address)
    }

    pub fn trust_password(&self) -> Option<&str> {
        non_empty(&self.trust_password)
    }

    /// Whether any storage, network or trust option is set
    pub fn has_init_options(&self) -> bool {
        self.storage_backend().is_some()
            || self.storage_create_device().is_some()
            || self.storage_create_loop.is_some()
            || self.storage_pool().is_some()
            || self.network_address().is_some()
            || self.network_port.is_some()
            || self.trust_password().is_some()
    }
}

/// Validated decisions for one `hostd init` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitPlan {
    pub mode: InitMode,
    pub storage_backend: String,
    pub storage_mode: StorageMode,
    pub storage_device: Option<PathBuf>,
    pub storage_loop_size_gb: Option<u64>,
    pub storage_pool: String,
    pub default_privileged: PrivilegeDefault,
    /// `None` keeps the host off the network
    pub network: Option<NetworkExposure>,
}

impl InitPlan {
    /// Whether applying the plan creates a new pool
    pub fn creates_pool(&self) -> bool {
        self.storage_backend != "dir"
            && matches!(self.storage_mode, StorageMode::Loop | StorageMode::Device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_count_as_unset() {
        let request = InitRequest {
            storage_backend: Some(String::new()),
            trust_password: Some(String::new()),
            ..Default::default()
        };
        assert!(!request.has_init_options());
    }

    #[test]
    fn test_preseed_fields_deserialize() {
        let request: InitRequest = serde_yaml::from_str(
            "storage_backend: zfs\nstorage_create_loop: 20\nnetwork_address: all\n",
        )
        .unwrap();
        assert_eq!(request.storage_backend(), Some("zfs"));
        assert_eq!(request.storage_create_loop, Some(20));
        assert_eq!(request.network_address(), Some("all"));
        assert!(!request.auto);
    }

    #[test]
    fn test_preseed_rejects_unknown_keys() {
        let result: Result<InitRequest, _> = serde_yaml::from_str("storage_driver: zfs\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_privilege_profile_values() {
        assert_eq!(PrivilegeDefault::Unset.profile_value(), None);
        assert_eq!(PrivilegeDefault::False.profile_value(), Some(""));
        assert_eq!(PrivilegeDefault::True.profile_value(), Some("true"));
    }
}
