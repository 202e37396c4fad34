//! End-to-end init flows against the mock host client
//!
//! A fake `HostProbe` stands in for the local machine and records every
//! side effect, so no test here touches the real filesystem or zpool.

use async_trait::async_trait;
use hostd_client::{ClusterMember, HostClientTrait, HostError, MemberStatus, MockHostClient};
use hostd_init::apply::{set_profile_config_item, DEFAULT_PROFILE, KEY_PRIVILEGED};
use hostd_init::commands::run_init;
use hostd_init::config::parse_preseed;
use hostd_init::{
    ErrorCategory, HostProbe, InitError, InitMode, InitRequest, PrivilegeDefault, ScriptedPrompter, StorageMode,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Clone)]
struct FakeHost {
    backends: Vec<String>,
    free_bytes: u64,
    idmap_usable: bool,
    nested: bool,
    block_devices: Vec<PathBuf>,
    pool_failure: Option<String>,
    actions: Arc<Mutex<Vec<String>>>,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            backends: vec!["dir".to_string()],
            free_bytes: 100 * GIB,
            idmap_usable: true,
            nested: false,
            block_devices: Vec::new(),
            pool_failure: None,
            actions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_zfs() -> Self {
        let mut host = Self::new();
        host.backends.push("zfs".to_string());
        host
    }

    fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostProbe for FakeHost {
    async fn available_backends(&self) -> Vec<String> {
        self.backends.clone()
    }

    fn free_bytes(&self) -> Result<u64, InitError> {
        Ok(self.free_bytes)
    }

    fn is_block_device(&self, path: &Path) -> bool {
        self.block_devices.iter().any(|d| d == path)
    }

    fn idmap_usable(&self) -> bool {
        self.idmap_usable
    }

    fn running_in_userns(&self) -> bool {
        self.nested
    }

    fn loop_file(&self) -> PathBuf {
        PathBuf::from("/fake/zfs.img")
    }

    async fn remove_loop_file(&self) -> Result<(), InitError> {
        self.actions.lock().unwrap().push("remove_loop_file".to_string());
        Ok(())
    }

    async fn create_loop_file(&self, size_gb: u64) -> Result<PathBuf, InitError> {
        self.actions
            .lock()
            .unwrap()
            .push(format!("create_loop_file {}", size_gb));
        Ok(self.loop_file())
    }

    async fn create_zfs_pool(&self, pool: &str, device: &Path) -> Result<(), InitError> {
        self.actions
            .lock()
            .unwrap()
            .push(format!("create_zfs_pool {} {}", pool, device.display()));
        match &self.pool_failure {
            Some(output) => Err(InitError::StorageCreateFailed { output: output.clone() }),
            None => Ok(()),
        }
    }
}

fn auto() -> InitRequest {
    InitRequest {
        auto: true,
        ..Default::default()
    }
}

fn no_answers() -> ScriptedPrompter {
    ScriptedPrompter::new(Vec::<String>::new())
}

fn config_value(client: &MockHostClient, key: &str) -> Option<String> {
    client
        .server_config()
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[tokio::test]
async fn test_auto_dir_without_network_only_resets() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    client.set_server_config("core.https_address", "[::]:9999");
    client.set_server_config("core.trust_password", "old");
    let host = FakeHost::new();

    let plan = run_init(&client, &host, auto(), &mut no_answers()).await.unwrap();

    assert_eq!(plan.mode, InitMode::Auto);
    assert_eq!(plan.storage_backend, "dir");
    assert_eq!(plan.storage_mode, StorageMode::Existing);
    assert_eq!(plan.default_privileged, PrivilegeDefault::Unset);
    assert!(plan.network.is_none());

    assert!(client.server_config().is_empty());
    assert_eq!(
        client.requests(),
        vec!["GET /1.0/containers", "GET /1.0/images", "GET /1.0", "PUT /1.0"]
    );
    assert_eq!(host.actions(), vec!["remove_loop_file"]);
    assert!(client.profile(DEFAULT_PROFILE).unwrap().config.is_empty());
}

#[tokio::test]
async fn test_auto_without_idmap_defaults_to_privileged() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let mut host = FakeHost::new();
    host.idmap_usable = false;
    host.nested = true;

    let plan = run_init(&client, &host, auto(), &mut no_answers()).await.unwrap();

    assert_eq!(plan.default_privileged, PrivilegeDefault::True);
    let profile = client.profile(DEFAULT_PROFILE).unwrap();
    assert_eq!(profile.config.get(KEY_PRIVILEGED).map(String::as_str), Some("true"));
}

#[tokio::test]
async fn test_auto_zfs_loop_creates_pool() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let host = FakeHost::with_zfs();
    let request = InitRequest {
        storage_backend: Some("zfs".into()),
        storage_create_loop: Some(20),
        ..auto()
    };

    let plan = run_init(&client, &host, request, &mut no_answers()).await.unwrap();

    assert_eq!(plan.storage_mode, StorageMode::Loop);
    assert_eq!(plan.storage_pool, "hostd");
    assert_eq!(
        host.actions(),
        vec![
            "remove_loop_file",
            "create_loop_file 20",
            "create_zfs_pool hostd /fake/zfs.img"
        ]
    );
    assert_eq!(config_value(&client, "storage.zfs_pool_name").as_deref(), Some("hostd"));
}

#[tokio::test]
async fn test_auto_zfs_device() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let mut host = FakeHost::with_zfs();
    host.block_devices.push(PathBuf::from("/dev/sdb"));
    let request = InitRequest {
        storage_backend: Some("zfs".into()),
        storage_create_device: Some("/dev/sdb".into()),
        storage_pool: Some("tank".into()),
        ..auto()
    };

    run_init(&client, &host, request, &mut no_answers()).await.unwrap();

    assert_eq!(host.actions(), vec!["remove_loop_file", "create_zfs_pool tank /dev/sdb"]);
    assert_eq!(config_value(&client, "storage.zfs_pool_name").as_deref(), Some("tank"));
}

#[tokio::test]
async fn test_auto_device_must_be_block_device() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let host = FakeHost::with_zfs();
    let request = InitRequest {
        storage_backend: Some("zfs".into()),
        storage_create_device: Some("/dev/nope".into()),
        ..auto()
    };

    let err = run_init(&client, &host, request, &mut no_answers()).await.unwrap_err();
    assert!(matches!(err, InitError::NotABlockDevice(ref d) if d == "/dev/nope"));
    assert_eq!(err.category(), ErrorCategory::InvalidInput);
    assert!(host.actions().is_empty());
}

#[tokio::test]
async fn test_auto_network_exposure() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let host = FakeHost::new();
    let request = InitRequest {
        network_address: Some("2001:db8::1".into()),
        network_port: Some(9443),
        trust_password: Some("pw".into()),
        ..auto()
    };

    run_init(&client, &host, request, &mut no_answers()).await.unwrap();

    assert_eq!(
        config_value(&client, "core.https_address").as_deref(),
        Some("[2001:db8::1]:9443")
    );
    assert_eq!(config_value(&client, "core.trust_password").as_deref(), Some("pw"));
}

#[tokio::test]
async fn test_auto_network_without_password() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let request = InitRequest {
        network_address: Some("203.0.113.5".into()),
        ..auto()
    };

    run_init(&client, &FakeHost::new(), request, &mut no_answers())
        .await
        .unwrap();

    assert_eq!(
        config_value(&client, "core.https_address").as_deref(),
        Some("203.0.113.5:8443")
    );
    assert_eq!(config_value(&client, "core.trust_password"), None);
}

#[tokio::test]
async fn test_flag_errors_before_any_request() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let host = FakeHost::with_zfs();

    let not_auto = InitRequest {
        storage_backend: Some("zfs".into()),
        ..Default::default()
    };
    let err = run_init(&client, &host, not_auto, &mut no_answers()).await.unwrap_err();
    assert!(matches!(err, InitError::ConflictingArguments(_)));

    let dir_with_pool = InitRequest {
        storage_pool: Some("tank".into()),
        ..auto()
    };
    let err = run_init(&client, &host, dir_with_pool, &mut no_answers()).await.unwrap_err();
    assert!(matches!(err, InitError::IncompatibleBackendOptions(_)));

    let both_modes = InitRequest {
        storage_backend: Some("zfs".into()),
        storage_create_device: Some("/dev/sdb".into()),
        storage_create_loop: Some(10),
        ..auto()
    };
    let err = run_init(&client, &host, both_modes, &mut no_answers()).await.unwrap_err();
    assert!(matches!(err, InitError::ConflictingStorageMode));
    assert_eq!(err.category(), ErrorCategory::ArgumentValidation);

    assert!(client.requests().is_empty());
    assert!(host.actions().is_empty());
}

#[tokio::test]
async fn test_host_must_be_empty() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    client.add_image("sha256:abc");

    let err = run_init(&client, &FakeHost::new(), auto(), &mut no_answers())
        .await
        .unwrap_err();
    assert!(matches!(err, InitError::HostNotEmpty));
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert!(!client.requests().contains(&"PUT /1.0".to_string()));
}

#[tokio::test]
async fn test_host_with_container_is_not_empty() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    client.add_container("c1");

    let err = run_init(&client, &FakeHost::new(), auto(), &mut no_answers())
        .await
        .unwrap_err();
    assert!(matches!(err, InitError::HostNotEmpty));
    assert_eq!(client.requests(), vec!["GET /1.0/containers", "GET /1.0/images"]);
}

#[tokio::test]
async fn test_oversized_loop_flag_fails_before_any_request() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let host = FakeHost::with_zfs();
    let request = InitRequest {
        storage_backend: Some("zfs".into()),
        storage_create_loop: Some(20_000_000_000),
        ..auto()
    };

    let err = run_init(&client, &host, request, &mut no_answers()).await.unwrap_err();
    assert!(matches!(err, InitError::InvalidLoopSize(20_000_000_000)));
    assert_eq!(err.category(), ErrorCategory::ArgumentValidation);
    assert!(client.requests().is_empty());
    assert!(host.actions().is_empty());
}

#[tokio::test]
async fn test_unavailable_backend() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let request = InitRequest {
        storage_backend: Some("zfs".into()),
        storage_pool: Some("tank".into()),
        ..auto()
    };

    let err = run_init(&client, &FakeHost::new(), request, &mut no_answers())
        .await
        .unwrap_err();
    assert!(matches!(err, InitError::BackendUnavailable(ref b) if b == "zfs"));
    assert_eq!(err.category(), ErrorCategory::Backend);
}

#[tokio::test]
async fn test_pool_failure_leaves_partial_state() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    client.set_server_config("core.https_address", "[::]:8443");
    let mut host = FakeHost::with_zfs();
    host.pool_failure = Some("cannot create 'hostd': pool already exists".to_string());
    let request = InitRequest {
        storage_backend: Some("zfs".into()),
        storage_create_loop: Some(15),
        ..auto()
    };

    let err = run_init(&client, &host, request, &mut no_answers()).await.unwrap_err();
    match err {
        InitError::StorageCreateFailed { output } => assert!(output.contains("pool already exists")),
        other => panic!("unexpected error {:?}", other),
    }
    // The reset already went through and is not undone
    assert_eq!(config_value(&client, "core.https_address"), None);
    assert_eq!(config_value(&client, "storage.zfs_pool_name"), None);
}

#[tokio::test]
async fn test_concurrent_write_is_conflict() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    client.fail_next("update_server", HostError::Conflict("ETag doesn't match".to_string()));

    let err = run_init(&client, &FakeHost::new(), auto(), &mut no_answers())
        .await
        .unwrap_err();
    assert!(matches!(err, InitError::RemoteConflict(_)));
    assert_eq!(err.category(), ErrorCategory::RemoteConflict);
}

#[tokio::test]
async fn test_privilege_write_error_propagates() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    client.fail_next("update_profile", HostError::Api("profile is locked".to_string()));
    let mut host = FakeHost::new();
    host.idmap_usable = false;

    let err = run_init(&client, &host, auto(), &mut no_answers()).await.unwrap_err();
    assert!(matches!(err, InitError::RemoteRequest(ref m) if m == "profile is locked"));
}

#[tokio::test]
async fn test_interactive_zfs_loop_with_network() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let mut host = FakeHost::with_zfs();
    host.free_bytes = 250 * GIB;
    let mut prompter = ScriptedPrompter::new([
        "",       // backend: zfs is the default when available
        "yes",    // create a new pool
        "",       // pool name: hostd
        "no",     // no block device
        "",       // loop size: suggested
        "yes",    // expose on the network
        "bogus",  // not an address, asked again
        "all",
        "",       // port: 8443
        "secret", // trust password
    ]);

    let plan = run_init(&client, &host, InitRequest::default(), &mut prompter)
        .await
        .unwrap();

    assert_eq!(plan.mode, InitMode::Interactive);
    assert_eq!(plan.storage_backend, "zfs");
    assert_eq!(plan.storage_mode, StorageMode::Loop);
    assert_eq!(plan.storage_loop_size_gb, Some(50));
    assert_eq!(prompter.rejected(), ["bogus"]);
    assert_eq!(prompter.remaining(), 0);

    assert_eq!(
        host.actions(),
        vec![
            "remove_loop_file",
            "create_loop_file 50",
            "create_zfs_pool hostd /fake/zfs.img"
        ]
    );
    assert_eq!(config_value(&client, "core.https_address").as_deref(), Some("[::]:8443"));
    assert_eq!(config_value(&client, "core.trust_password").as_deref(), Some("secret"));
}

#[tokio::test]
async fn test_interactive_oversized_loop_is_asked_again() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let host = FakeHost::with_zfs();
    let mut prompter = ScriptedPrompter::new([
        "zfs",
        "yes",
        "",
        "no",
        "20000000000", // bytes would overflow a u64
        "30",
        "no",
    ]);

    let plan = run_init(&client, &host, InitRequest::default(), &mut prompter)
        .await
        .unwrap();

    assert_eq!(plan.storage_loop_size_gb, Some(30));
    assert_eq!(prompter.rejected(), ["20000000000"]);
    assert_eq!(prompter.remaining(), 0);
    assert!(host.actions().contains(&"create_loop_file 30".to_string()));
}

#[tokio::test]
async fn test_interactive_existing_pool() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let host = FakeHost::with_zfs();
    let mut prompter = ScriptedPrompter::new(["zfs", "no", "tank/hostd", "no"]);

    let plan = run_init(&client, &host, InitRequest::default(), &mut prompter)
        .await
        .unwrap();

    assert_eq!(plan.storage_mode, StorageMode::Existing);
    assert_eq!(plan.storage_pool, "tank/hostd");
    assert_eq!(host.actions(), vec!["remove_loop_file"]);
    assert_eq!(
        config_value(&client, "storage.zfs_pool_name").as_deref(),
        Some("tank/hostd")
    );
}

#[tokio::test]
async fn test_interactive_nested_declines_sharing() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    set_profile_config_item(&client, DEFAULT_PROFILE, KEY_PRIVILEGED, "true")
        .await
        .unwrap();
    let mut host = FakeHost::new();
    host.idmap_usable = false;
    host.nested = true;
    let mut prompter = ScriptedPrompter::new(["dir", "no", "no"]);

    let plan = run_init(&client, &host, InitRequest::default(), &mut prompter)
        .await
        .unwrap();

    assert_eq!(plan.default_privileged, PrivilegeDefault::False);
    assert_eq!(prompter.asked().len(), 3);
    let profile = client.profile(DEFAULT_PROFILE).unwrap();
    assert!(!profile.config.contains_key(KEY_PRIVILEGED));
}

#[tokio::test]
async fn test_interactive_unavailable_backend() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let mut prompter = ScriptedPrompter::new(["zfs"]);

    let err = run_init(&client, &FakeHost::new(), InitRequest::default(), &mut prompter)
        .await
        .unwrap_err();
    assert!(matches!(err, InitError::BackendUnavailable(_)));
}

#[tokio::test]
async fn test_preseed_runs_as_auto() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    let request = parse_preseed("network_address: 203.0.113.5\nnetwork_port: 9443\n").unwrap();

    let plan = run_init(&client, &FakeHost::new(), request, &mut no_answers())
        .await
        .unwrap();

    assert_eq!(plan.mode, InitMode::Auto);
    assert_eq!(
        config_value(&client, "core.https_address").as_deref(),
        Some("203.0.113.5:9443")
    );
}

#[tokio::test]
async fn test_leave_force_removes_member() {
    let client = MockHostClient::new("https://10.0.0.1:8443");
    for name in ["node1", "node2"] {
        client.add_member(ClusterMember {
            server_name: name.to_string(),
            status: MemberStatus::Online,
            ..Default::default()
        });
    }
    client.set_member_status("node2", MemberStatus::Offline);

    assert!(client.leave_cluster("node2", false).await.is_err());
    client.leave_cluster("node2", true).await.unwrap();

    assert!(client
        .requests()
        .contains(&"DELETE /1.0/cluster/members/node2?force=1".to_string()));
    assert_eq!(client.get_cluster_member_names().await.unwrap(), vec!["node1"]);
}
