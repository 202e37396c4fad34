//! Mock HostClient for unit testing
//!
//! This module provides a mock implementation of HostClientTrait that can be used
//! in unit tests without requiring a running host.
//!
//! The mock is organized into domain-specific modules:
//! - `server.rs` - server configuration, profiles, container/image inventory
//! - `cluster.rs` - cluster descriptor, members and background operations
//! - `helpers.rs` - Helper functions for building operations and members
//!
//! Resources carry ETags that change on every write, so stale updates are
//! rejected with [`HostError::Conflict`] exactly like a real host.

mod cluster;
mod helpers;
mod server;

use crate::error::HostError;
use crate::host_trait::HostClientTrait;
use crate::models::*;
use crate::operation::Operation;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A resource together with its current ETag
#[derive(Debug, Clone)]
pub(crate) struct Versioned<T> {
    pub(crate) value: T,
    pub(crate) etag: String,
}

/// Membership change applied when an operation completes successfully
#[derive(Debug, Clone)]
pub(crate) enum MemberEffect {
    /// Enable clustering and register the local member
    Form(ClusterMember),
}

#[derive(Debug, Clone)]
pub(crate) struct MockOperation {
    pub(crate) info: OperationInfo,
    pub(crate) effect: Option<MemberEffect>,
}

/// Mock HostClient for testing
///
/// This mock stores resources in memory and can be configured to return
/// specific responses for testing different scenarios.
#[derive(Debug, Clone)]
pub struct MockHostClient {
    pub(crate) base_url: String,
    // In-memory storage for resources
    pub(crate) server: Arc<Mutex<Versioned<Server>>>,
    pub(crate) profiles: Arc<Mutex<HashMap<String, Versioned<Profile>>>>,
    pub(crate) containers: Arc<Mutex<Vec<String>>>,
    pub(crate) images: Arc<Mutex<Vec<String>>>,
    pub(crate) cluster: Arc<Mutex<Cluster>>,
    pub(crate) members: Arc<Mutex<BTreeMap<String, Versioned<ClusterMember>>>>,
    pub(crate) operations: Arc<Mutex<HashMap<String, MockOperation>>>,
    /// Schema and API extension versions this host runs
    pub(crate) versions: Arc<Mutex<(u64, u64)>>,
    pub(crate) auto_complete: Arc<Mutex<bool>>,
    // One-shot failures keyed by trait method name
    pub(crate) failures: Arc<Mutex<HashMap<String, HostError>>>,
    // "METHOD /path" of every call, in order
    pub(crate) requests: Arc<Mutex<Vec<String>>>,
    // Counter for generating ETags
    pub(crate) next_etag: Arc<Mutex<u64>>,
}

impl MockHostClient {
    /// Create a new mock client with an empty, unclustered host
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "default".to_string(),
            Versioned {
                value: Profile {
                    name: "default".to_string(),
                    description: "Default profile".to_string(),
                    ..Default::default()
                },
                etag: "1".to_string(),
            },
        );

        Self {
            base_url: base_url.into(),
            server: Arc::new(Mutex::new(Versioned {
                value: Server {
                    api_version: "1.0".to_string(),
                    api_status: "stable".to_string(),
                    auth: "trusted".to_string(),
                    ..Default::default()
                },
                etag: "1".to_string(),
            })),
            profiles: Arc::new(Mutex::new(profiles)),
            containers: Arc::new(Mutex::new(Vec::new())),
            images: Arc::new(Mutex::new(Vec::new())),
            cluster: Arc::new(Mutex::new(Cluster::default())),
            members: Arc::new(Mutex::new(BTreeMap::new())),
            operations: Arc::new(Mutex::new(HashMap::new())),
            versions: Arc::new(Mutex::new((1, 1))),
            auto_complete: Arc::new(Mutex::new(true)),
            failures: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            next_etag: Arc::new(Mutex::new(2)),
        }
    }

    /// Add a container to the inventory (for test setup)
    pub fn add_container(&self, name: &str) {
        self.containers.lock().unwrap().push(name.to_string());
    }

    /// Add an image to the inventory (for test setup)
    pub fn add_image(&self, fingerprint: &str) {
        self.images.lock().unwrap().push(fingerprint.to_string());
    }

    /// Add an active member to the cluster (for test setup)
    pub fn add_member(&self, member: ClusterMember) {
        self.cluster.lock().unwrap().enabled = true;
        let etag = self.next_etag();
        self.members
            .lock()
            .unwrap()
            .insert(member.server_name.clone(), Versioned { value: member, etag });
    }

    /// Change a member's reported status (for test setup)
    pub fn set_member_status(&self, name: &str, status: MemberStatus) {
        if let Some(member) = self.members.lock().unwrap().get_mut(name) {
            member.value.status = status;
        }
    }

    /// Set the schema and API extension versions accepted from joiners
    pub fn set_versions(&self, schema: u64, api: u64) {
        *self.versions.lock().unwrap() = (schema, api);
    }

    /// Whether new operations finish immediately (default) or stay running
    /// until [`MockHostClient::complete_operation`] is called
    pub fn set_auto_complete(&self, auto_complete: bool) {
        *self.auto_complete.lock().unwrap() = auto_complete;
    }

    /// Write a server config key out-of-band, as another client would
    pub fn set_server_config(&self, key: &str, value: &str) {
        let etag = self.next_etag();
        let mut server = self.server.lock().unwrap();
        server
            .value
            .config
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        server.etag = etag;
    }

    /// Make the next call to `method` fail with `error`
    pub fn fail_next(&self, method: &str, error: HostError) {
        self.failures.lock().unwrap().insert(method.to_string(), error);
    }

    /// Every request issued so far, as "METHOD /path"
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Snapshot of the server configuration
    pub fn server_config(&self) -> serde_json::Map<String, serde_json::Value> {
        self.server.lock().unwrap().value.config.clone()
    }

    /// Snapshot of a profile
    pub fn profile(&self, name: &str) -> Option<Profile> {
        self.profiles
            .lock()
            .unwrap()
            .get(name)
            .map(|p| p.value.clone())
    }

    /// Finish a running operation with the given outcome
    pub fn complete_operation(&self, id: &str, outcome: Result<(), String>) -> Result<(), HostError> {
        cluster::complete_operation(self, id, outcome)
    }

    /// Generate next ETag
    pub(crate) fn next_etag(&self) -> String {
        let mut etag = self.next_etag.lock().unwrap();
        let current = *etag;
        *etag += 1;
        current.to_string()
    }

    /// Record a request and fire any injected failure for `method`
    pub(crate) fn record(&self, method: &str, request: String) -> Result<(), HostError> {
        self.requests.lock().unwrap().push(request);
        match self.failures.lock().unwrap().remove(method) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Get helpers instance
    pub(crate) fn helpers(&self) -> helpers::Helpers {
        helpers::Helpers::new(self.base_url.clone())
    }
}

#[async_trait::async_trait]
impl HostClientTrait for MockHostClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    // Server Operations - delegated to server module
    async fn get_server(&self) -> Result<(Server, String), HostError> {
        server::get_server(self).await
    }

    async fn update_server(&self, server: &ServerPut, etag: &str) -> Result<(), HostError> {
        server::update_server(self, server, etag).await
    }

    async fn get_profile(&self, name: &str) -> Result<(Profile, String), HostError> {
        server::get_profile(self, name).await
    }

    async fn update_profile(&self, name: &str, profile: &ProfilePut, etag: &str) -> Result<(), HostError> {
        server::update_profile(self, name, profile, etag).await
    }

    async fn get_container_names(&self) -> Result<Vec<String>, HostError> {
        server::get_container_names(self).await
    }

    async fn get_image_fingerprints(&self) -> Result<Vec<String>, HostError> {
        server::get_image_fingerprints(self).await
    }

    // Cluster Operations - delegated to cluster module
    async fn get_cluster(&self, password: &str) -> Result<Cluster, HostError> {
        cluster::get_cluster(self, password).await
    }

    async fn bootstrap_cluster(&self, name: &str) -> Result<Operation, HostError> {
        cluster::bootstrap_cluster(self, name).await
    }

    async fn accept_member(
        &self,
        target_password: &str,
        name: &str,
        address: &str,
        schema: u64,
        api: u64,
        pools: &[StoragePool],
        networks: &[Network],
    ) -> Result<ClusterNodeAccepted, HostError> {
        cluster::accept_member(self, target_password, name, address, schema, api, pools, networks).await
    }

    async fn join_cluster(
        &self,
        target_address: &str,
        target_password: &str,
        target_cert: &str,
        name: &str,
    ) -> Result<Operation, HostError> {
        cluster::join_cluster(self, target_address, target_password, target_cert, name).await
    }

    async fn leave_cluster(&self, name: &str, force: bool) -> Result<(), HostError> {
        cluster::leave_cluster(self, name, force).await
    }

    async fn get_cluster_member_names(&self) -> Result<Vec<String>, HostError> {
        cluster::get_cluster_member_names(self).await
    }

    async fn get_cluster_members(&self) -> Result<Vec<ClusterMember>, HostError> {
        cluster::get_cluster_members(self).await
    }

    async fn get_cluster_member(&self, name: &str) -> Result<(ClusterMember, String), HostError> {
        cluster::get_cluster_member(self, name).await
    }

    async fn rename_cluster_member(&self, name: &str, member: &ClusterMemberPost) -> Result<(), HostError> {
        cluster::rename_cluster_member(self, name, member).await
    }

    // Background Operations
    async fn get_operation(&self, id: &str) -> Result<OperationInfo, HostError> {
        cluster::get_operation(self, id).await
    }

    async fn wait_operation(&self, id: &str, timeout: Duration) -> Result<OperationInfo, HostError> {
        cluster::wait_operation(self, id, timeout).await
    }

    async fn cancel_operation(&self, id: &str) -> Result<(), HostError> {
        cluster::cancel_operation(self, id).await
    }
}
