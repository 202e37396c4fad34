//! HostClient trait for mocking
//!
//! This trait abstracts the HostClient to enable mocking in unit tests.
//! The concrete HostClient implements this trait, and tests can use mock implementations.

use crate::error::HostError;
use crate::models::*;
use crate::operation::Operation;
use std::time::Duration;

/// Trait for hostd API client operations
///
/// Every call is a single request/response against the host; nothing is
/// cached between calls. All async methods must be `Send` to work with
/// Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HostClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    // Server Operations
    async fn get_server(&self) -> Result<(Server, String), HostError>;
    async fn update_server(&self, server: &ServerPut, etag: &str) -> Result<(), HostError>;

    // Profile Operations
    async fn get_profile(&self, name: &str) -> Result<(Profile, String), HostError>;
    async fn update_profile(&self, name: &str, profile: &ProfilePut, etag: &str) -> Result<(), HostError>;

    // Inventory (emptiness checks only)
    async fn get_container_names(&self) -> Result<Vec<String>, HostError>;
    async fn get_image_fingerprints(&self) -> Result<Vec<String>, HostError>;

    // Cluster Operations

    /// Read the cluster descriptor; `password` is sent when non-empty, for untrusted clients
    async fn get_cluster(&self, password: &str) -> Result<Cluster, HostError>;

    /// Form a new cluster with this host as its first member
    async fn bootstrap_cluster(&self, name: &str) -> Result<Operation, HostError>;

    /// Ask an existing member to accept a new one
    ///
    /// Fails with the host's message when the schema or API versions disagree.
    #[allow(clippy::too_many_arguments)]
    async fn accept_member(
        &self,
        target_password: &str,
        name: &str,
        address: &str,
        schema: u64,
        api: u64,
        pools: &[StoragePool],
        networks: &[Network],
    ) -> Result<ClusterNodeAccepted, HostError>;

    /// Join the cluster that `target_address` belongs to
    async fn join_cluster(
        &self,
        target_address: &str,
        target_password: &str,
        target_cert: &str,
        name: &str,
    ) -> Result<Operation, HostError>;

    /// Remove a member; `force` drops it even when it is unreachable
    async fn leave_cluster(&self, name: &str, force: bool) -> Result<(), HostError>;

    async fn get_cluster_member_names(&self) -> Result<Vec<String>, HostError>;
    async fn get_cluster_members(&self) -> Result<Vec<ClusterMember>, HostError>;
    async fn get_cluster_member(&self, name: &str) -> Result<(ClusterMember, String), HostError>;
    async fn rename_cluster_member(&self, name: &str, member: &ClusterMemberPost) -> Result<(), HostError>;

    // Background Operations
    async fn get_operation(&self, id: &str) -> Result<OperationInfo, HostError>;

    /// Long-poll the operation for at most `timeout`
    async fn wait_operation(&self, id: &str, timeout: Duration) -> Result<OperationInfo, HostError>;

    async fn cancel_operation(&self, id: &str) -> Result<(), HostError>;
}
