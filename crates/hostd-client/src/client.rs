//! hostd API client
//!
//! Implements the hostd REST API client for server/profile configuration and
//! cluster membership. Based on the API structure below `/1.0/`.

use crate::common::query::{names_from_urls, resource_path, with_query};
use crate::common::HttpClient;
use crate::error::HostError;
use crate::host_trait::HostClientTrait;
use crate::models::*;
use crate::operation::Operation;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const MEMBERS: &str = "/cluster/members";

/// hostd API client
///
/// No request timeout is configured: every call blocks until the host
/// answers. Bound waits on background work with [`Operation::wait_until`].
#[derive(Debug, Clone)]
pub struct HostClient {
    http: HttpClient,
}

impl HostClient {
    /// Create a new hostd client
    ///
    /// # Arguments
    /// * `base_url` - hostd base URL (e.g., "https://10.0.0.1:8443")
    pub fn new(base_url: String) -> Result<Self, HostError> {
        let client = Client::builder().build().map_err(HostError::Http)?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap a preconfigured reqwest client (custom TLS roots, proxies, ...)
    pub fn with_client(client: Client, base_url: String) -> Self {
        Self {
            http: HttpClient::new(client, base_url),
        }
    }

    fn cluster_post(&self, post: &ClusterPost) -> Result<serde_json::Value, HostError> {
        serde_json::to_value(post).map_err(HostError::Serialization)
    }
}

#[async_trait::async_trait]
impl HostClientTrait for HostClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn get_server(&self) -> Result<(Server, String), HostError> {
        self.http.get("").await
    }

    async fn update_server(&self, server: &ServerPut, etag: &str) -> Result<(), HostError> {
        let body = serde_json::to_value(server)?;
        self.http.put("", &body, etag).await
    }

    async fn get_profile(&self, name: &str) -> Result<(Profile, String), HostError> {
        self.http.get(&resource_path("/profiles", name)).await
    }

    async fn update_profile(&self, name: &str, profile: &ProfilePut, etag: &str) -> Result<(), HostError> {
        let body = serde_json::to_value(profile)?;
        self.http.put(&resource_path("/profiles", name), &body, etag).await
    }

    async fn get_container_names(&self) -> Result<Vec<String>, HostError> {
        let (urls, _): (Vec<String>, _) = self.http.get("/containers").await?;
        Ok(names_from_urls(&urls))
    }

    async fn get_image_fingerprints(&self) -> Result<Vec<String>, HostError> {
        let (urls, _): (Vec<String>, _) = self.http.get("/images").await?;
        Ok(names_from_urls(&urls))
    }

    async fn get_cluster(&self, password: &str) -> Result<Cluster, HostError> {
        let path = with_query("/cluster", &[("password", password)]);
        let (cluster, _) = self.http.get(&path).await?;
        Ok(cluster)
    }

    async fn bootstrap_cluster(&self, name: &str) -> Result<Operation, HostError> {
        debug!("Bootstrapping cluster as member {}", name);
        let body = self.cluster_post(&ClusterPost {
            server_name: name.to_string(),
            ..Default::default()
        })?;
        let op = self.http.post_operation(MEMBERS, &body).await?;
        Ok(Operation::new(op))
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
        debug!("Requesting acceptance of member {} at {}", name, address);
        let body = self.cluster_post(&ClusterPost {
            server_name: name.to_string(),
            address: address.to_string(),
            schema,
            api,
            target_password: target_password.to_string(),
            storage_pools: pools.to_vec(),
            networks: networks.to_vec(),
            ..Default::default()
        })?;
        self.http.post(MEMBERS, &body).await
    }

    async fn join_cluster(
        &self,
        target_address: &str,
        target_password: &str,
        target_cert: &str,
        name: &str,
    ) -> Result<Operation, HostError> {
        debug!("Joining cluster at {} as member {}", target_address, name);
        let body = self.cluster_post(&ClusterPost {
            server_name: name.to_string(),
            target_address: target_address.to_string(),
            target_password: target_password.to_string(),
            target_cert: target_cert.to_string(),
            ..Default::default()
        })?;
        let op = self.http.post_operation(MEMBERS, &body).await?;
        Ok(Operation::new(op))
    }

    async fn leave_cluster(&self, name: &str, force: bool) -> Result<(), HostError> {
        let path = with_query(
            &resource_path(MEMBERS, name),
            &[("force", if force { "1" } else { "" })],
        );
        self.http.delete(&path).await
    }

    async fn get_cluster_member_names(&self) -> Result<Vec<String>, HostError> {
        let (urls, _): (Vec<String>, _) = self.http.get(MEMBERS).await?;
        Ok(names_from_urls(&urls))
    }

    async fn get_cluster_members(&self) -> Result<Vec<ClusterMember>, HostError> {
        let path = with_query(MEMBERS, &[("recursion", "1")]);
        let (members, _) = self.http.get(&path).await?;
        Ok(members)
    }

    async fn get_cluster_member(&self, name: &str) -> Result<(ClusterMember, String), HostError> {
        self.http.get(&resource_path(MEMBERS, name)).await
    }

    async fn rename_cluster_member(&self, name: &str, member: &ClusterMemberPost) -> Result<(), HostError> {
        let body = serde_json::to_value(member)?;
        let _: serde_json::Value = self.http.post(&resource_path(MEMBERS, name), &body).await?;
        Ok(())
    }

    async fn get_operation(&self, id: &str) -> Result<OperationInfo, HostError> {
        let (op, _) = self.http.get(&resource_path("/operations", id)).await?;
        Ok(op)
    }

    async fn wait_operation(&self, id: &str, timeout: Duration) -> Result<OperationInfo, HostError> {
        let seconds = timeout.as_secs().max(1).to_string();
        let path = with_query(
            &format!("{}/wait", resource_path("/operations", id)),
            &[("timeout", seconds.as_str())],
        );
        let (op, _) = self.http.get(&path).await?;
        Ok(op)
    }

    async fn cancel_operation(&self, id: &str) -> Result<(), HostError> {
        self.http.delete(&resource_path("/operations", id)).await
    }
}
