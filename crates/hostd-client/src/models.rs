//! hostd API models
//!
//! These models match the JSON bodies served under `/1.0/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Sync,
    Async,
    Error,
}

/// Envelope wrapping every API reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_code: u16,
    /// URL of the background operation (async replies only)
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub error_code: u16,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Server model (`GET /1.0`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub api_extensions: Vec<String>,
    #[serde(default)]
    pub api_status: String,
    #[serde(default)]
    pub api_version: String,
    /// "trusted" or "untrusted"
    #[serde(default)]
    pub auth: String,
    #[serde(default)]
    pub environment: serde_json::Value,
}

impl Server {
    /// The subset of fields accepted by `PUT /1.0`
    pub fn writable(&self) -> ServerPut {
        ServerPut {
            config: self.config.clone(),
        }
    }

    /// Read a config key as a string, treating missing keys as empty
    pub fn config_str(&self, key: &str) -> &str {
        self.config
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

/// Request body for updating the server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerPut {
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// Profile model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: HashMap<String, String>,
    #[serde(default)]
    pub devices: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub used_by: Vec<String>,
}

impl Profile {
    /// The subset of fields accepted by `PUT /1.0/profiles/<name>`
    pub fn writable(&self) -> ProfilePut {
        ProfilePut {
            description: self.description.clone(),
            config: self.config.clone(),
            devices: self.devices.clone(),
        }
    }
}

/// Request body for updating a profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePut {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: HashMap<String, String>,
    #[serde(default)]
    pub devices: HashMap<String, HashMap<String, String>>,
}

/// Storage pool definition as replicated to joining members
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoragePool {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// Network definition as replicated to joining members
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    #[serde(rename = "type", default)]
    pub network_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// Cluster descriptor (`GET /1.0/cluster`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Membership request body for `POST /1.0/cluster/members`
///
/// The same payload serves bootstrap (name only), accept (name, address,
/// versions, pools and networks) and join (target coordinates).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterPost {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub schema: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub api: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_cert: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_password: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_pools: Vec<StoragePool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<Network>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// What an accepting member hands back to a joining one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterNodeAccepted {
    #[serde(default, with = "base64_bytes")]
    pub private_key: Vec<u8>,
    #[serde(default)]
    pub storage_pools: Vec<StoragePool>,
    #[serde(default)]
    pub networks: Vec<Network>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Membership state reported for a cluster member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Pending,
    Online,
    Offline,
    Evacuated,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Cluster member model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub server_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub database: bool,
    /// Database schema version the member runs
    #[serde(default)]
    pub schema: u64,
    /// Number of API extensions the member supports
    #[serde(default)]
    pub api: u64,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default)]
    pub message: String,
}

/// Request body for renaming a member
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterMemberPost {
    pub server_name: String,
}

/// Lifecycle of a background operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl OperationStatus {
    /// Map the host's numeric status code onto the lifecycle
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => OperationStatus::Success,
            400 => OperationStatus::Failure,
            401 => OperationStatus::Cancelled,
            101 | 103 | 104 => OperationStatus::Running,
            _ => OperationStatus::Pending,
        }
    }

    /// Numeric code the host uses for this state
    pub fn code(self) -> u16 {
        match self {
            OperationStatus::Pending => 105,
            OperationStatus::Running => 103,
            OperationStatus::Success => 200,
            OperationStatus::Failure => 400,
            OperationStatus::Cancelled => 401,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Success | OperationStatus::Failure | OperationStatus::Cancelled
        )
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationStatus::Pending => "Pending",
            OperationStatus::Running => "Running",
            OperationStatus::Success => "Success",
            OperationStatus::Failure => "Failure",
            OperationStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// Background operation as served by `/1.0/operations/<id>`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationInfo {
    pub id: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub resources: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub may_cancel: bool,
    #[serde(default)]
    pub err: String,
}

impl OperationInfo {
    pub fn state(&self) -> OperationStatus {
        OperationStatus::from_code(self.status_code)
    }
}
