//! Helper functions for creating operations and members in the mock

use crate::models::*;
use std::collections::HashMap;

/// Helper functions for building resources in mock implementations
pub struct Helpers {
    base_url: String,
}

impl Helpers {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    /// Helper to create a freshly started operation
    pub fn create_operation(&self, description: &str, member: &str) -> OperationInfo {
        let now = chrono::Utc::now();
        let mut resources = HashMap::new();
        resources.insert(
            "cluster".to_string(),
            vec![format!("/1.0/cluster/members/{}", member)],
        );
        OperationInfo {
            id: uuid::Uuid::new_v4().to_string(),
            class: "task".to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
            status: OperationStatus::Running.to_string(),
            status_code: OperationStatus::Running.code(),
            resources,
            metadata: serde_json::Value::Null,
            may_cancel: true,
            err: String::new(),
        }
    }

    /// Helper to create an online member of this mock host
    pub fn create_member(&self, name: &str, schema: u64, api: u64) -> ClusterMember {
        ClusterMember {
            server_name: name.to_string(),
            url: self.base_url.clone(),
            database: true,
            schema,
            api,
            status: MemberStatus::Online,
            message: "fully operational".to_string(),
        }
    }

    /// Helper to move an operation to a new state
    pub fn transition(&self, op: &mut OperationInfo, status: OperationStatus, err: &str) {
        op.status = status.to_string();
        op.status_code = status.code();
        op.err = err.to_string();
        op.updated_at = chrono::Utc::now();
    }
}
