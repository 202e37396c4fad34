//! Cluster membership and operation handling for MockHostClient
//!
//! Members requested through bootstrap/join only become visible once their
//! operation succeeds.

use super::{MemberEffect, MockHostClient, MockOperation, Versioned};
use crate::error::HostError;
use crate::models::*;
use crate::operation::Operation;
use std::time::Duration;

const WAIT_SLICE: Duration = Duration::from_millis(10);

pub async fn get_cluster(client: &MockHostClient, password: &str) -> Result<Cluster, HostError> {
    let request = if password.is_empty() {
        "GET /1.0/cluster".to_string()
    } else {
        "GET /1.0/cluster?password=<redacted>".to_string()
    };
    client.record("get_cluster", request)?;

    if !password.is_empty() && password != trust_password(client) {
        return Err(HostError::Api("not authorized".to_string()));
    }
    Ok(client.cluster.lock().unwrap().clone())
}

pub async fn bootstrap_cluster(client: &MockHostClient, name: &str) -> Result<Operation, HostError> {
    client.record("bootstrap_cluster", "POST /1.0/cluster/members".to_string())?;
    if client.cluster.lock().unwrap().enabled {
        return Err(HostError::Api("This server is already clustered".to_string()));
    }
    let (schema, api) = *client.versions.lock().unwrap();
    let member = client.helpers().create_member(name, schema, api);
    start_operation(client, "Creating bootstrap node", name, MemberEffect::Form(member))
}

#[allow(clippy::too_many_arguments)]
pub async fn accept_member(
    client: &MockHostClient,
    target_password: &str,
    name: &str,
    address: &str,
    schema: u64,
    api: u64,
    pools: &[StoragePool],
    networks: &[Network],
) -> Result<ClusterNodeAccepted, HostError> {
    client.record("accept_member", "POST /1.0/cluster/members".to_string())?;

    if target_password != trust_password(client) {
        return Err(HostError::Api("not authorized".to_string()));
    }
    if address.is_empty() {
        return Err(HostError::InvalidRequest("No address provided".to_string()));
    }
    let (our_schema, our_api) = *client.versions.lock().unwrap();
    if schema != our_schema || api != our_api {
        return Err(HostError::Api(format!(
            "The joining server version doesn't match (expected schema {} api {}, got schema {} api {})",
            our_schema, our_api, schema, api
        )));
    }
    if client.members.lock().unwrap().contains_key(name) {
        return Err(HostError::Api(format!(
            "The cluster already has a member with name: {}",
            name
        )));
    }

    Ok(ClusterNodeAccepted {
        private_key: b"mock-cluster-private-key".to_vec(),
        storage_pools: pools.to_vec(),
        networks: networks.to_vec(),
    })
}

pub async fn join_cluster(
    client: &MockHostClient,
    target_address: &str,
    _target_password: &str,
    _target_cert: &str,
    name: &str,
) -> Result<Operation, HostError> {
    client.record("join_cluster", "POST /1.0/cluster/members".to_string())?;
    if target_address.is_empty() {
        return Err(HostError::InvalidRequest("No target cluster address provided".to_string()));
    }
    if client.cluster.lock().unwrap().enabled {
        return Err(HostError::Api("This server is already clustered".to_string()));
    }
    let (schema, api) = *client.versions.lock().unwrap();
    let member = client.helpers().create_member(name, schema, api);
    start_operation(client, "Joining cluster", name, MemberEffect::Form(member))
}

pub async fn leave_cluster(client: &MockHostClient, name: &str, force: bool) -> Result<(), HostError> {
    let request = if force {
        format!("DELETE /1.0/cluster/members/{}?force=1", name)
    } else {
        format!("DELETE /1.0/cluster/members/{}", name)
    };
    client.record("leave_cluster", request)?;

    let mut members = client.members.lock().unwrap();
    let member = members
        .get(name)
        .ok_or_else(|| HostError::NotFound(format!("Cluster member {} not found", name)))?;
    if member.value.status == MemberStatus::Offline && !force {
        return Err(HostError::Api(format!(
            "Member {} is unreachable, use force to remove it",
            name
        )));
    }
    members.remove(name);
    if members.is_empty() {
        *client.cluster.lock().unwrap() = Cluster::default();
    }
    Ok(())
}

pub async fn get_cluster_member_names(client: &MockHostClient) -> Result<Vec<String>, HostError> {
    client.record("get_cluster_member_names", "GET /1.0/cluster/members".to_string())?;
    Ok(client.members.lock().unwrap().keys().cloned().collect())
}

pub async fn get_cluster_members(client: &MockHostClient) -> Result<Vec<ClusterMember>, HostError> {
    client.record("get_cluster_members", "GET /1.0/cluster/members?recursion=1".to_string())?;
    Ok(client
        .members
        .lock()
        .unwrap()
        .values()
        .map(|m| m.value.clone())
        .collect())
}

pub async fn get_cluster_member(client: &MockHostClient, name: &str) -> Result<(ClusterMember, String), HostError> {
    client.record("get_cluster_member", format!("GET /1.0/cluster/members/{}", name))?;
    client
        .members
        .lock()
        .unwrap()
        .get(name)
        .map(|m| (m.value.clone(), m.etag.clone()))
        .ok_or_else(|| HostError::NotFound(format!("Cluster member {} not found", name)))
}

pub async fn rename_cluster_member(
    client: &MockHostClient,
    name: &str,
    post: &ClusterMemberPost,
) -> Result<(), HostError> {
    client.record("rename_cluster_member", format!("POST /1.0/cluster/members/{}", name))?;
    let etag = client.next_etag();
    let mut members = client.members.lock().unwrap();
    if members.contains_key(&post.server_name) {
        return Err(HostError::Api(format!(
            "The cluster already has a member with name: {}",
            post.server_name
        )));
    }
    let mut member = members
        .remove(name)
        .ok_or_else(|| HostError::NotFound(format!("Cluster member {} not found", name)))?;
    member.value.server_name = post.server_name.clone();
    member.etag = etag;
    members.insert(post.server_name.clone(), member);

    let mut cluster = client.cluster.lock().unwrap();
    if cluster.server_name == name {
        cluster.server_name = post.server_name.clone();
    }
    Ok(())
}

pub async fn get_operation(client: &MockHostClient, id: &str) -> Result<OperationInfo, HostError> {
    client.record("get_operation", format!("GET /1.0/operations/{}", id))?;
    lookup(client, id)
}

pub async fn wait_operation(
    client: &MockHostClient,
    id: &str,
    timeout: Duration,
) -> Result<OperationInfo, HostError> {
    client.record("wait_operation", format!("GET /1.0/operations/{}/wait", id))?;
    let info = lookup(client, id)?;
    if !info.state().is_terminal() {
        // Stand-in for the server-side long poll
        tokio::time::sleep(timeout.min(WAIT_SLICE)).await;
        return lookup(client, id);
    }
    Ok(info)
}

pub async fn cancel_operation(client: &MockHostClient, id: &str) -> Result<(), HostError> {
    client.record("cancel_operation", format!("DELETE /1.0/operations/{}", id))?;
    let mut operations = client.operations.lock().unwrap();
    let op = operations
        .get_mut(id)
        .ok_or_else(|| HostError::NotFound(format!("Operation {} not found", id)))?;
    if op.info.state().is_terminal() || !op.info.may_cancel {
        return Err(HostError::Api(format!("Operation {} can't be cancelled", id)));
    }
    client
        .helpers()
        .transition(&mut op.info, OperationStatus::Cancelled, "");
    op.effect = None;
    Ok(())
}

pub(crate) fn complete_operation(
    client: &MockHostClient,
    id: &str,
    outcome: Result<(), String>,
) -> Result<(), HostError> {
    let effect = {
        let mut operations = client.operations.lock().unwrap();
        let op = operations
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(format!("Operation {} not found", id)))?;
        if op.info.state().is_terminal() {
            return Err(HostError::Api(format!("Operation {} already finished", id)));
        }
        match &outcome {
            Ok(()) => client
                .helpers()
                .transition(&mut op.info, OperationStatus::Success, ""),
            Err(message) => client
                .helpers()
                .transition(&mut op.info, OperationStatus::Failure, message),
        }
        op.effect.take()
    };

    if let (Ok(()), Some(MemberEffect::Form(member))) = (outcome, effect) {
        {
            let mut cluster = client.cluster.lock().unwrap();
            cluster.enabled = true;
            cluster.server_name = member.server_name.clone();
        }
        let etag = client.next_etag();
        client
            .members
            .lock()
            .unwrap()
            .insert(member.server_name.clone(), Versioned { value: member, etag });
    }
    Ok(())
}

fn start_operation(
    client: &MockHostClient,
    description: &str,
    member: &str,
    effect: MemberEffect,
) -> Result<Operation, HostError> {
    let info = client.helpers().create_operation(description, member);
    let id = info.id.clone();
    client.operations.lock().unwrap().insert(
        id.clone(),
        MockOperation {
            info: info.clone(),
            effect: Some(effect),
        },
    );

    if *client.auto_complete.lock().unwrap() {
        complete_operation(client, &id, Ok(()))?;
        return Ok(Operation::new(lookup(client, &id)?));
    }
    Ok(Operation::new(info))
}

fn lookup(client: &MockHostClient, id: &str) -> Result<OperationInfo, HostError> {
    client
        .operations
        .lock()
        .unwrap()
        .get(id)
        .map(|op| op.info.clone())
        .ok_or_else(|| HostError::NotFound(format!("Operation {} not found", id)))
}

fn trust_password(client: &MockHostClient) -> String {
    client
        .server
        .lock()
        .unwrap()
        .value
        .config_str("core.trust_password")
        .to_string()
}
