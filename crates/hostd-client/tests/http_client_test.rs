//! Wire-level tests for HostClient
//!
//! Each test starts an in-process fake host on a loopback port and checks
//! the requests the client sends and how it decodes the replies.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use hostd_client::{ClusterMemberPost, HostClient, HostClientTrait, HostError, OperationStatus};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct FakeHost {
    config: Arc<Mutex<serde_json::Map<String, Value>>>,
    etag: Arc<Mutex<u64>>,
    members: Arc<Mutex<Vec<String>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl FakeHost {
    fn with_members(names: &[&str]) -> Self {
        let host = FakeHost::default();
        *host.members.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
        host
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

fn sync(metadata: Value) -> Json<Value> {
    Json(json!({
        "type": "sync",
        "status": "Success",
        "status_code": 200,
        "metadata": metadata,
    }))
}

fn error(code: StatusCode, message: &str) -> Response {
    (
        code,
        Json(json!({
            "type": "error",
            "error": message,
            "error_code": code.as_u16(),
        })),
    )
        .into_response()
}

fn operation(status: OperationStatus) -> Value {
    json!({
        "id": "op-1",
        "class": "task",
        "status": status.to_string(),
        "status_code": status.code(),
        "may_cancel": false,
        "err": "",
    })
}

async fn get_server(State(host): State<FakeHost>) -> Response {
    let etag = host.etag.lock().unwrap().to_string();
    let config = host.config.lock().unwrap().clone();
    (
        [(header::ETAG, etag)],
        sync(json!({"config": config, "api_version": "1.0", "auth": "trusted"})),
    )
        .into_response()
}

async fn put_server(State(host): State<FakeHost>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let current = host.etag.lock().unwrap().to_string();
    let sent = headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if sent != current {
        return error(StatusCode::PRECONDITION_FAILED, "ETag doesn't match");
    }

    let mut config = host.config.lock().unwrap();
    config.clear();
    if let Some(map) = body["config"].as_object() {
        for (k, v) in map {
            if v.as_str() != Some("") {
                config.insert(k.clone(), v.clone());
            }
        }
    }
    *host.etag.lock().unwrap() += 1;
    sync(Value::Null).into_response()
}

async fn get_cluster(State(host): State<FakeHost>, Query(params): Query<HashMap<String, String>>) -> Response {
    host.seen
        .lock()
        .unwrap()
        .push(format!("password={}", params.get("password").cloned().unwrap_or_default()));
    sync(json!({"server_name": "node1", "enabled": true})).into_response()
}

async fn list_members(State(host): State<FakeHost>, Query(params): Query<HashMap<String, String>>) -> Response {
    let members = host.members.lock().unwrap().clone();
    if params.get("recursion").map(String::as_str) == Some("1") {
        let full: Vec<Value> = members
            .iter()
            .map(|m| json!({"server_name": m, "url": format!("https://{}:8443", m), "status": "Online"}))
            .collect();
        return sync(Value::Array(full)).into_response();
    }
    let urls: Vec<String> = members
        .iter()
        .map(|m| format!("/1.0/cluster/members/{}", m))
        .collect();
    sync(json!(urls)).into_response()
}

async fn post_members(State(host): State<FakeHost>, Json(body): Json<Value>) -> Response {
    host.seen.lock().unwrap().push(format!("POST {}", body));
    if body.get("address").is_some() {
        return sync(json!({
            "private_key": "a2V5",
            "storage_pools": body.get("storage_pools").cloned().unwrap_or(json!([])),
            "networks": [],
        }))
        .into_response();
    }
    Json(json!({
        "type": "async",
        "status": "Operation created",
        "status_code": 100,
        "operation": "/1.0/operations/op-1",
        "metadata": operation(OperationStatus::Running),
    }))
    .into_response()
}

async fn delete_member(
    State(host): State<FakeHost>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    host.seen.lock().unwrap().push(format!(
        "DELETE {} force={}",
        name,
        params.get("force").cloned().unwrap_or_default()
    ));
    let mut members = host.members.lock().unwrap();
    if !members.contains(&name) {
        return error(StatusCode::NOT_FOUND, "Cluster member not found");
    }
    members.retain(|m| m != &name);
    sync(Value::Null).into_response()
}

async fn rename_member(State(host): State<FakeHost>, Path(name): Path<String>, Json(body): Json<Value>) -> Response {
    let new_name = body["server_name"].as_str().unwrap_or_default().to_string();
    let mut members = host.members.lock().unwrap();
    if members.contains(&new_name) {
        return error(
            StatusCode::BAD_REQUEST,
            &format!("The cluster already has a member with name: {}", new_name),
        );
    }
    for m in members.iter_mut() {
        if *m == name {
            *m = new_name.clone();
        }
    }
    sync(Value::Null).into_response()
}

async fn get_operation(Path(_id): Path<String>) -> Response {
    sync(operation(OperationStatus::Running)).into_response()
}

async fn wait_operation(State(host): State<FakeHost>, Path(id): Path<String>, Query(params): Query<HashMap<String, String>>) -> Response {
    host.seen.lock().unwrap().push(format!(
        "WAIT {} timeout={}",
        id,
        params.get("timeout").cloned().unwrap_or_default()
    ));
    sync(operation(OperationStatus::Success)).into_response()
}

async fn spawn(host: FakeHost) -> HostClient {
    let app = Router::new()
        .route("/1.0", get(get_server).put(put_server))
        .route("/1.0/cluster", get(get_cluster))
        .route("/1.0/cluster/members", get(list_members).post(post_members))
        .route("/1.0/cluster/members/{name}", delete(delete_member).post(rename_member))
        .route("/1.0/operations/{id}", get(get_operation))
        .route("/1.0/operations/{id}/wait", get(wait_operation))
        .with_state(host);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    HostClient::new(format!("http://{}", addr)).expect("Failed to create client")
}

#[tokio::test]
async fn test_update_server_round_trip_and_stale_etag() {
    let client = spawn(FakeHost::default()).await;

    let (server, etag) = client.get_server().await.unwrap();
    let mut put = server.writable();
    put.config.insert("core.https_address".into(), json!("[::]:8443"));
    client.update_server(&put, &etag).await.unwrap();

    let (server, fresh) = client.get_server().await.unwrap();
    assert_eq!(server.config_str("core.https_address"), "[::]:8443");

    // First update moved the ETag on; the token captured before it is stale
    let err = client.update_server(&put, &etag).await.unwrap_err();
    assert!(matches!(err, HostError::Conflict(ref m) if m == "ETag doesn't match"));

    client.update_server(&server.writable(), &fresh).await.unwrap();
}

#[tokio::test]
async fn test_leave_cluster_force_sends_flag() {
    let host = FakeHost::with_members(&["node1", "node2"]);
    let client = spawn(host.clone()).await;

    client.leave_cluster("node2", true).await.unwrap();

    assert!(host.seen().contains(&"DELETE node2 force=1".to_string()));
    assert_eq!(client.get_cluster_member_names().await.unwrap(), vec!["node1"]);
}

#[tokio::test]
async fn test_leave_unknown_member_is_not_found() {
    let client = spawn(FakeHost::with_members(&["node1"])).await;
    let err = client.leave_cluster("ghost", false).await.unwrap_err();
    assert!(matches!(err, HostError::NotFound(_)));
}

#[tokio::test]
async fn test_members_recursive_listing() {
    let client = spawn(FakeHost::with_members(&["node1", "node2"])).await;
    let members = client.get_cluster_members().await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].url, "https://node2:8443");

    let empty = spawn(FakeHost::default()).await;
    assert!(empty.get_cluster_member_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_cluster_sends_encoded_password() {
    let host = FakeHost::default();
    let client = spawn(host.clone()).await;

    client.get_cluster("p&ss word").await.unwrap();
    client.get_cluster("").await.unwrap();

    assert_eq!(host.seen(), vec!["password=p&ss word", "password="]);
}

#[tokio::test]
async fn test_bootstrap_returns_operation_handle() {
    let host = FakeHost::default();
    let client = spawn(host.clone()).await;

    let mut op = client.bootstrap_cluster("node1").await.unwrap();
    assert_eq!(op.id(), "op-1");
    assert_eq!(op.status(), OperationStatus::Running);
    assert_eq!(op.poll(&client).await.unwrap(), OperationStatus::Running);

    let info = op.wait(&client, Duration::from_secs(5)).await.unwrap();
    assert_eq!(info.state(), OperationStatus::Success);

    let seen = host.seen();
    assert_eq!(seen[0], r#"POST {"server_name":"node1"}"#);
    assert!(seen.iter().any(|s| s.starts_with("WAIT op-1 timeout=")));
}

#[tokio::test]
async fn test_accept_member_decodes_credentials() {
    let client = spawn(FakeHost::default()).await;
    let pools = vec![hostd_client::StoragePool {
        name: "default".into(),
        driver: "dir".into(),
        ..Default::default()
    }];
    let accepted = client
        .accept_member("pw", "node2", "10.0.0.2:8443", 3, 12, &pools, &[])
        .await
        .unwrap();
    assert_eq!(accepted.private_key, b"key");
    assert_eq!(accepted.storage_pools, pools);
}

#[tokio::test]
async fn test_rename_error_is_verbatim() {
    let client = spawn(FakeHost::with_members(&["node1", "node2"])).await;
    let err = client
        .rename_cluster_member("node1", &ClusterMemberPost { server_name: "node2".into() })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "The cluster already has a member with name: node2");
}
