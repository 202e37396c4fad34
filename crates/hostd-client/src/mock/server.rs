//! Server, profile and inventory operations for MockHostClient

use super::{MockHostClient, Versioned};
use crate::error::HostError;
use crate::models::*;

pub async fn get_server(client: &MockHostClient) -> Result<(Server, String), HostError> {
    client.record("get_server", "GET /1.0".to_string())?;
    let server = client.server.lock().unwrap();
    Ok((server.value.clone(), server.etag.clone()))
}

pub async fn update_server(client: &MockHostClient, put: &ServerPut, etag: &str) -> Result<(), HostError> {
    client.record("update_server", "PUT /1.0".to_string())?;
    let next = client.next_etag();
    let mut server = client.server.lock().unwrap();
    check_etag(&server, etag, "server")?;

    // An empty string unsets the key
    server.value.config = put
        .config
        .iter()
        .filter(|(_, v)| v.as_str() != Some(""))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    server.etag = next;
    Ok(())
}

pub async fn get_profile(client: &MockHostClient, name: &str) -> Result<(Profile, String), HostError> {
    client.record("get_profile", format!("GET /1.0/profiles/{}", name))?;
    client
        .profiles
        .lock()
        .unwrap()
        .get(name)
        .map(|p| (p.value.clone(), p.etag.clone()))
        .ok_or_else(|| HostError::NotFound(format!("Profile {} not found", name)))
}

pub async fn update_profile(
    client: &MockHostClient,
    name: &str,
    put: &ProfilePut,
    etag: &str,
) -> Result<(), HostError> {
    client.record("update_profile", format!("PUT /1.0/profiles/{}", name))?;
    let next = client.next_etag();
    let mut profiles = client.profiles.lock().unwrap();
    let profile = profiles
        .get_mut(name)
        .ok_or_else(|| HostError::NotFound(format!("Profile {} not found", name)))?;
    check_etag(profile, etag, "profile")?;

    profile.value.description = put.description.clone();
    profile.value.config = put
        .config
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    profile.value.devices = put.devices.clone();
    profile.etag = next;
    Ok(())
}

pub async fn get_container_names(client: &MockHostClient) -> Result<Vec<String>, HostError> {
    client.record("get_container_names", "GET /1.0/containers".to_string())?;
    Ok(client.containers.lock().unwrap().clone())
}

pub async fn get_image_fingerprints(client: &MockHostClient) -> Result<Vec<String>, HostError> {
    client.record("get_image_fingerprints", "GET /1.0/images".to_string())?;
    Ok(client.images.lock().unwrap().clone())
}

fn check_etag<T>(resource: &Versioned<T>, etag: &str, kind: &str) -> Result<(), HostError> {
    if !etag.is_empty() && etag != resource.etag {
        return Err(HostError::Conflict(format!(
            "ETag doesn't match for {}: {} != {}",
            kind, etag, resource.etag
        )));
    }
    Ok(())
}
