//! Configuration application
//!
//! Every change is a fetch / mutate / update cycle guarded by the ETag read
//! in the fetch. A concurrent writer makes the update fail with
//! [`InitError::RemoteConflict`]; nothing is retried and earlier steps are
//! not rolled back.

use crate::error::InitError;
use crate::host::HostProbe;
use crate::plan::InitPlan;
use crate::storage;
use hostd_client::{HostClientTrait, HostError, ProfilePut, ServerPut};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info};

pub const KEY_ZFS_POOL_NAME: &str = "storage.zfs_pool_name";
pub const KEY_HTTPS_ADDRESS: &str = "core.https_address";
pub const KEY_TRUST_PASSWORD: &str = "core.trust_password";
pub const KEY_PRIVILEGED: &str = "security.privileged";

/// Profile whose privilege default init manages
pub const DEFAULT_PROFILE: &str = "default";

/// Keys cleared before a new configuration is written
pub const RESET_KEYS: [&str; 3] = [KEY_ZFS_POOL_NAME, KEY_HTTPS_ADDRESS, KEY_TRUST_PASSWORD];

/// Run one guarded read-modify-write cycle
///
/// `fetch` returns the writable form of the resource with its ETag,
/// `mutate` edits it in memory and `update` submits it with that same ETag.
pub async fn apply_config<R, FFetch, FutFetch, FMutate, FUpdate, FutUpdate>(
    resource_name: &str,
    fetch: FFetch,
    mutate: FMutate,
    update: FUpdate,
) -> Result<(), InitError>
where
    FFetch: FnOnce() -> FutFetch,
    FutFetch: Future<Output = Result<(R, String), HostError>>,
    FMutate: FnOnce(&mut R) -> Result<(), InitError>,
    FUpdate: FnOnce(R, String) -> FutUpdate,
    FutUpdate: Future<Output = Result<(), HostError>>,
{
    let (mut resource, etag) = fetch().await?;
    debug!("Fetched {} (ETag {:?})", resource_name, etag);

    mutate(&mut resource)?;

    update(resource, etag).await?;
    debug!("Updated {}", resource_name);
    Ok(())
}

/// Write several server keys in one cycle; an empty value unsets the key
pub async fn set_server_config<C: HostClientTrait + ?Sized>(
    client: &C,
    keys: &[(&str, &str)],
) -> Result<(), InitError> {
    apply_config(
        "server configuration",
        || async move {
            let (server, etag) = client.get_server().await?;
            Ok::<_, HostError>((server.writable(), etag))
        },
        |put: &mut ServerPut| {
            for (key, value) in keys {
                put.config.insert(key.to_string(), Value::String(value.to_string()));
            }
            Ok(())
        },
        |put, etag| async move { client.update_server(&put, &etag).await },
    )
    .await
}

/// Set one profile config key; an empty value removes it
pub async fn set_profile_config_item<C: HostClientTrait + ?Sized>(
    client: &C,
    profile: &str,
    key: &str,
    value: &str,
) -> Result<(), InitError> {
    apply_config(
        &format!("profile {}", profile),
        || async move {
            let (current, etag) = client.get_profile(profile).await?;
            Ok::<_, HostError>((current.writable(), etag))
        },
        |put: &mut ProfilePut| {
            if value.is_empty() {
                put.config.remove(key);
            } else {
                put.config.insert(key.to_string(), value.to_string());
            }
            Ok(())
        },
        |put, etag| async move { client.update_profile(profile, &put, &etag).await },
    )
    .await
}

/// Attach a new device to a profile
pub async fn profile_device_add<C: HostClientTrait + ?Sized>(
    client: &C,
    profile: &str,
    device: &str,
    config: HashMap<String, String>,
) -> Result<(), InitError> {
    apply_config(
        &format!("profile {}", profile),
        || async move {
            let (current, etag) = client.get_profile(profile).await?;
            Ok::<_, HostError>((current.writable(), etag))
        },
        |put: &mut ProfilePut| {
            if put.devices.contains_key(device) {
                return Err(InitError::DeviceAlreadyExists(device.to_string()));
            }
            put.devices.insert(device.to_string(), config);
            Ok(())
        },
        |put, etag| async move { client.update_profile(profile, &put, &etag).await },
    )
    .await
}

/// Apply a resolved plan to the host, step by step
pub async fn apply_plan<C, H>(client: &C, host: &H, plan: &InitPlan) -> Result<(), InitError>
where
    C: HostClientTrait + ?Sized,
    H: HostProbe + ?Sized,
{
    let reset: Vec<(&str, &str)> = RESET_KEYS.iter().map(|k| (*k, "")).collect();
    set_server_config(client, &reset).await?;

    host.remove_loop_file().await?;

    storage::provision(plan, host).await?;
    if plan.storage_backend == "zfs" {
        set_server_config(client, &[(KEY_ZFS_POOL_NAME, plan.storage_pool.as_str())]).await?;
        info!("Using ZFS pool {}", plan.storage_pool);
    }

    if let Some(value) = plan.default_privileged.profile_value() {
        set_profile_config_item(client, DEFAULT_PROFILE, KEY_PRIVILEGED, value).await?;
        info!("Set {}={:?} on the {} profile", KEY_PRIVILEGED, value, DEFAULT_PROFILE);
    }

    if let Some(network) = &plan.network {
        let address = network.https_address();
        let mut keys = vec![(KEY_HTTPS_ADDRESS, address.as_str())];
        if !network.trust_password.is_empty() {
            keys.push((KEY_TRUST_PASSWORD, network.trust_password.as_str()));
        }
        set_server_config(client, &keys).await?;
        info!("Listening on {}", address);
    }

    Ok(())
}
