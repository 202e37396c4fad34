//! Input resolution
//!
//! Turns an [`InitRequest`] into an [`InitPlan`]. Auto requests are checked
//! in full when the [`FlagSource`] is built, before anything touches the
//! network; interactive runs ask their questions through a [`Prompter`].

use crate::error::InitError;
use crate::host::{HostFacts, HostProbe};
use crate::network::{self, NetworkExposure, ALL_ADDRESSES, DEFAULT_PORT};
use crate::plan::{
    InitMode, InitPlan, InitRequest, StorageMode, DEFAULT_BACKEND, DEFAULT_POOL_NAME, SUPPORTED_BACKENDS,
};
use crate::privilege;
use crate::prompt::Prompter;
use crate::storage;
use hostd_client::HostClientTrait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Something that can produce a plan once the host facts are known
pub trait PlanSource {
    fn mode(&self) -> InitMode;

    fn plan(&mut self, facts: &HostFacts, host: &dyn HostProbe) -> Result<InitPlan, InitError>;
}

/// Build the plan from `source`
pub fn resolve_plan<S: PlanSource + ?Sized>(
    source: &mut S,
    facts: &HostFacts,
    host: &dyn HostProbe,
) -> Result<InitPlan, InitError> {
    let plan = source.plan(facts, host)?;
    debug!("Resolved {:?} plan: {:?}", source.mode(), plan);
    Ok(plan)
}

/// Init options only make sense together with `--auto`
pub fn validate_request(request: &InitRequest) -> Result<(), InitError> {
    if !request.auto && request.has_init_options() {
        return Err(InitError::ConflictingArguments(
            "init options can only be used with --auto".to_string(),
        ));
    }
    Ok(())
}

/// hostd init refuses to touch a host that already has workloads
pub async fn ensure_host_empty<C: HostClientTrait + ?Sized>(client: &C) -> Result<(), InitError> {
    let containers = client.get_container_names().await?;
    let images = client.get_image_fingerprints().await?;
    if !containers.is_empty() || !images.is_empty() {
        debug!("Host has {} containers and {} images", containers.len(), images.len());
        return Err(InitError::HostNotEmpty);
    }
    Ok(())
}

/// Plan taken from flags or a preseed file
#[derive(Debug, Clone)]
pub struct FlagSource {
    request: InitRequest,
    backend: String,
    network: Option<NetworkExposure>,
}

impl FlagSource {
    /// Validate an auto request; fails on the first broken rule
    ///
    /// Besides the flag combination rules, a ZFS request that neither
    /// creates a pool nor names an existing one is refused with
    /// [`InitError::MissingStoragePool`] instead of writing an empty
    /// `storage.zfs_pool_name`.
    pub fn new(request: InitRequest) -> Result<Self, InitError> {
        if !request.auto {
            return Err(InitError::ConflictingArguments(
                "flag input requires --auto".to_string(),
            ));
        }

        let backend = request.storage_backend().unwrap_or(DEFAULT_BACKEND).to_string();
        if !SUPPORTED_BACKENDS.contains(&backend.as_str()) {
            return Err(InitError::UnsupportedBackend(backend));
        }

        let device = request.storage_create_device();
        let loop_size = request.storage_create_loop;
        if backend == "dir" {
            if request.storage_pool().is_some() || device.is_some() || loop_size.is_some() {
                return Err(InitError::IncompatibleBackendOptions(backend));
            }
        } else {
            if device.is_some() && loop_size.is_some() {
                return Err(InitError::ConflictingStorageMode);
            }
            if let Some(size) = loop_size {
                storage::validate_loop_size(size)?;
            }
            if storage::storage_mode(device, loop_size) == StorageMode::Existing
                && request.storage_pool().is_none()
            {
                return Err(InitError::MissingStoragePool);
            }
        }

        let network = match request.network_address() {
            Some(address) => Some(NetworkExposure::new(
                address,
                request.network_port,
                request.trust_password(),
            )?),
            None => {
                if request.network_port.is_some() {
                    return Err(InitError::DanglingNetworkOption("network-port"));
                }
                if request.trust_password().is_some() {
                    return Err(InitError::DanglingNetworkOption("trust-password"));
                }
                None
            }
        };

        Ok(Self {
            request,
            backend,
            network,
        })
    }
}

impl PlanSource for FlagSource {
    fn mode(&self) -> InitMode {
        InitMode::Auto
    }

    fn plan(&mut self, facts: &HostFacts, host: &dyn HostProbe) -> Result<InitPlan, InitError> {
        storage::check_backend(&self.backend, facts)?;

        let device = self.request.storage_create_device();
        let loop_size = self.request.storage_create_loop;
        let storage_mode = storage::storage_mode(device, loop_size);

        let storage_device = match device {
            Some(path) => Some(storage::validate_block_device(host, path)?),
            None => None,
        };

        let storage_pool = if self.backend == "dir" {
            String::new()
        } else {
            self.request
                .storage_pool()
                .unwrap_or(DEFAULT_POOL_NAME)
                .to_string()
        };

        Ok(InitPlan {
            mode: InitMode::Auto,
            storage_backend: self.backend.clone(),
            storage_mode,
            storage_device,
            storage_loop_size_gb: if storage_mode == StorageMode::Loop { loop_size } else { None },
            storage_pool,
            default_privileged: privilege::auto_privilege(facts),
            network: self.network.clone(),
        })
    }
}

/// Plan built from the operator's answers
pub struct PromptSource<P> {
    prompter: P,
}

impl<P: Prompter> PromptSource<P> {
    pub fn new(prompter: P) -> Self {
        Self { prompter }
    }

    fn ask_storage(&mut self, facts: &HostFacts, host: &dyn HostProbe) -> Result<StorageChoice, InitError> {
        let default = if facts.has_backend("zfs") { "zfs" } else { DEFAULT_BACKEND };
        let backend = self
            .prompter
            .ask_choice("Name of the storage backend to use", SUPPORTED_BACKENDS, default)?;
        storage::check_backend(&backend, facts)?;

        if backend == "dir" {
            return Ok(StorageChoice::existing(backend, String::new()));
        }

        if !self.prompter.ask_bool("Create a new ZFS pool", true)? {
            let pool = self.prompter.ask_string(
                "Name of the existing ZFS pool or dataset",
                "",
                &not_empty,
            )?;
            return Ok(StorageChoice::existing(backend, pool));
        }

        let pool = self
            .prompter
            .ask_string("Name of the new ZFS pool", DEFAULT_POOL_NAME, &not_empty)?;

        if self
            .prompter
            .ask_bool("Would you like to use an existing block device", false)?
        {
            let is_block_device = |path: &str| {
                if host.is_block_device(Path::new(path)) {
                    Ok(())
                } else {
                    Err(InitError::NotABlockDevice(path.to_string()).to_string())
                }
            };
            let path = self
                .prompter
                .ask_string("Path to the existing block device", "", &is_block_device)?;
            let device = storage::validate_block_device(host, &path)?;
            return Ok(StorageChoice {
                backend,
                mode: StorageMode::Device,
                device: Some(device),
                loop_size_gb: None,
                pool,
            });
        }

        let suggested = storage::suggested_loop_size_gb(facts.free_bytes);
        let size = self.prompter.ask_int(
            "Size in GB of the new loop device (1GB minimum)",
            1,
            storage::MAX_LOOP_SIZE_GB as i64,
            suggested as i64,
        )?;
        Ok(StorageChoice {
            backend,
            mode: StorageMode::Loop,
            device: None,
            loop_size_gb: Some(size as u64),
            pool,
        })
    }

    fn ask_network(&mut self) -> Result<Option<NetworkExposure>, InitError> {
        if !self
            .prompter
            .ask_bool("Would you like hostd to be available over the network", false)?
        {
            return Ok(None);
        }

        let address = self.prompter.ask_string(
            "Address to bind hostd to (not including port)",
            ALL_ADDRESSES,
            &network::check_address,
        )?;
        let port = self
            .prompter
            .ask_int("Port to bind hostd to", 1, 65535, i64::from(DEFAULT_PORT))?;
        let password = self.prompter.ask_password("Trust password for new clients")?;

        NetworkExposure::new(&address, Some(port), Some(&password)).map(Some)
    }
}

struct StorageChoice {
    backend: String,
    mode: StorageMode,
    device: Option<PathBuf>,
    loop_size_gb: Option<u64>,
    pool: String,
}

impl StorageChoice {
    fn existing(backend: String, pool: String) -> Self {
        Self {
            backend,
            mode: StorageMode::Existing,
            device: None,
            loop_size_gb: None,
            pool,
        }
    }
}

fn not_empty(answer: &str) -> Result<(), String> {
    if answer.is_empty() {
        Err("a value is required".to_string())
    } else {
        Ok(())
    }
}

impl<P: Prompter> PlanSource for PromptSource<P> {
    fn mode(&self) -> InitMode {
        InitMode::Interactive
    }

    fn plan(&mut self, facts: &HostFacts, host: &dyn HostProbe) -> Result<InitPlan, InitError> {
        let storage = self.ask_storage(facts, host)?;
        let default_privileged = privilege::interactive_privilege(facts, &mut self.prompter)?;
        let network = self.ask_network()?;

        Ok(InitPlan {
            mode: InitMode::Interactive,
            storage_backend: storage.backend,
            storage_mode: storage.mode,
            storage_device: storage.device,
            storage_loop_size_gb: storage.loop_size_gb,
            storage_pool: storage.pool,
            default_privileged,
            network,
        })
    }
}
