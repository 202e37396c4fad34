use crate::config::{Settings, DEFAULT_URL, DEFAULT_VAR_DIR};
use crate::plan::InitRequest;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hostd",
    about = "Configure a hostd node and manage its cluster membership",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "HOSTD_URL",
        default_value = DEFAULT_URL,
        help = "Base URL of the hostd API"
    )]
    pub url: String,

    #[arg(
        long = "var-dir",
        global = true,
        env = "HOSTD_VAR_DIR",
        value_name = "PATH",
        default_value = DEFAULT_VAR_DIR,
        help = "Directory holding hostd state, including loop backing files"
    )]
    pub var_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            url: self.url.clone(),
            var_dir: self.var_dir.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configure storage, privilege defaults and network exposure
    Init(InitArgs),
    /// Manage cluster membership
    #[command(subcommand)]
    Cluster(ClusterCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    #[arg(long, help = "Automatic (non-interactive) mode")]
    pub auto: bool,

    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "auto",
        help = "Read the answers from a YAML preseed file"
    )]
    pub preseed: Option<PathBuf>,

    #[arg(long = "storage-backend", value_name = "BACKEND", help = "Storage backend to use (dir or zfs)")]
    pub storage_backend: Option<String>,

    #[arg(long = "storage-create-device", value_name = "PATH", help = "Setup device based storage using DEVICE")]
    pub storage_create_device: Option<String>,

    #[arg(long = "storage-create-loop", value_name = "GB", help = "Setup loop based storage with SIZE in GB")]
    pub storage_create_loop: Option<u64>,

    #[arg(long = "storage-pool", value_name = "NAME", help = "Storage pool to use or create")]
    pub storage_pool: Option<String>,

    #[arg(long = "network-address", value_name = "ADDRESS", help = "Address to bind hostd to (default: none)")]
    pub network_address: Option<String>,

    #[arg(
        long = "network-port",
        value_name = "PORT",
        allow_negative_numbers = true,
        help = "Port to bind hostd to (default: 8443)"
    )]
    pub network_port: Option<i64>,

    #[arg(
        long = "trust-password",
        value_name = "PASSWORD",
        help = "Password required to add new clients"
    )]
    pub trust_password: Option<String>,
}

impl InitArgs {
    pub fn request(&self) -> InitRequest {
        InitRequest {
            auto: self.auto,
            storage_backend: self.storage_backend.clone(),
            storage_create_device: self.storage_create_device.clone(),
            storage_create_loop: self.storage_create_loop,
            storage_pool: self.storage_pool.clone(),
            network_address: self.network_address.clone(),
            network_port: self.network_port,
            trust_password: self.trust_password.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommand {
    /// Show the cluster descriptor
    Show {
        #[arg(long, default_value = "", help = "Trust password, for untrusted clients")]
        password: String,
    },
    /// Form a new cluster with this host as its first member
    Bootstrap {
        name: String,
        #[arg(long, default_value_t = 300, value_name = "SECONDS", help = "How long to wait for the operation")]
        timeout: u64,
    },
    /// Join an existing cluster
    Join {
        name: String,
        #[arg(long = "target-address", value_name = "ADDRESS")]
        target_address: String,
        #[arg(long = "target-password", value_name = "PASSWORD", default_value = "")]
        target_password: String,
        #[arg(long = "target-cert-file", value_name = "FILE", help = "PEM certificate of the target member")]
        target_cert_file: Option<PathBuf>,
        #[arg(long, default_value_t = 300, value_name = "SECONDS", help = "How long to wait for the operation")]
        timeout: u64,
    },
    /// Remove a member from the cluster
    Leave {
        name: String,
        #[arg(long, help = "Remove the member even if it is unreachable")]
        force: bool,
    },
    /// List cluster members
    List {
        #[arg(long, help = "Print member names only")]
        names: bool,
    },
    /// Rename a cluster member
    Rename { name: String, new_name: String },
}
