//! hostd
//!
//! Bootstraps a node (`hostd init`) and manages its cluster membership
//! (`hostd cluster ...`).
//!
//! Logging goes to stderr and is controlled by RUST_LOG (default: warn).

use anyhow::Context;
use clap::Parser;
use hostd_client::HostClient;
use hostd_init::cli::{Cli, ClusterCommand, Command, InitArgs};
use hostd_init::commands::{self, SUCCESS_MESSAGE};
use hostd_init::config::{self, Settings};
use hostd_init::{SystemHost, TerminalPrompter};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    debug!("Settings: {:?}", settings);

    let client = settings
        .client()
        .with_context(|| format!("Failed to create client for {}", settings.url))?;

    match cli.command {
        Command::Init(args) => init(&client, &settings, &args).await,
        Command::Cluster(command) => cluster(&client, command).await,
    }
}

async fn init(client: &HostClient, settings: &Settings, args: &InitArgs) -> anyhow::Result<()> {
    let preseed = match &args.preseed {
        Some(path) => Some(
            config::load_preseed(path).with_context(|| format!("Failed to read preseed {}", path.display()))?,
        ),
        None => None,
    };
    let request = config::select_request(args.request(), preseed)?;

    let host = SystemHost::new(&settings.var_dir);
    let mut prompter = TerminalPrompter::stdio();
    commands::run_init(client, &host, request, &mut prompter)
        .await
        .context("hostd init failed")?;

    println!("{}", SUCCESS_MESSAGE);
    Ok(())
}

async fn cluster(client: &HostClient, command: ClusterCommand) -> anyhow::Result<()> {
    match command {
        ClusterCommand::Show { password } => {
            let cluster = commands::cluster_show(client, &password).await?;
            println!("server_name: {}", cluster.server_name);
            println!("enabled: {}", cluster.enabled);
        }
        ClusterCommand::Bootstrap { name, timeout } => {
            commands::cluster_bootstrap(client, &name, Duration::from_secs(timeout))
                .await
                .with_context(|| format!("Failed to bootstrap cluster as {}", name))?;
            println!("Cluster bootstrapped with member {}", name);
        }
        ClusterCommand::Join {
            name,
            target_address,
            target_password,
            target_cert_file,
            timeout,
        } => {
            let target_cert = match target_cert_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read certificate {}", path.display()))?,
                None => String::new(),
            };
            commands::cluster_join(
                client,
                &name,
                &target_address,
                &target_password,
                &target_cert,
                Duration::from_secs(timeout),
            )
            .await
            .with_context(|| format!("Failed to join cluster at {}", target_address))?;
            println!("Member {} joined the cluster", name);
        }
        ClusterCommand::Leave { name, force } => {
            commands::cluster_leave(client, &name, force).await?;
            println!("Member {} removed", name);
        }
        ClusterCommand::List { names } => {
            for line in commands::cluster_list(client, names).await? {
                println!("{}", line);
            }
        }
        ClusterCommand::Rename { name, new_name } => {
            commands::cluster_rename(client, &name, &new_name).await?;
            println!("Member {} renamed to {}", name, new_name);
        }
    }
    Ok(())
}
