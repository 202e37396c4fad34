//! Command implementations
//!
//! Each command takes its collaborators as trait objects or generics so the
//! same code runs against a live host and against the mock.

use crate::apply::apply_plan;
use crate::error::InitError;
use crate::host::{HostFacts, HostProbe};
use crate::plan::{InitPlan, InitRequest};
use crate::prompt::Prompter;
use crate::resolver::{ensure_host_empty, resolve_plan, validate_request, FlagSource, PlanSource, PromptSource};
use hostd_client::{Cluster, ClusterMember, ClusterMemberPost, HostClientTrait};
use std::time::Duration;
use tracing::{debug, info};

pub const SUCCESS_MESSAGE: &str = "hostd has been successfully configured.";

/// Run `hostd init` end to end and return the applied plan
///
/// Flags are checked before the host is contacted. The prompter is only
/// used when the request is not in auto mode.
pub async fn run_init<C, H, P>(
    client: &C,
    host: &H,
    request: InitRequest,
    prompter: &mut P,
) -> Result<InitPlan, InitError>
where
    C: HostClientTrait + ?Sized,
    H: HostProbe,
    P: Prompter,
{
    validate_request(&request)?;
    let mut source: Box<dyn PlanSource + '_> = if request.auto {
        Box::new(FlagSource::new(request)?)
    } else {
        Box::new(PromptSource::new(prompter))
    };

    ensure_host_empty(client).await?;

    let facts = HostFacts::gather(host).await?;
    let plan = resolve_plan(source.as_mut(), &facts, host)?;

    apply_plan(client, host, &plan).await?;
    info!("Applied {:?} init plan", plan.mode);
    Ok(plan)
}

pub async fn cluster_show<C: HostClientTrait + ?Sized>(client: &C, password: &str) -> Result<Cluster, InitError> {
    Ok(client.get_cluster(password).await?)
}

/// Form a cluster and wait for it, at most `timeout`
pub async fn cluster_bootstrap<C: HostClientTrait + ?Sized>(
    client: &C,
    name: &str,
    timeout: Duration,
) -> Result<(), InitError> {
    let mut op = client.bootstrap_cluster(name).await?;
    debug!("Bootstrap running as operation {}", op.id());
    op.wait(client, timeout).await?;
    info!("Cluster formed with {} as first member", name);
    Ok(())
}

pub async fn cluster_join<C: HostClientTrait + ?Sized>(
    client: &C,
    name: &str,
    target_address: &str,
    target_password: &str,
    target_cert: &str,
    timeout: Duration,
) -> Result<(), InitError> {
    let mut op = client
        .join_cluster(target_address, target_password, target_cert, name)
        .await?;
    debug!("Join running as operation {}", op.id());
    op.wait(client, timeout).await?;
    info!("{} joined the cluster at {}", name, target_address);
    Ok(())
}

pub async fn cluster_leave<C: HostClientTrait + ?Sized>(client: &C, name: &str, force: bool) -> Result<(), InitError> {
    client.leave_cluster(name, force).await?;
    info!("{} left the cluster", name);
    Ok(())
}

/// One output line per member
pub async fn cluster_list<C: HostClientTrait + ?Sized>(client: &C, names_only: bool) -> Result<Vec<String>, InitError> {
    if names_only {
        return Ok(client.get_cluster_member_names().await?);
    }
    let members = client.get_cluster_members().await?;
    Ok(members.iter().map(format_member).collect())
}

pub async fn cluster_rename<C: HostClientTrait + ?Sized>(
    client: &C,
    name: &str,
    new_name: &str,
) -> Result<(), InitError> {
    let post = ClusterMemberPost {
        server_name: new_name.to_string(),
    };
    client.rename_cluster_member(name, &post).await?;
    info!("Renamed cluster member {} to {}", name, new_name);
    Ok(())
}

pub fn format_member(member: &ClusterMember) -> String {
    format!(
        "{}\t{}\t{:?}\t{}{}",
        member.server_name,
        member.url,
        member.status,
        if member.database { "database" } else { "-" },
        if member.message.is_empty() {
            String::new()
        } else {
            format!("\t{}", member.message)
        }
    )
}
