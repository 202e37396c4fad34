//! Default container privilege
//!
//! Unprivileged containers need a subordinate id range. When the host has
//! none, containers default to privileged, unless we are nested and the
//! operator opts to share the parent's allocation instead.

use crate::error::InitError;
use crate::host::HostFacts;
use crate::plan::PrivilegeDefault;
use crate::prompt::Prompter;
use tracing::debug;

pub const SHARE_ALLOCATION_QUESTION: &str = "No usable uid/gid allocation was found inside this container. \
Containers can share the parent's allocation, at some cost in isolation. Share it";

/// What the host's id-map situation calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegePolicy {
    /// Unprivileged containers work; leave the default profile alone
    Unprivileged,
    /// Nested without ids: the operator chooses
    AskShare,
    /// No ids to hand out
    Privileged,
}

pub fn privilege_policy(facts: &HostFacts) -> PrivilegePolicy {
    let policy = match (facts.idmap_usable, facts.nested) {
        (true, _) => PrivilegePolicy::Unprivileged,
        (false, true) => PrivilegePolicy::AskShare,
        (false, false) => PrivilegePolicy::Privileged,
    };
    debug!(
        "Privilege policy {:?} (idmap usable: {}, nested: {})",
        policy, facts.idmap_usable, facts.nested
    );
    policy
}

/// Auto mode never asks: a nested host without ids gets privileged containers
pub fn auto_privilege(facts: &HostFacts) -> PrivilegeDefault {
    match privilege_policy(facts) {
        PrivilegePolicy::Unprivileged => PrivilegeDefault::Unset,
        PrivilegePolicy::AskShare | PrivilegePolicy::Privileged => PrivilegeDefault::True,
    }
}

pub fn interactive_privilege<P: Prompter + ?Sized>(
    facts: &HostFacts,
    prompter: &mut P,
) -> Result<PrivilegeDefault, InitError> {
    Ok(match privilege_policy(facts) {
        PrivilegePolicy::Unprivileged => PrivilegeDefault::Unset,
        PrivilegePolicy::Privileged => PrivilegeDefault::True,
        PrivilegePolicy::AskShare => {
            if prompter.ask_bool(SHARE_ALLOCATION_QUESTION, true)? {
                PrivilegeDefault::True
            } else {
                PrivilegeDefault::False
            }
        }
    })
}
