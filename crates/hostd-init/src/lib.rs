//! hostd node bootstrap
//!
//! Resolves `hostd init` input (flags, preseed or interactive answers) into
//! an [`InitPlan`] and applies it to a host through [`hostd_client`]. Also
//! carries the cluster membership commands of the `hostd` binary.
//!
//! Module map:
//! - `resolver` - input validation and plan construction
//! - `storage` - storage mode, loop sizing and pool creation
//! - `privilege` - default container privilege
//! - `network` - listen address and port
//! - `apply` - ETag-guarded configuration updates
//! - `host` - local machine probe
//! - `prompt` - operator prompts

pub mod apply;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod network;
pub mod plan;
pub mod privilege;
pub mod prompt;
pub mod resolver;
pub mod storage;

pub use error::{ErrorCategory, InitError};
pub use host::{HostFacts, HostProbe, SystemHost};
pub use network::NetworkExposure;
pub use plan::{InitMode, InitPlan, InitRequest, PrivilegeDefault, StorageMode};
pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};
pub use resolver::{FlagSource, PlanSource, PromptSource};
