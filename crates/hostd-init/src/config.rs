//! Settings and preseed loading

use crate::error::InitError;
use crate::plan::InitRequest;
use hostd_client::{HostClient, HostError};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8443";
pub const DEFAULT_VAR_DIR: &str = "/var/lib/hostd";

/// Where to reach the host and where its state lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub url: String,
    pub var_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            var_dir: PathBuf::from(DEFAULT_VAR_DIR),
        }
    }
}

impl Settings {
    pub fn client(&self) -> Result<HostClient, HostError> {
        HostClient::new(self.url.clone())
    }
}

/// Parse preseed YAML; a preseed always runs in auto mode
pub fn parse_preseed(text: &str) -> Result<InitRequest, InitError> {
    // An empty document means "all defaults"
    let mut request: InitRequest = if text.trim().is_empty() {
        InitRequest::default()
    } else {
        serde_yaml::from_str(text)?
    };
    request.auto = true;
    Ok(request)
}

pub fn load_preseed(path: &Path) -> Result<InitRequest, InitError> {
    debug!("Loading preseed from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    parse_preseed(&text)
}

/// Pick the request to run: the preseed if given, otherwise the flags
///
/// Mixing a preseed with init flags is rejected.
pub fn select_request(flags: InitRequest, preseed: Option<InitRequest>) -> Result<InitRequest, InitError> {
    match preseed {
        Some(_) if flags.has_init_options() => Err(InitError::ConflictingArguments(
            "--preseed can't be combined with other init options".to_string(),
        )),
        Some(request) => Ok(request),
        None => Ok(flags),
    }
}
