//! Network exposure planning
//!
//! Turns the operator's address/port/password answers into the
//! `core.https_address` and `core.trust_password` values.

use crate::error::InitError;
use std::net::IpAddr;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8443;

/// Wildcard accepted in place of an IP literal
pub const ALL_ADDRESSES: &str = "all";

/// What [`ALL_ADDRESSES`] binds to, before bracketing
pub const WILDCARD_ADDRESS: &str = "::";

/// Where and how the host listens for remote clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkExposure {
    /// Host part ready for `host:port` use (IPv6 bracketed)
    pub address: String,
    pub port: u16,
    pub trust_password: String,
}

impl NetworkExposure {
    /// Build an exposure from raw input, validating each part
    pub fn new(address: &str, port: Option<i64>, trust_password: Option<&str>) -> Result<Self, InitError> {
        let address = normalize_address(address)?;
        let port = match port {
            Some(p) => validate_port(p)?,
            None => DEFAULT_PORT,
        };
        let trust_password = trust_password.unwrap_or_default().to_string();
        if trust_password.is_empty() {
            warn!("No trust password set; remote clients will need to be trusted by certificate");
        }

        Ok(Self {
            address,
            port,
            trust_password,
        })
    }

    /// Value for `core.https_address`
    pub fn https_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Resolve a listen address to the IP it binds
///
/// `all` resolves to [`WILDCARD_ADDRESS`]. Anything else must be an IP literal.
pub fn bind_ip(input: &str) -> Result<IpAddr, InitError> {
    let input = input.trim();
    let literal = if input == ALL_ADDRESSES { WILDCARD_ADDRESS } else { input };
    literal
        .parse()
        .map_err(|_| InitError::InvalidAddress(input.to_string()))
}

/// Validate a listen address and bracket it for `host:port` use
pub fn normalize_address(input: &str) -> Result<String, InitError> {
    Ok(match bind_ip(input)? {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    })
}

pub fn validate_port(port: i64) -> Result<u16, InitError> {
    match u16::try_from(port) {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(InitError::InvalidPort(port)),
    }
}

/// Answer validator used by the interactive address prompt
pub fn check_address(input: &str) -> Result<(), String> {
    normalize_address(input).map(|_| ()).map_err(|e| e.to_string())
}
