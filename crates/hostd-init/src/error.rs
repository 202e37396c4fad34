//! Init-specific error types.
//!
//! Every error is fatal to the current invocation; nothing here is retried.

use hostd_client::HostError;
use thiserror::Error;

/// Errors that can occur while resolving or applying an initialization plan.
#[derive(Debug, Error)]
pub enum InitError {
    /// Init flags given without `--auto`, or mixed with a preseed
    #[error("Conflicting arguments: {0}")]
    ConflictingArguments(String),

    #[error("The requested backend '{0}' isn't supported by hostd init")]
    UnsupportedBackend(String),

    #[error("The requested backend '{0}' isn't available on your system (missing tools)")]
    BackendUnavailable(String),

    /// Pool, device or loop parameters used with the `dir` backend
    #[error("None of --storage-pool, --storage-create-device or --storage-create-loop may be used with the '{0}' backend")]
    IncompatibleBackendOptions(String),

    #[error("Only one of --storage-create-device or --storage-create-loop can be specified")]
    ConflictingStorageMode,

    /// Port or trust password without an address
    #[error("--{0} cannot be used without --network-address")]
    DanglingNetworkOption(&'static str),

    #[error("--storage-pool is required to use an existing ZFS pool")]
    MissingStoragePool,

    #[error("Invalid loop device size: {0}GB (1GB minimum)")]
    InvalidLoopSize(u64),

    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(i64),

    /// The host already holds containers or images
    #[error("You have existing containers or images. hostd init requires an empty host")]
    HostNotEmpty,

    #[error("'{0}' is not an IP address")]
    InvalidAddress(String),

    #[error("'{0}' is not a block device")]
    NotABlockDevice(String),

    /// The pool creation tool failed; carries its output
    #[error("Failed to create the ZFS pool: {output}")]
    StorageCreateFailed { output: String },

    /// Stale concurrency token on update
    #[error("Configuration changed concurrently: {0}")]
    RemoteConflict(String),

    /// Any other host-reported failure
    #[error("{0}")]
    RemoteRequest(String),

    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reading operator input
    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Invalid preseed: {0}")]
    Preseed(#[from] serde_yaml::Error),
}

/// Coarse grouping of [`InitError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Conflicting or incomplete flags, detected before any network call
    ArgumentValidation,
    /// Host state forbids the command
    Precondition,
    /// Storage backend unsupported or unavailable
    Backend,
    /// An answer or flag value failed validation
    InvalidInput,
    StorageCreate,
    RemoteConflict,
    RemoteRequest,
    DeviceAlreadyExists,
    /// Local I/O and input failures
    Local,
}

impl InitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            InitError::ConflictingArguments(_)
            | InitError::IncompatibleBackendOptions(_)
            | InitError::ConflictingStorageMode
            | InitError::DanglingNetworkOption(_)
            | InitError::MissingStoragePool
            | InitError::InvalidLoopSize(_)
            | InitError::InvalidPort(_) => ErrorCategory::ArgumentValidation,
            InitError::HostNotEmpty => ErrorCategory::Precondition,
            InitError::UnsupportedBackend(_) | InitError::BackendUnavailable(_) => ErrorCategory::Backend,
            InitError::InvalidAddress(_) | InitError::NotABlockDevice(_) => ErrorCategory::InvalidInput,
            InitError::StorageCreateFailed { .. } => ErrorCategory::StorageCreate,
            InitError::RemoteConflict(_) => ErrorCategory::RemoteConflict,
            InitError::RemoteRequest(_) => ErrorCategory::RemoteRequest,
            InitError::DeviceAlreadyExists(_) => ErrorCategory::DeviceAlreadyExists,
            InitError::Io(_) | InitError::Prompt(_) | InitError::Preseed(_) => ErrorCategory::Local,
        }
    }
}

impl From<HostError> for InitError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Conflict(message) => InitError::RemoteConflict(message),
            other => InitError::RemoteRequest(other.to_string()),
        }
    }
}
