//! Domain-level errors
//! These represent deployment and federation failures, not host-language panics

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomainError {
    // Descriptor errors
    #[error("malformed descriptor '{path}': {detail}")]
    Parse { path: String, detail: String },

    #[error("not found: {0}")]
    NotFound(String),

    // Deployment errors
    #[error("no compatible implementation for package '{0}'")]
    NoCompatibleImplementation(String),

    #[error("failed to launch '{label}': {detail}")]
    LaunchFailed { label: String, detail: String },

    // Registration errors
    #[error("invalid object reference: {0}")]
    InvalidRef(String),

    #[error("initialization of '{label}' failed: {detail}")]
    ConfigureFailed { label: String, detail: String },

    // Federation errors
    #[error("peer temporarily unavailable: {0}")]
    RemoteTransient(String),

    #[error("peer rejected the request: {0}")]
    RemoteFatal(String),

    #[error("interrupted by shutdown: {0}")]
    Interrupted(String),

    // Cache directory errors
    #[error("filesystem error at '{path}': {detail}")]
    Filesystem { path: String, detail: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
