//! Object bus ports
//! The distributed object bus (naming tree, domain manager, event channels,
//! remote device handles) is an external collaborator; these traits are the
//! surface this engine relies on. Adapters live in the infrastructure layer.

use crate::domain::PropertyValue;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failures surfaced by the object bus.
#[derive(Debug, Error, Clone)]
pub enum BusError {
    /// The peer exists but is temporarily unreachable; retrying may succeed
    #[error("peer temporarily unreachable: {0}")]
    Transient(String),

    /// The peer's object has not finished constructing yet
    #[error("remote object not yet constructed: {0}")]
    ObjectNotExist(String),

    #[error("name not found: {0}")]
    NotFound(String),

    #[error("name already bound: {0}")]
    AlreadyBound(String),

    /// The peer actively rejected the request; retrying cannot succeed
    #[error("registration rejected: {0}")]
    Rejected(String),

    #[error("communication failure: {0}")]
    Comm(String),
}

impl BusError {
    /// True for failures a bounded retry loop should absorb.
    pub fn is_transient(&self) -> bool {
        matches!(self, BusError::Transient(_) | BusError::ObjectNotExist(_))
    }
}

impl From<BusError> for crate::domain::DomainError {
    fn from(err: BusError) -> Self {
        use crate::domain::DomainError;
        match err {
            BusError::Transient(msg) | BusError::ObjectNotExist(msg) => {
                DomainError::RemoteTransient(msg)
            }
            BusError::NotFound(msg) => DomainError::NotFound(msg),
            BusError::AlreadyBound(msg)
            | BusError::Rejected(msg)
            | BusError::Comm(msg) => DomainError::RemoteFatal(msg),
        }
    }
}

/// A remote device published on the bus.
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    /// Stringified remote reference; equality of IORs is object equivalence
    fn ior(&self) -> String;

    /// Bound the blocking time of calls through this handle and allow
    /// `retries` transparent retries after a communication failure.
    fn set_call_policy(&self, _timeout_ms: u64, _retries: u32) {}

    async fn identifier(&self) -> Result<String, BusError>;
    async fn label(&self) -> Result<String, BusError>;
    async fn software_profile(&self) -> Result<String, BusError>;
    async fn initialize_properties(&self, props: &[PropertyValue]) -> Result<(), BusError>;
    async fn initialize(&self) -> Result<(), BusError>;
    async fn configure(&self, props: &[PropertyValue]) -> Result<(), BusError>;
    async fn release_object(&self) -> Result<(), BusError>;
}

/// A remote service published on the bus. Services are opaque to the device
/// manager; only their reference is tracked.
pub trait ServiceHandle: Send + Sync {
    fn ior(&self) -> String;

    fn set_call_policy(&self, _timeout_ms: u64, _retries: u32) {}
}

/// The cluster coordinator this node federates into.
#[async_trait]
pub trait DomainManager: Send + Sync {
    fn set_call_policy(&self, _timeout_ms: u64, _retries: u32) {}

    async fn register_device_manager(&self, devmgr_ior: &str) -> Result<(), BusError>;
    async fn unregister_device_manager(&self, devmgr_ior: &str) -> Result<(), BusError>;

    async fn register_device(&self, device_ior: &str, devmgr_ior: &str) -> Result<(), BusError>;
    async fn unregister_device(&self, device_ior: &str) -> Result<(), BusError>;

    async fn register_service(
        &self,
        service_ior: &str,
        devmgr_ior: &str,
        name: &str,
    ) -> Result<(), BusError>;
    async fn unregister_service(&self, service_ior: &str, name: &str) -> Result<(), BusError>;

    /// The domain's event channel broker, when it exposes one.
    async fn event_channel_manager(&self) -> Result<Arc<dyn EventChannelManager>, BusError>;
}

/// The naming tree this node binds itself and its children into.
#[async_trait]
pub trait NamingContext: Send + Sync {
    async fn resolve_domain_manager(&self, name: &str)
        -> Result<Arc<dyn DomainManager>, BusError>;

    /// Direct lookup of an event channel reference, used as a fallback when
    /// the broker is unavailable.
    async fn resolve_event_channel(&self, name: &str) -> Result<String, BusError>;

    /// Fails with `AlreadyBound` when the name is taken.
    async fn bind(&self, name: &str, ior: &str) -> Result<(), BusError>;

    /// Displaces any existing binding under the name.
    async fn rebind(&self, name: &str, ior: &str) -> Result<(), BusError>;

    async fn unbind(&self, name: &str) -> Result<(), BusError>;
}

/// The cluster event channel broker.
#[async_trait]
pub trait EventChannelManager: Send + Sync {
    /// Returns an opaque registration id used to unregister later.
    async fn register_resource(&self, channel: &str) -> Result<String, BusError>;

    async fn unregister(&self, registration_id: &str) -> Result<(), BusError>;
}
