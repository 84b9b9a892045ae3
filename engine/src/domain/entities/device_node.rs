//! Registry node entities
//! One node per launched or externally-registered child. Nodes move between
//! the pending and registered sets by value; lookups hand out snapshots, not
//! references into the collections.

use crate::domain::ports::{DeviceHandle, ServiceHandle};
use std::fmt;
use std::sync::Arc;

/// Registry record for a device.
///
/// `pid == 0` marks a device that registered from an external source; the
/// device manager never signals such processes. A node in the pending set has
/// no live handle yet.
#[derive(Clone)]
pub struct DeviceNode {
    pub identifier: String,
    pub label: String,
    pub pid: u32,
    /// Stringified remote reference; empty until the device registers
    pub ior: String,
    pub handle: Option<Arc<dyn DeviceHandle>>,
}

impl DeviceNode {
    /// A node for a child this device manager launched itself.
    pub fn launched(identifier: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.into(),
            pid: 0,
            ior: String::new(),
            handle: None,
        }
    }

    /// A node for a device that registered without being launched here.
    pub fn external(identifier: impl Into<String>) -> Self {
        let identifier: String = identifier.into();
        Self::launched(identifier, String::new())
    }
}

impl fmt::Debug for DeviceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceNode")
            .field("identifier", &self.identifier)
            .field("label", &self.label)
            .field("pid", &self.pid)
            .field("ior", &self.ior)
            .field("handle", &self.handle.is_some())
            .finish()
    }
}

/// Registry record for a service, keyed by its unique usage name.
#[derive(Clone)]
pub struct ServiceNode {
    pub label: String,
    pub pid: u32,
    pub ior: String,
    pub handle: Option<Arc<dyn ServiceHandle>>,
}

impl ServiceNode {
    pub fn launched(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pid: 0,
            ior: String::new(),
            handle: None,
        }
    }

    pub fn external(label: impl Into<String>) -> Self {
        Self::launched(label)
    }
}

impl fmt::Debug for ServiceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceNode")
            .field("label", &self.label)
            .field("pid", &self.pid)
            .field("ior", &self.ior)
            .field("handle", &self.handle.is_some())
            .finish()
    }
}

/// Owned copy of a device node's identity, safe to use after the lock is
/// released.
#[derive(Debug, Clone)]
pub struct DeviceSnapshot {
    pub identifier: String,
    pub label: String,
    pub pid: u32,
    pub ior: String,
}

impl From<&DeviceNode> for DeviceSnapshot {
    fn from(node: &DeviceNode) -> Self {
        Self {
            identifier: node.identifier.clone(),
            label: node.label.clone(),
            pid: node.pid,
            ior: node.ior.clone(),
        }
    }
}

/// Owned copy of a service node's identity.
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    pub label: String,
    pub pid: u32,
    pub ior: String,
}

impl From<&ServiceNode> for ServiceSnapshot {
    fn from(node: &ServiceNode) -> Self {
        Self {
            label: node.label.clone(),
            pid: node.pid,
            ior: node.ior.clone(),
        }
    }
}
