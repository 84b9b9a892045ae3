//! Component and code kind value objects

use crate::domain::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized kind of a software package.
///
/// Package descriptors may declare `device`, `loadabledevice`,
/// `executabledevice` or `service`; the first three all normalize to
/// `Device`. Existing packages depend on this behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentKind {
    Device,
    Service,
}

impl ComponentKind {
    /// Parse a descriptor kind string, normalizing the device variants.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "device" | "loadabledevice" | "executabledevice" => Ok(ComponentKind::Device),
            "service" => Ok(ComponentKind::Service),
            other => Err(DomainError::Parse {
                path: String::new(),
                detail: format!("unsupported component kind '{}'", other),
            }),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Device => write!(f, "device"),
            ComponentKind::Service => write!(f, "service"),
        }
    }
}

/// How an implementation's code artifact is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeKind {
    Executable,
    SharedLibrary,
}

impl CodeKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "executable" => Ok(CodeKind::Executable),
            "shared_library" => Ok(CodeKind::SharedLibrary),
            other => Err(DomainError::Parse {
                path: String::new(),
                detail: format!("unsupported code kind '{}'", other),
            }),
        }
    }
}

/// The launch type handed to a child process: standalone devices and services
/// keep their package kind, composite children are launched as shared
/// libraries loaded into their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Device,
    Service,
    SharedLibrary,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentType::Device => write!(f, "device"),
            ComponentType::Service => write!(f, "service"),
            ComponentType::SharedLibrary => write!(f, "SharedLibrary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kinds_normalize() {
        assert_eq!(
            ComponentKind::parse("device").unwrap(),
            ComponentKind::Device
        );
        assert_eq!(
            ComponentKind::parse("loadabledevice").unwrap(),
            ComponentKind::Device
        );
        assert_eq!(
            ComponentKind::parse("executabledevice").unwrap(),
            ComponentKind::Device
        );
        assert_eq!(
            ComponentKind::parse("service").unwrap(),
            ComponentKind::Service
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(ComponentKind::parse("application").is_err());
        assert!(CodeKind::parse("driver").is_err());
    }

    #[test]
    fn test_component_type_display() {
        assert_eq!(ComponentType::Device.to_string(), "device");
        assert_eq!(ComponentType::Service.to_string(), "service");
        assert_eq!(ComponentType::SharedLibrary.to_string(), "SharedLibrary");
    }
}
