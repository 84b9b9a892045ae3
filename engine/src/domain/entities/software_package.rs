//! Software package entities
//! A package self-describes a device or service: its implementation variants,
//! their host constraints, and its property set.

use crate::domain::{CodeKind, ComponentKind, PropertyDef};

#[derive(Debug, Clone)]
pub struct SoftwarePackage {
    pub id: String,
    pub name: String,
    pub kind: ComponentKind,
    /// Filesystem path of the descriptor this package was loaded from
    pub descriptor_path: String,
    /// Implementation variants in declaration order; order breaks ties
    pub implementations: Vec<Implementation>,
    /// Package-level property definitions
    pub properties: Vec<PropertyDef>,
}

/// One deployable variant of a package.
#[derive(Debug, Clone)]
pub struct Implementation {
    pub id: String,
    pub code: CodeDescriptor,
    /// Processors this implementation runs on; empty means unconstrained
    pub processors: Vec<String>,
    /// Operating systems this implementation runs on; empty means
    /// unconstrained
    pub os_requirements: Vec<OsRequirement>,
    /// Implementation-specific property definitions, merged over the
    /// package-level set when this variant is selected
    pub properties: Vec<PropertyDef>,
    /// Soft packages this implementation depends on; each needs its own
    /// matched implementation before this one is usable
    pub dependencies: Vec<SoftwarePackage>,
}

#[derive(Debug, Clone)]
pub struct CodeDescriptor {
    pub kind: CodeKind,
    /// Path of the code artifact, resolved against the package descriptor's
    /// directory at load time
    pub path: String,
    pub entry_point: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRequirement {
    pub name: String,
    /// A `None` version matches any version of the named OS
    pub version: Option<String>,
}

/// What the host offers, matched against implementation constraints.
///
/// Derived from the device manager's own package properties
/// (`processor_name`, `os_name`, `os_version` allocation properties), falling
/// back to compile-time host facts.
#[derive(Debug, Clone)]
pub struct HostCapabilities {
    pub processor: String,
    pub os_name: String,
    pub os_version: String,
}

impl HostCapabilities {
    pub fn from_properties(properties: &[PropertyDef]) -> Self {
        let lookup = |name: &str| {
            properties
                .iter()
                .find(|p| p.id == name || p.name.as_deref() == Some(name))
                .and_then(|p| p.value.clone())
        };
        Self {
            processor: lookup("processor_name")
                .unwrap_or_else(|| std::env::consts::ARCH.to_string()),
            os_name: lookup("os_name").unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: lookup("os_version").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PropertyKind, PropertyMode};

    fn allocation(id: &str, value: &str) -> PropertyDef {
        PropertyDef {
            id: id.to_string(),
            name: None,
            kind: PropertyKind::Allocation,
            mode: PropertyMode::ReadOnly,
            command_line: false,
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn test_host_capabilities_from_properties() {
        let props = vec![
            allocation("processor_name", "x86_64"),
            allocation("os_name", "Linux"),
            allocation("os_version", "5.15"),
        ];
        let host = HostCapabilities::from_properties(&props);
        assert_eq!(host.processor, "x86_64");
        assert_eq!(host.os_name, "Linux");
        assert_eq!(host.os_version, "5.15");
    }

    #[test]
    fn test_host_capabilities_fall_back_to_build_target() {
        let host = HostCapabilities::from_properties(&[]);
        assert_eq!(host.processor, std::env::consts::ARCH);
        assert_eq!(host.os_name, std::env::consts::OS);
    }
}
