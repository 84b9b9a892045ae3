//! Deployment entities
//! The bound pair of a placement and its resolved program profile, recorded
//! once per planned instantiation when a launch is authorized.

use crate::domain::entities::{Instantiation, Placement, SoftwarePackage};
use crate::domain::{ComponentType, PropertyDef, PropertyKind, PropertyValue};

/// A package together with its effective property set: the package-level
/// properties merged with the selected implementation's.
#[derive(Debug, Clone)]
pub struct ProgramProfile {
    pub package: SoftwarePackage,
    pub properties: Vec<PropertyDef>,
}

impl ProgramProfile {
    /// A package is configurable when it defines construct properties; only
    /// then does registration call `initialize_properties`.
    pub fn is_configurable(&self) -> bool {
        self.properties
            .iter()
            .any(|p| p.kind == PropertyKind::Construct)
    }

    /// Construct properties with a concrete value, instance overrides
    /// applied. Command-line flagged entries are excluded here; they travel
    /// as exec parameters instead.
    pub fn nonnil_construct_properties(&self, overrides: &[PropertyValue]) -> Vec<PropertyValue> {
        self.collect(overrides, |p| {
            p.kind == PropertyKind::Construct && !p.command_line
        })
    }

    /// Writable configure properties with a concrete value, instance
    /// overrides applied.
    pub fn nonnil_configure_properties(&self, overrides: &[PropertyValue]) -> Vec<PropertyValue> {
        self.collect(overrides, |p| {
            p.kind == PropertyKind::Configure && !p.is_read_only()
        })
    }

    /// Parameters passed on the child's command line: non-read-only exec
    /// properties plus command-line flagged construct properties.
    pub fn exec_parameters(&self, overrides: &[PropertyValue]) -> Vec<PropertyValue> {
        self.collect(overrides, |p| {
            (p.kind == PropertyKind::Exec && !p.is_read_only())
                || (p.kind == PropertyKind::Construct && p.command_line)
        })
    }

    fn collect<F>(&self, overrides: &[PropertyValue], filter: F) -> Vec<PropertyValue>
    where
        F: Fn(&PropertyDef) -> bool,
    {
        self.properties
            .iter()
            .filter(|p| filter(p))
            .filter_map(|p| {
                let value = overrides
                    .iter()
                    .find(|o| o.id == p.id)
                    .map(|o| o.value.clone())
                    .or_else(|| p.value.clone())?;
                Some(PropertyValue { id: p.id.clone(), value })
            })
            .collect()
    }
}

/// One authorized launch: which instantiation of which placement, deployed
/// with which implementation. Registration later resolves the registering
/// child back to this record by instantiation id.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub placement: Placement,
    pub profile: ProgramProfile,
    pub instantiation: Instantiation,
    pub implementation_id: String,
    pub component_type: ComponentType,
}
