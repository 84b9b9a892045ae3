//! Node descriptor entities
//! The in-memory form of the node descriptor: who this device manager is,
//! which domain manager it federates into, and what it must place.

use crate::domain::PropertyValue;

/// The parsed node descriptor.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Unique identifier of this device manager within the domain
    pub identifier: String,
    /// Human label; also the naming-tree context this node binds under
    pub label: String,
    /// Naming path of the domain manager to federate into
    pub domain_manager_name: String,
    /// Reference to the device manager's own software package
    pub device_manager_package: Option<String>,
    pub placements: Vec<Placement>,
}

/// A request to instantiate a package one or more times on this node.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Software package descriptor reference (filesystem path)
    pub package_ref: String,
    /// Instantiation id of the parent device this placement is loaded into,
    /// when the placement is a composite part of another device
    pub composite_part_of: Option<String>,
    pub instantiations: Vec<Instantiation>,
}

impl Placement {
    /// Identifier used in log and error records for this placement: the first
    /// instantiation id, falling back to the package reference.
    pub fn display_id(&self) -> &str {
        self.instantiations
            .first()
            .map(|inst| inst.id.as_str())
            .unwrap_or(self.package_ref.as_str())
    }
}

/// One concrete instance of a placement.
#[derive(Debug, Clone)]
pub struct Instantiation {
    pub id: String,
    /// Usage name; doubles as the naming-tree label for devices and the
    /// unique service name for services
    pub usage_name: String,
    /// Per-instance property overrides applied on top of the package profile
    pub overrides: Vec<PropertyValue>,
}
