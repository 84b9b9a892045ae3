//! Property value objects
//! Definitions come from a package's property descriptor; concrete values are
//! what actually crosses the wire to a child at launch or registration time.

use serde::{Deserialize, Serialize};

/// What a property is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Applied through `configure` after initialization
    Configure,
    /// Applied through `initialize_properties` before initialization
    Construct,
    /// Passed on the child's command line
    Exec,
    /// Consumed by component factories
    Factory,
    /// Matched against host capabilities
    Allocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyMode {
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

/// One property definition from a property descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub id: String,
    pub name: Option<String>,
    pub kind: PropertyKind,
    pub mode: PropertyMode,
    /// Construct properties flagged command-line are delivered as exec
    /// parameters instead of through `initialize_properties`.
    pub command_line: bool,
    pub value: Option<String>,
}

impl PropertyDef {
    pub fn is_read_only(&self) -> bool {
        self.mode == PropertyMode::ReadOnly
    }
}

/// A concrete (non-nil) property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub id: String,
    pub value: String,
}

impl PropertyValue {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}
