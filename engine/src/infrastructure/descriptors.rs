//! Descriptor documents
//! Serde schema for the node, software-package and property descriptors as
//! they appear on disk. Translation into domain entities happens in
//! `domain::services::descriptor_loading`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node descriptor document (one per device manager).
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDescriptorDoc {
    pub id: String,
    pub name: String,
    pub domain_manager: String,

    #[serde(default)]
    pub device_manager_package: Option<String>,

    #[serde(default)]
    pub placements: Vec<PlacementDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlacementDoc {
    /// Software package descriptor reference
    pub package: String,

    #[serde(default)]
    pub composite_part_of: Option<String>,

    #[serde(default)]
    pub instantiations: Vec<InstantiationDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstantiationDoc {
    pub id: String,

    /// Defaults to the instantiation id
    #[serde(default)]
    pub usage_name: Option<String>,

    /// Per-instance property overrides, id to value
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Software package document (one per device or service).
#[derive(Debug, Serialize, Deserialize)]
pub struct SoftwarePackageDoc {
    pub id: String,
    pub name: String,

    /// `device`, `loadabledevice`, `executabledevice` or `service`
    pub kind: String,

    #[serde(default)]
    pub property_file: Option<String>,

    #[serde(default)]
    pub implementations: Vec<ImplementationDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImplementationDoc {
    pub id: String,
    pub code: CodeDoc,

    #[serde(default)]
    pub processors: Vec<String>,

    #[serde(default)]
    pub os: Vec<OsDoc>,

    #[serde(default)]
    pub property_file: Option<String>,

    /// Soft package descriptor references
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodeDoc {
    /// `executable` or `shared_library`
    pub kind: String,
    pub path: String,

    #[serde(default)]
    pub entry_point: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OsDoc {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,
}

/// Property descriptor document.
#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyFileDoc {
    #[serde(default)]
    pub properties: Vec<PropertyDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyDoc {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// `configure`, `construct`, `exec`, `factory` or `allocation`
    #[serde(default = "default_property_kind")]
    pub kind: String,

    /// `readonly`, `readwrite` or `writeonly`
    #[serde(default = "default_property_mode")]
    pub mode: String,

    #[serde(default)]
    pub command_line: bool,

    #[serde(default)]
    pub value: Option<String>,
}

fn default_property_kind() -> String {
    "configure".to_string()
}

fn default_property_mode() -> String {
    "readwrite".to_string()
}
