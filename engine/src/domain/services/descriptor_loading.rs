//! Descriptor Loading Service
//! Fetches node, software-package and property descriptors through the
//! abstract file system and translates them into domain entities. Read-only;
//! performs no retries.

use crate::domain::entities::{
    CodeDescriptor, Implementation, Instantiation, NodeDescriptor, OsRequirement, Placement,
    SoftwarePackage,
};
use crate::domain::ports::FileSystem;
use crate::domain::{
    CodeKind, ComponentKind, DomainError, PropertyDef, PropertyKind, PropertyMode, PropertyValue,
    Result,
};
use crate::infrastructure::descriptors::{
    NodeDescriptorDoc, PropertyFileDoc, SoftwarePackageDoc,
};
use std::sync::Arc;
use tracing::{debug, trace};

pub struct DescriptorLoader {
    file_system: Arc<dyn FileSystem>,
}

impl DescriptorLoader {
    pub fn new(file_system: Arc<dyn FileSystem>) -> Self {
        Self { file_system }
    }

    /// Load and translate the node descriptor.
    pub fn load_node_descriptor(&self, path: &str) -> Result<NodeDescriptor> {
        debug!(path = %path, "loading node descriptor");
        let doc: NodeDescriptorDoc = self.parse(path)?;

        let placements = doc
            .placements
            .into_iter()
            .map(|p| Placement {
                package_ref: resolve_ref(path, &p.package),
                composite_part_of: p.composite_part_of,
                instantiations: p
                    .instantiations
                    .into_iter()
                    .map(|inst| Instantiation {
                        usage_name: inst.usage_name.unwrap_or_else(|| inst.id.clone()),
                        overrides: inst
                            .properties
                            .into_iter()
                            .map(|(id, value)| PropertyValue { id, value })
                            .collect(),
                        id: inst.id,
                    })
                    .collect(),
            })
            .collect();

        Ok(NodeDescriptor {
            identifier: doc.id,
            label: doc.name,
            domain_manager_name: doc.domain_manager,
            device_manager_package: doc
                .device_manager_package
                .map(|p| resolve_ref(path, &p)),
            placements,
        })
    }

    /// Load a software package, its property files, and its soft package
    /// dependencies (recursively).
    pub fn load_software_package(&self, path: &str) -> Result<SoftwarePackage> {
        trace!(path = %path, "loading software package");
        let doc: SoftwarePackageDoc = self.parse(path)?;

        let kind = ComponentKind::parse(&doc.kind).map_err(|e| at_path(e, path))?;

        let properties = match &doc.property_file {
            Some(prf) => self.load_properties(&resolve_ref(path, prf))?,
            None => Vec::new(),
        };

        let mut implementations = Vec::with_capacity(doc.implementations.len());
        for impl_doc in doc.implementations {
            let impl_properties = match &impl_doc.property_file {
                Some(prf) => self.load_properties(&resolve_ref(path, prf))?,
                None => Vec::new(),
            };

            let mut dependencies = Vec::with_capacity(impl_doc.dependencies.len());
            for dep_ref in &impl_doc.dependencies {
                dependencies.push(self.load_software_package(&resolve_ref(path, dep_ref))?);
            }

            implementations.push(Implementation {
                id: impl_doc.id,
                code: CodeDescriptor {
                    kind: CodeKind::parse(&impl_doc.code.kind).map_err(|e| at_path(e, path))?,
                    path: resolve_ref(path, &impl_doc.code.path),
                    entry_point: impl_doc.code.entry_point,
                },
                processors: impl_doc.processors,
                os_requirements: impl_doc
                    .os
                    .into_iter()
                    .map(|os| OsRequirement {
                        name: os.name,
                        version: os.version,
                    })
                    .collect(),
                properties: impl_properties,
                dependencies,
            });
        }

        Ok(SoftwarePackage {
            id: doc.id,
            name: doc.name,
            kind,
            descriptor_path: path.to_string(),
            implementations,
            properties,
        })
    }

    /// Load a property descriptor.
    pub fn load_properties(&self, path: &str) -> Result<Vec<PropertyDef>> {
        let doc: PropertyFileDoc = self.parse(path)?;
        doc.properties
            .into_iter()
            .map(|p| {
                Ok(PropertyDef {
                    kind: parse_property_kind(&p.kind, path)?,
                    mode: parse_property_mode(&p.mode, path)?,
                    id: p.id,
                    name: p.name,
                    command_line: p.command_line,
                    value: p.value,
                })
            })
            .collect()
    }

    fn parse<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        if !self.file_system.exists(path)? {
            return Err(DomainError::NotFound(path.to_string()));
        }
        let text = self.file_system.read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|e| DomainError::Parse {
            path: path.to_string(),
            detail: e.to_string(),
        })
    }
}

/// Resolve a reference found inside a descriptor: absolute references are
/// used as-is, relative ones resolve against the containing descriptor's
/// directory.
pub fn resolve_ref(containing: &str, reference: &str) -> String {
    if reference.starts_with('/') {
        return reference.to_string();
    }
    match containing.rfind('/') {
        Some(idx) => format!("{}/{}", &containing[..idx], reference),
        None => reference.to_string(),
    }
}

/// Merge implementation-specific properties over a package-level set. An
/// implementation property with the same id replaces the package one.
pub fn merge_properties(base: &[PropertyDef], extra: &[PropertyDef]) -> Vec<PropertyDef> {
    let mut merged: Vec<PropertyDef> = base
        .iter()
        .filter(|b| !extra.iter().any(|e| e.id == b.id))
        .cloned()
        .collect();
    merged.extend(extra.iter().cloned());
    merged
}

fn parse_property_kind(raw: &str, path: &str) -> Result<PropertyKind> {
    match raw {
        "configure" => Ok(PropertyKind::Configure),
        "construct" => Ok(PropertyKind::Construct),
        "exec" => Ok(PropertyKind::Exec),
        "factory" => Ok(PropertyKind::Factory),
        "allocation" => Ok(PropertyKind::Allocation),
        other => Err(DomainError::Parse {
            path: path.to_string(),
            detail: format!("unknown property kind '{}'", other),
        }),
    }
}

fn parse_property_mode(raw: &str, path: &str) -> Result<PropertyMode> {
    match raw {
        "readonly" => Ok(PropertyMode::ReadOnly),
        "readwrite" => Ok(PropertyMode::ReadWrite),
        "writeonly" => Ok(PropertyMode::WriteOnly),
        other => Err(DomainError::Parse {
            path: path.to_string(),
            detail: format!("unknown property mode '{}'", other),
        }),
    }
}

fn at_path(err: DomainError, path: &str) -> DomainError {
    match err {
        DomainError::Parse { detail, .. } => DomainError::Parse {
            path: path.to_string(),
            detail,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::LocalFileSystem;
    use std::fs;

    fn write(root: &std::path::Path, rel: &str, text: &str) {
        let path = root.join(rel.trim_start_matches('/'));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn loader(root: &std::path::Path) -> DescriptorLoader {
        DescriptorLoader::new(Arc::new(LocalFileSystem::new(root)))
    }

    #[test]
    fn test_resolve_ref() {
        assert_eq!(
            resolve_ref("/nodes/node.dcd.yaml", "/devices/a.spd.yaml"),
            "/devices/a.spd.yaml"
        );
        assert_eq!(
            resolve_ref("/devices/gpp/gpp.spd.yaml", "gpp.prf.yaml"),
            "/devices/gpp/gpp.prf.yaml"
        );
    }

    #[test]
    fn test_merge_properties_prefers_implementation() {
        let base = vec![PropertyDef {
            id: "rate".to_string(),
            name: None,
            kind: PropertyKind::Configure,
            mode: PropertyMode::ReadWrite,
            command_line: false,
            value: Some("10".to_string()),
        }];
        let extra = vec![PropertyDef {
            value: Some("20".to_string()),
            ..base[0].clone()
        }];
        let merged = merge_properties(&base, &extra);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value.as_deref(), Some("20"));
    }

    #[test]
    fn test_load_package_with_relative_refs_and_deps() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "/devices/gpp/gpp.spd.yaml",
            r#"
id: "DCE:gpp"
name: GPP
kind: executabledevice
property_file: gpp.prf.yaml
implementations:
  - id: native
    code:
      kind: executable
      path: bin/gpp
    processors: [x86_64]
    dependencies: [../common/util.spd.yaml]
"#,
        );
        write(
            dir.path(),
            "/devices/gpp/gpp.prf.yaml",
            r#"
properties:
  - id: threshold
    kind: configure
    value: "80"
"#,
        );
        write(
            dir.path(),
            "/devices/common/util.spd.yaml",
            r#"
id: "DCE:util"
name: util
kind: device
implementations:
  - id: lib
    code:
      kind: shared_library
      path: lib/util.so
"#,
        );

        let pkg = loader(dir.path())
            .load_software_package("/devices/gpp/gpp.spd.yaml")
            .unwrap();
        assert_eq!(pkg.kind, ComponentKind::Device);
        assert_eq!(pkg.properties.len(), 1);
        assert_eq!(pkg.implementations[0].code.path, "/devices/gpp/bin/gpp");
        // "../common" collapses through the path join on read
        assert_eq!(pkg.implementations[0].dependencies[0].id, "DCE:util");
    }

    #[test]
    fn test_missing_descriptor_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path())
            .load_node_descriptor("/nodes/missing.dcd.yaml")
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn test_malformed_descriptor_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "/nodes/bad.dcd.yaml", "id: [unclosed");
        let err = loader(dir.path())
            .load_node_descriptor("/nodes/bad.dcd.yaml")
            .unwrap_err();
        assert!(matches!(err, DomainError::Parse { .. }));
    }

    #[test]
    fn test_usage_name_defaults_to_instantiation_id() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "/nodes/n.dcd.yaml",
            r#"
id: "DCE:n"
name: node
domain_manager: DOM/DomainManager
placements:
  - package: /devices/a.spd.yaml
    instantiations:
      - id: A_1
"#,
        );
        let node = loader(dir.path())
            .load_node_descriptor("/nodes/n.dcd.yaml")
            .unwrap();
        assert_eq!(node.placements[0].instantiations[0].usage_name, "A_1");
    }
}
