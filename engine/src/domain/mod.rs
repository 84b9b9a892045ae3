pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{
    Deployment, DeviceNode, DeviceSnapshot, HostCapabilities, Implementation, Instantiation,
    NodeDescriptor, Placement, ProgramProfile, ServiceNode, ServiceSnapshot, SoftwarePackage,
};
pub use error::{DomainError, Result};
pub use value_objects::{
    AdminState, CodeKind, ComponentKind, ComponentType, PropertyDef, PropertyKind, PropertyMode,
    PropertyValue,
};
