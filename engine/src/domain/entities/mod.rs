pub mod deployment;
pub mod descriptor;
pub mod device_node;
pub mod software_package;

pub use deployment::{Deployment, ProgramProfile};
pub use descriptor::{Instantiation, NodeDescriptor, Placement};
pub use device_node::{DeviceNode, DeviceSnapshot, ServiceNode, ServiceSnapshot};
pub use software_package::{
    CodeDescriptor, HostCapabilities, Implementation, OsRequirement, SoftwarePackage,
};
