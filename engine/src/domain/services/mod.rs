pub mod cache_directory;
pub mod capability_matching;
pub mod child_watching;
pub mod deployment_planning;
pub mod descriptor_loading;
pub mod device_launching;
pub mod device_registry;
pub mod event_notification;
pub mod federation;

pub use cache_directory::make_directory;
pub use capability_matching::{
    match_implementation, resolve_softpkg_dependencies, MatchedDependency,
};
pub use child_watching::{ChildExit, ChildWatchingService};
pub use deployment_planning::{plan, DeploymentPlan, DroppedPlacement, PlannedPlacement};
pub use descriptor_loading::DescriptorLoader;
pub use device_launching::DeviceLauncher;
pub use device_registry::{DeviceRegistry, ReapedNode};
pub use event_notification::EventNotificationService;
pub use federation::FederationService;
