pub mod file_system;
pub mod object_bus;
pub mod process_executor;

pub use file_system::FileSystem;
pub use object_bus::{
    BusError, DeviceHandle, DomainManager, EventChannelManager, NamingContext, ServiceHandle,
};
pub use process_executor::{
    ChildExitStatus, ProcessExecutor, ProcessExitHandle, SpawnConfig, SpawnResult,
};
