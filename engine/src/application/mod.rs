pub mod device_manager;

pub use device_manager::{DeviceManager, DeviceManagerConfig};
