pub mod descriptors;
pub mod in_memory_bus;
pub mod local_file_system;
pub mod tokio_executor;

pub use in_memory_bus::{InMemoryDomainManager, InMemoryEventChannelManager, InMemoryNaming};
pub use local_file_system::LocalFileSystem;
pub use tokio_executor::TokioProcessExecutor;
