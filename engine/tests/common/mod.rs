//! Shared test utilities: mock bus handles and on-disk descriptor trees.
//!
//! Device and service handles here stand in for the children's side of the
//! object bus; tests drive the registration surface with them the way a
//! launched child process would over the wire.

#![allow(dead_code)]

use async_trait::async_trait;
use dm_engine::application::{DeviceManager, DeviceManagerConfig};
use dm_engine::domain::ports::{BusError, DeviceHandle, ServiceHandle};
use dm_engine::domain::services::ChildExit;
use dm_engine::domain::PropertyValue;
use dm_engine::infrastructure::{
    InMemoryDomainManager, InMemoryNaming, LocalFileSystem, TokioProcessExecutor,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct MockDevice {
    pub identifier: String,
    pub label: String,
    pub ior: String,
    pub fail_initialize_properties: bool,
    pub fail_initialize: bool,
    pub fail_configure: bool,
    pub received_construct: Mutex<Vec<PropertyValue>>,
    pub received_configure: Mutex<Vec<PropertyValue>>,
    pub initialized: AtomicBool,
    pub released: AtomicBool,
}

impl MockDevice {
    pub fn new(identifier: &str, label: &str) -> Arc<Self> {
        Self::with_failures(identifier, label, false, false, false)
    }

    pub fn failing_configure(identifier: &str, label: &str) -> Arc<Self> {
        Self::with_failures(identifier, label, false, false, true)
    }

    pub fn failing_initialize(identifier: &str, label: &str) -> Arc<Self> {
        Self::with_failures(identifier, label, false, true, false)
    }

    fn with_failures(
        identifier: &str,
        label: &str,
        fail_initialize_properties: bool,
        fail_initialize: bool,
        fail_configure: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            identifier: identifier.to_string(),
            label: label.to_string(),
            ior: format!("ior:device:{}", identifier),
            fail_initialize_properties,
            fail_initialize,
            fail_configure,
            received_construct: Mutex::new(Vec::new()),
            received_configure: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
            released: AtomicBool::new(false),
        })
    }

    pub fn as_handle(self: &Arc<Self>) -> Arc<dyn DeviceHandle> {
        self.clone()
    }
}

#[async_trait]
impl DeviceHandle for MockDevice {
    fn ior(&self) -> String {
        self.ior.clone()
    }

    async fn identifier(&self) -> Result<String, BusError> {
        Ok(self.identifier.clone())
    }

    async fn label(&self) -> Result<String, BusError> {
        Ok(self.label.clone())
    }

    async fn software_profile(&self) -> Result<String, BusError> {
        Ok(String::new())
    }

    async fn initialize_properties(&self, props: &[PropertyValue]) -> Result<(), BusError> {
        if self.fail_initialize_properties {
            return Err(BusError::Comm("invalid configuration".to_string()));
        }
        self.received_construct.lock().unwrap().extend_from_slice(props);
        Ok(())
    }

    async fn initialize(&self) -> Result<(), BusError> {
        if self.fail_initialize {
            return Err(BusError::Comm("initialize error".to_string()));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn configure(&self, props: &[PropertyValue]) -> Result<(), BusError> {
        if self.fail_configure {
            return Err(BusError::Comm("partial configuration".to_string()));
        }
        self.received_configure.lock().unwrap().extend_from_slice(props);
        Ok(())
    }

    async fn release_object(&self) -> Result<(), BusError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockService {
    pub ior: String,
}

impl MockService {
    pub fn new(ior: &str) -> Arc<Self> {
        Arc::new(Self {
            ior: ior.to_string(),
        })
    }

    pub fn as_handle(self: &Arc<Self>) -> Arc<dyn ServiceHandle> {
        self.clone()
    }
}

impl ServiceHandle for MockService {
    fn ior(&self) -> String {
        self.ior.clone()
    }
}

/// Write one file under the domain file system root.
pub fn write_file(root: &Path, fs_path: &str, text: &str) {
    let path = root.join(fs_path.trim_start_matches('/'));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// Place an executable at a file-system path, as a symlink to a real binary
/// or an executable script.
pub fn install_executable(root: &Path, fs_path: &str, target: &str) {
    let path = root.join(fs_path.trim_start_matches('/'));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink(target, path).unwrap();
}

pub fn install_script(root: &Path, fs_path: &str, script: &str) {
    use std::os::unix::fs::PermissionsExt;
    let path = root.join(fs_path.trim_start_matches('/'));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// The device manager's own package; every node descriptor references one.
pub fn write_devmgr_package(root: &Path) {
    write_file(
        root,
        "/nodes/test/devmgr.spd.yaml",
        r#"
id: "DCE:test-devmgr"
name: test_devmgr
kind: device
implementations:
  - id: native
    code:
      kind: executable
      path: /bin/true
"#,
    );
}

pub struct TestNode {
    pub manager: Arc<DeviceManager>,
    pub naming: Arc<InMemoryNaming>,
    pub dom_mgr: Arc<InMemoryDomainManager>,
    pub exit_rx: Option<UnboundedReceiver<ChildExit>>,
}

/// Build a device manager over a descriptor tree rooted at `root`, wired to
/// the in-memory bus and the real process executor.
pub fn test_node(root: &Path, dcd_file: &str, force_quit_sec: f64) -> TestNode {
    let naming = Arc::new(InMemoryNaming::new());
    let dom_mgr = Arc::new(InMemoryDomainManager::new());

    let config = DeviceManagerConfig {
        dcd_file: dcd_file.to_string(),
        cache_root: root.join("cache").to_str().unwrap().to_string(),
        devmgr_ior: "ior:devmgr:test".to_string(),
        force_quit_sec,
        ..DeviceManagerConfig::default()
    };

    let (manager, exit_rx) = DeviceManager::new(
        config,
        Arc::new(LocalFileSystem::new(root)),
        naming.clone(),
        Arc::new(TokioProcessExecutor::new()),
    )
    .expect("device manager construction failed");

    naming.publish_domain_manager(manager.domain_name(), dom_mgr.clone());

    TestNode {
        manager,
        naming,
        dom_mgr,
        exit_rx: Some(exit_rx),
    }
}

impl TestNode {
    /// Start the reap loop the daemon would normally run.
    pub fn spawn_reaper(&mut self) {
        let rx = self.exit_rx.take().expect("reaper already spawned");
        tokio::spawn(self.manager.clone().reap_loop(rx));
    }
}
