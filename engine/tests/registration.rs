//! Registration-surface tests: the register/unregister contracts, the
//! initialization protocol, and shutdown idempotence, driven over the
//! in-memory bus with mock child handles.

mod common;

use common::{
    install_script, test_node, write_devmgr_package, write_file, MockDevice, MockService,
};
use dm_engine::domain::{AdminState, DomainError};

const KEEPALIVE: &str = "#!/bin/sh\nexec sleep 60\n";

fn write_plain_node(root: &std::path::Path) {
    write_devmgr_package(root);
    write_file(
        root,
        "/nodes/test/node.dcd.yaml",
        r#"
id: "DCE:test-node"
name: DevMgr_test
domain_manager: TEST_DOM/DomainManager
device_manager_package: /nodes/test/devmgr.spd.yaml
placements: []
"#,
    );
}

fn write_node_with_device(root: &std::path::Path) {
    write_devmgr_package(root);
    write_file(
        root,
        "/nodes/test/node.dcd.yaml",
        r#"
id: "DCE:test-node"
name: DevMgr_test
domain_manager: TEST_DOM/DomainManager
device_manager_package: /nodes/test/devmgr.spd.yaml
placements:
  - package: /devices/sleeper/sleeper.spd.yaml
    instantiations:
      - id: DEV_1
        usage_name: dev_one
        properties:
          rate: "44"
"#,
    );
    write_file(
        root,
        "/devices/sleeper/sleeper.spd.yaml",
        r#"
id: "DCE:sleeper"
name: sleeper
kind: executabledevice
property_file: sleeper.prf.yaml
implementations:
  - id: native
    code:
      kind: executable
      path: bin/sleeper
"#,
    );
    write_file(
        root,
        "/devices/sleeper/sleeper.prf.yaml",
        r#"
properties:
  - id: mode
    kind: construct
    value: fast
  - id: rate
    kind: configure
    value: "10"
  - id: nil_prop
    kind: configure
"#,
    );
    install_script(root, "/devices/sleeper/bin/sleeper", KEEPALIVE);
}

#[tokio::test]
async fn test_register_nil_device_is_invalid_ref() {
    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());
    let node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);

    let result = node.manager.register_device(None).await;
    assert!(matches!(result, Err(DomainError::InvalidRef(_))));
}

#[tokio::test]
async fn test_register_unregister_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());
    let node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.manager.post_construct().await.unwrap();
    assert_eq!(node.manager.admin_state(), AdminState::Registered);

    let device = MockDevice::new("ext-1", "ext_one");
    node.manager
        .register_device(Some(device.as_handle()))
        .await
        .unwrap();

    assert_eq!(node.manager.registered_devices().len(), 1);
    assert!(node.manager.device_is_registered(&device.as_handle()));
    // local bind happened before the domain forward
    assert_eq!(node.naming.lookup("ext_one").as_deref(), Some("ior:device:ext-1"));
    assert_eq!(node.dom_mgr.registered_devices(), vec!["ior:device:ext-1"]);

    node.manager
        .unregister_device(Some(device.as_handle()))
        .await
        .unwrap();

    // externally launched device: no pid, so nothing lingers in pending
    assert!(node.manager.all_children_exited());
    assert!(node.naming.lookup("ext_one").is_none());
    assert!(node.dom_mgr.registered_devices().is_empty());
}

#[tokio::test]
async fn test_double_register_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());
    let node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.manager.post_construct().await.unwrap();

    let device = MockDevice::new("ext-1", "ext_one");
    node.manager
        .register_device(Some(device.as_handle()))
        .await
        .unwrap();
    node.manager
        .register_device(Some(device.as_handle()))
        .await
        .unwrap();

    assert_eq!(node.manager.registered_devices().len(), 1);
    assert_eq!(node.dom_mgr.registered_devices().len(), 1);
}

#[tokio::test]
async fn test_unregister_unknown_device_is_invalid_ref() {
    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());
    let node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.manager.post_construct().await.unwrap();

    let device = MockDevice::new("stranger", "stranger");
    let result = node.manager.unregister_device(Some(device.as_handle())).await;
    assert!(matches!(result, Err(DomainError::InvalidRef(_))));
}

#[tokio::test]
async fn test_initialization_protocol_applies_profile_properties() {
    let dir = tempfile::tempdir().unwrap();
    write_node_with_device(dir.path());
    let mut node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.spawn_reaper();
    node.manager.post_construct().await.unwrap();

    // The launched child is pending with a live pid
    assert_eq!(node.manager.registry().counts().0, 1);

    let device = MockDevice::new("DEV_1", "dev_one");
    node.manager
        .register_device(Some(device.as_handle()))
        .await
        .unwrap();

    assert!(device.initialized.load(std::sync::atomic::Ordering::SeqCst));
    let construct = device.received_construct.lock().unwrap().clone();
    assert_eq!(construct.len(), 1);
    assert_eq!(construct[0].id, "mode");

    // instance override wins, the nil property never crosses the wire
    let configure = device.received_configure.lock().unwrap().clone();
    assert_eq!(configure.len(), 1);
    assert_eq!(configure[0].id, "rate");
    assert_eq!(configure[0].value, "44");

    // the pending node moved to registered, keeping its pid
    assert_eq!(node.manager.registry().counts(), (0, 1, 0, 0));
    assert_eq!(node.manager.registry().registered_device_pids().len(), 1);
    assert_eq!(
        node.manager.get_component_implementation_id("DEV_1"),
        "native"
    );

    node.manager.shutdown().await;
    assert!(node.manager.all_children_exited());
}

#[tokio::test]
async fn test_configure_failure_rejects_registration() {
    let dir = tempfile::tempdir().unwrap();
    write_node_with_device(dir.path());
    let mut node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.spawn_reaper();
    node.manager.post_construct().await.unwrap();

    let device = MockDevice::failing_configure("DEV_1", "dev_one");
    let result = node.manager.register_device(Some(device.as_handle())).await;
    assert!(matches!(result, Err(DomainError::InvalidRef(_))));

    // The half-initialized device is not retained anywhere
    assert!(node.manager.registered_devices().is_empty());
    assert!(node.naming.lookup("dev_one").is_none());
    assert!(node.dom_mgr.registered_devices().is_empty());

    node.manager.shutdown().await;
}

#[tokio::test]
async fn test_initialize_failure_rejects_registration() {
    let dir = tempfile::tempdir().unwrap();
    write_node_with_device(dir.path());
    let mut node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.spawn_reaper();
    node.manager.post_construct().await.unwrap();

    let device = MockDevice::failing_initialize("DEV_1", "dev_one");
    let result = node.manager.register_device(Some(device.as_handle())).await;
    assert!(matches!(result, Err(DomainError::InvalidRef(_))));
    assert!(node.manager.registered_devices().is_empty());

    node.manager.shutdown().await;
}

#[tokio::test]
async fn test_service_round_trip_and_rebind_displacement() {
    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());
    let node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.manager.post_construct().await.unwrap();

    let first = MockService::new("ior:svc:1");
    let second = MockService::new("ior:svc:2");

    node.manager
        .register_service(Some(first.as_handle()), "logger")
        .await
        .unwrap();
    assert_eq!(node.manager.registered_services().len(), 1);
    assert_eq!(node.naming.lookup("logger").as_deref(), Some("ior:svc:1"));

    // same name, different handle: the naming entry rebinds and the
    // registry keeps the latest handle
    node.manager
        .register_service(Some(second.as_handle()), "logger")
        .await
        .unwrap();
    let services = node.manager.registered_services();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].1.ior(), "ior:svc:2");
    assert_eq!(node.naming.lookup("logger").as_deref(), Some("ior:svc:2"));

    node.manager
        .unregister_service(Some(second.as_handle()), "logger")
        .await
        .unwrap();
    assert!(node.manager.registered_services().is_empty());
    assert!(node.naming.lookup("logger").is_none());

    let result = node
        .manager
        .unregister_service(Some(second.as_handle()), "logger")
        .await;
    assert!(matches!(result, Err(DomainError::InvalidRef(_))));
}

#[tokio::test]
async fn test_service_forward_failure_reverses_local_registration() {
    use async_trait::async_trait;
    use dm_engine::application::{DeviceManager, DeviceManagerConfig};
    use dm_engine::domain::ports::{BusError, DomainManager, EventChannelManager};
    use dm_engine::infrastructure::{InMemoryNaming, LocalFileSystem, TokioProcessExecutor};
    use std::sync::Arc;

    struct ServiceRejectingDomainManager;

    #[async_trait]
    impl DomainManager for ServiceRejectingDomainManager {
        async fn register_device_manager(&self, _: &str) -> Result<(), BusError> {
            Ok(())
        }
        async fn unregister_device_manager(&self, _: &str) -> Result<(), BusError> {
            Ok(())
        }
        async fn register_device(&self, _: &str, _: &str) -> Result<(), BusError> {
            Ok(())
        }
        async fn unregister_device(&self, _: &str) -> Result<(), BusError> {
            Ok(())
        }
        async fn register_service(&self, _: &str, _: &str, _: &str) -> Result<(), BusError> {
            Err(BusError::Rejected("service quota exceeded".to_string()))
        }
        async fn unregister_service(&self, _: &str, _: &str) -> Result<(), BusError> {
            Ok(())
        }
        async fn event_channel_manager(
            &self,
        ) -> Result<Arc<dyn EventChannelManager>, BusError> {
            Err(BusError::NotFound("no broker".to_string()))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());

    let naming = Arc::new(InMemoryNaming::new());
    naming.publish_domain_manager("TEST_DOM/DomainManager", Arc::new(ServiceRejectingDomainManager));

    let config = DeviceManagerConfig {
        dcd_file: "/nodes/test/node.dcd.yaml".to_string(),
        cache_root: dir.path().join("cache").to_str().unwrap().to_string(),
        devmgr_ior: "ior:devmgr:test".to_string(),
        force_quit_sec: 0.2,
        ..DeviceManagerConfig::default()
    };
    let (manager, _exit_rx) = DeviceManager::new(
        config,
        Arc::new(LocalFileSystem::new(dir.path())),
        naming.clone(),
        Arc::new(TokioProcessExecutor::new()),
    )
    .unwrap();
    manager.post_construct().await.unwrap();

    let service = MockService::new("ior:svc:1");
    let result = manager
        .register_service(Some(service.as_handle()), "logger")
        .await;
    assert!(result.is_err());

    // reversal: neither the naming tree nor the registry kept the service
    assert!(naming.lookup("logger").is_none());
    assert!(manager.registered_services().is_empty());
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());
    let node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.manager.post_construct().await.unwrap();

    let device = MockDevice::new("ext-1", "ext_one");
    node.manager
        .register_device(Some(device.as_handle()))
        .await
        .unwrap();

    node.manager.shutdown().await;
    assert_eq!(node.manager.admin_state(), AdminState::Shutdown);
    assert!(node.manager.all_children_exited());
    assert!(node.dom_mgr.registered_device_managers().is_empty());
    // the node's own context is gone from the naming tree
    assert!(node.naming.lookup("DevMgr_test").is_none());

    node.manager.shutdown().await;
    assert_eq!(node.manager.admin_state(), AdminState::Shutdown);
    assert!(node.manager.all_children_exited());
}

#[tokio::test]
async fn test_registrations_ignored_after_shutdown_begins() {
    let dir = tempfile::tempdir().unwrap();
    write_plain_node(dir.path());
    let node = test_node(dir.path(), "/nodes/test/node.dcd.yaml", 0.2);
    node.manager.post_construct().await.unwrap();
    node.manager.shutdown().await;

    let device = MockDevice::new("late", "late");
    node.manager
        .register_device(Some(device.as_handle()))
        .await
        .unwrap();
    assert!(node.manager.registered_devices().is_empty());
}
