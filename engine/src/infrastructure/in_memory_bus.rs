//! In-memory object bus
//! Single-process implementation of the bus ports: a naming directory, a
//! recording domain manager, and an event channel broker. Stands in for the
//! production bus adapter during single-node bring-up and in tests.

use crate::domain::ports::{
    BusError, DomainManager, EventChannelManager, NamingContext,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Default)]
pub struct InMemoryNaming {
    bindings: Mutex<HashMap<String, String>>,
    domain_managers: Mutex<HashMap<String, Arc<dyn DomainManager>>>,
}

impl InMemoryNaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a domain manager resolvable under `name`.
    pub fn publish_domain_manager(&self, name: &str, dom_mgr: Arc<dyn DomainManager>) {
        self.domain_managers
            .lock()
            .unwrap()
            .insert(name.to_string(), dom_mgr);
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        self.bindings.lock().unwrap().get(name).cloned()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.lock().unwrap().len()
    }
}

#[async_trait]
impl NamingContext for InMemoryNaming {
    async fn resolve_domain_manager(
        &self,
        name: &str,
    ) -> Result<Arc<dyn DomainManager>, BusError> {
        self.domain_managers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| BusError::NotFound(name.to_string()))
    }

    async fn resolve_event_channel(&self, name: &str) -> Result<String, BusError> {
        self.lookup(name)
            .ok_or_else(|| BusError::NotFound(name.to_string()))
    }

    async fn bind(&self, name: &str, ior: &str) -> Result<(), BusError> {
        let mut bindings = self.bindings.lock().unwrap();
        if bindings.contains_key(name) {
            return Err(BusError::AlreadyBound(name.to_string()));
        }
        debug!(name = %name, "binding name");
        bindings.insert(name.to_string(), ior.to_string());
        Ok(())
    }

    async fn rebind(&self, name: &str, ior: &str) -> Result<(), BusError> {
        debug!(name = %name, "rebinding name");
        self.bindings
            .lock()
            .unwrap()
            .insert(name.to_string(), ior.to_string());
        Ok(())
    }

    async fn unbind(&self, name: &str) -> Result<(), BusError> {
        match self.bindings.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(BusError::NotFound(name.to_string())),
        }
    }
}

/// Records every registration it accepts; the assertions in tests read the
/// recorded state back.
#[derive(Default)]
pub struct InMemoryDomainManager {
    device_managers: Mutex<Vec<String>>,
    devices: Mutex<Vec<String>>,
    services: Mutex<Vec<(String, String)>>,
    broker: Option<Arc<InMemoryEventChannelManager>>,
}

impl InMemoryDomainManager {
    pub fn new() -> Self {
        Self {
            broker: Some(Arc::new(InMemoryEventChannelManager::default())),
            ..Self::default()
        }
    }

    pub fn registered_device_managers(&self) -> Vec<String> {
        self.device_managers.lock().unwrap().clone()
    }

    pub fn registered_devices(&self) -> Vec<String> {
        self.devices.lock().unwrap().clone()
    }

    pub fn registered_services(&self) -> Vec<(String, String)> {
        self.services.lock().unwrap().clone()
    }
}

#[async_trait]
impl DomainManager for InMemoryDomainManager {
    async fn register_device_manager(&self, devmgr_ior: &str) -> Result<(), BusError> {
        self.device_managers
            .lock()
            .unwrap()
            .push(devmgr_ior.to_string());
        Ok(())
    }

    async fn unregister_device_manager(&self, devmgr_ior: &str) -> Result<(), BusError> {
        self.device_managers
            .lock()
            .unwrap()
            .retain(|ior| ior != devmgr_ior);
        Ok(())
    }

    async fn register_device(&self, device_ior: &str, _devmgr_ior: &str) -> Result<(), BusError> {
        self.devices.lock().unwrap().push(device_ior.to_string());
        Ok(())
    }

    async fn unregister_device(&self, device_ior: &str) -> Result<(), BusError> {
        self.devices.lock().unwrap().retain(|ior| ior != device_ior);
        Ok(())
    }

    async fn register_service(
        &self,
        service_ior: &str,
        _devmgr_ior: &str,
        name: &str,
    ) -> Result<(), BusError> {
        self.services
            .lock()
            .unwrap()
            .push((name.to_string(), service_ior.to_string()));
        Ok(())
    }

    async fn unregister_service(&self, _service_ior: &str, name: &str) -> Result<(), BusError> {
        self.services.lock().unwrap().retain(|(n, _)| n != name);
        Ok(())
    }

    async fn event_channel_manager(&self) -> Result<Arc<dyn EventChannelManager>, BusError> {
        match &self.broker {
            Some(broker) => Ok(broker.clone()),
            None => Err(BusError::NotFound("event channel manager".to_string())),
        }
    }
}

#[derive(Default)]
pub struct InMemoryEventChannelManager {
    registrations: Mutex<HashMap<String, String>>,
}

impl InMemoryEventChannelManager {
    pub fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }
}

#[async_trait]
impl EventChannelManager for InMemoryEventChannelManager {
    async fn register_resource(&self, channel: &str) -> Result<String, BusError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.registrations
            .lock()
            .unwrap()
            .insert(id.clone(), channel.to_string());
        Ok(id)
    }

    async fn unregister(&self, registration_id: &str) -> Result<(), BusError> {
        match self.registrations.lock().unwrap().remove(registration_id) {
            Some(_) => Ok(()),
            None => Err(BusError::NotFound(registration_id.to_string())),
        }
    }
}
