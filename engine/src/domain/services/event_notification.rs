//! Event Notification Service
//! Registers this node with the domain's identity-monitoring event stream
//! and tears the registration down on shutdown. The channel is an optional
//! facility: a node without it still deploys.

use crate::domain::constants::IDM_CHANNEL_NAME;
use crate::domain::ports::{DomainManager, EventChannelManager, NamingContext};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

enum IdmRegistration {
    None,
    /// Registered through the event channel broker
    Broker {
        manager: Arc<dyn EventChannelManager>,
        registration_id: String,
    },
    /// Fallback: direct naming-tree lookup of the channel reference
    Direct(String),
}

pub struct EventNotificationService {
    naming: Arc<dyn NamingContext>,
    registration: Mutex<IdmRegistration>,
}

impl EventNotificationService {
    pub fn new(naming: Arc<dyn NamingContext>) -> Self {
        Self {
            naming,
            registration: Mutex::new(IdmRegistration::None),
        }
    }

    /// Register for the identity channel: broker first, then a direct
    /// naming lookup; on both failing, log and continue without it.
    pub async fn register(&self, dom_mgr: &Arc<dyn DomainManager>) {
        match dom_mgr.event_channel_manager().await {
            Ok(manager) => match manager.register_resource(IDM_CHANNEL_NAME).await {
                Ok(registration_id) => {
                    debug!(
                        channel = IDM_CHANNEL_NAME,
                        registration = %registration_id,
                        "registered with event channel broker"
                    );
                    *self.registration.lock().unwrap() = IdmRegistration::Broker {
                        manager,
                        registration_id,
                    };
                    return;
                }
                Err(e) => {
                    warn!(channel = IDM_CHANNEL_NAME, error = %e, "event channel broker registration failed");
                }
            },
            Err(e) => {
                debug!(error = %e, "no event channel broker available");
            }
        }

        match self.naming.resolve_event_channel(IDM_CHANNEL_NAME).await {
            Ok(ior) => {
                debug!(channel = IDM_CHANNEL_NAME, "connected to event channel via naming tree");
                *self.registration.lock().unwrap() = IdmRegistration::Direct(ior);
            }
            Err(_) => {
                info!(
                    channel = IDM_CHANNEL_NAME,
                    "identity channel not found; continuing without it"
                );
            }
        }
    }

    /// Best-effort teardown; errors are logged and swallowed.
    pub async fn unregister(&self) {
        let registration = {
            let mut guard = self.registration.lock().unwrap();
            std::mem::replace(&mut *guard, IdmRegistration::None)
        };
        match registration {
            IdmRegistration::Broker {
                manager,
                registration_id,
            } => {
                info!(
                    channel = IDM_CHANNEL_NAME,
                    registration = %registration_id,
                    "unregistering from event channel"
                );
                if let Err(e) = manager.unregister(&registration_id).await {
                    warn!(error = %e, "event channel unregister failed");
                }
            }
            IdmRegistration::Direct(ior) => {
                debug!(channel_ior = %ior, "dropping direct event channel reference");
            }
            IdmRegistration::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::BusError;
    use async_trait::async_trait;
    use std::result::Result as StdResult;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubBroker {
        unregistered: AtomicBool,
    }

    #[async_trait]
    impl EventChannelManager for StubBroker {
        async fn register_resource(&self, _channel: &str) -> StdResult<String, BusError> {
            Ok("reg-1".to_string())
        }
        async fn unregister(&self, _registration_id: &str) -> StdResult<(), BusError> {
            self.unregistered.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StubDomainManager {
        broker: Option<Arc<StubBroker>>,
    }

    #[async_trait]
    impl DomainManager for StubDomainManager {
        async fn register_device_manager(&self, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn unregister_device_manager(&self, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn register_device(&self, _: &str, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn unregister_device(&self, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn register_service(&self, _: &str, _: &str, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn unregister_service(&self, _: &str, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn event_channel_manager(
            &self,
        ) -> StdResult<Arc<dyn EventChannelManager>, BusError> {
            match &self.broker {
                Some(broker) => Ok(broker.clone()),
                None => Err(BusError::NotFound("no broker".to_string())),
            }
        }
    }

    struct NoChannelNaming;

    #[async_trait]
    impl NamingContext for NoChannelNaming {
        async fn resolve_domain_manager(
            &self,
            name: &str,
        ) -> StdResult<Arc<dyn DomainManager>, BusError> {
            Err(BusError::NotFound(name.to_string()))
        }
        async fn resolve_event_channel(&self, name: &str) -> StdResult<String, BusError> {
            Err(BusError::NotFound(name.to_string()))
        }
        async fn bind(&self, _: &str, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn rebind(&self, _: &str, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
        async fn unbind(&self, _: &str) -> StdResult<(), BusError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_and_unregister_through_broker() {
        let broker = Arc::new(StubBroker {
            unregistered: AtomicBool::new(false),
        });
        let dom_mgr: Arc<dyn DomainManager> = Arc::new(StubDomainManager {
            broker: Some(broker.clone()),
        });
        let service = EventNotificationService::new(Arc::new(NoChannelNaming));

        service.register(&dom_mgr).await;
        service.unregister().await;
        assert!(broker.unregistered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_channel_is_not_fatal() {
        let dom_mgr: Arc<dyn DomainManager> = Arc::new(StubDomainManager { broker: None });
        let service = EventNotificationService::new(Arc::new(NoChannelNaming));

        // No broker, no naming entry; the node continues without the channel
        service.register(&dom_mgr).await;
        service.unregister().await;
    }
}
