//! Domain Manager Federation Service
//! Connects this node to the domain manager and registers it, surviving a
//! domain manager that is unreachable, still constructing, or restarting.
//! Every wait here is interruptible: the shutdown token turns a retry loop
//! into an `Interrupted` error.

use crate::domain::constants::{
    DOMAIN_CONNECT_RETRY_MS, DOMAIN_REGISTER_RETRY_MS, REGISTER_RETRY_WARN_EVERY,
};
use crate::domain::ports::{BusError, DomainManager, NamingContext};
use crate::domain::{DomainError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

pub struct FederationService {
    naming: Arc<dyn NamingContext>,
    shutdown: CancellationToken,
    client_wait_ms: u64,
}

impl FederationService {
    pub fn new(
        naming: Arc<dyn NamingContext>,
        shutdown: CancellationToken,
        client_wait_ms: u64,
    ) -> Self {
        Self {
            naming,
            shutdown,
            client_wait_ms,
        }
    }

    /// Resolve the domain manager from the naming tree, retrying until it
    /// appears. Warns once after the first miss rather than on every
    /// attempt. Established references get bounded blocking and one
    /// communication-failure retry.
    pub async fn connect(&self, name: &str) -> Result<Arc<dyn DomainManager>> {
        info!(domain_manager = %name, "connecting to domain manager");
        let mut warned = false;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(DomainError::Interrupted(
                    "waiting to look up domain manager in the naming tree".to_string(),
                ));
            }

            match self.naming.resolve_domain_manager(name).await {
                Ok(dom_mgr) => {
                    dom_mgr.set_call_policy(self.client_wait_ms, 1);
                    trace!(domain_manager = %name, "domain manager resolved");
                    return Ok(dom_mgr);
                }
                Err(BusError::NotFound(_)) => {
                    if !warned {
                        warned = true;
                        warn!(
                            domain_manager = %name,
                            "domain manager not registered with the naming tree; retrying"
                        );
                    }
                }
                Err(e) => {
                    error!(domain_manager = %name, error = %e, "domain manager lookup failed");
                    return Err(e.into());
                }
            }

            tokio::time::sleep(Duration::from_millis(DOMAIN_CONNECT_RETRY_MS)).await;
        }
    }

    /// Register this device manager with the domain manager. Transient
    /// failures (unreachable peer, peer still constructing) retry
    /// indefinitely with a warning every ten attempts; a true registration
    /// rejection is fatal.
    pub async fn register_device_manager(
        &self,
        dom_mgr: &Arc<dyn DomainManager>,
        devmgr_ior: &str,
    ) -> Result<()> {
        let mut attempts: u64 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(DomainError::Interrupted(
                    "waiting to register with domain manager".to_string(),
                ));
            }

            attempts += 1;
            match dom_mgr.register_device_manager(devmgr_ior).await {
                Ok(()) => {
                    info!(attempts = attempts, "registered with domain manager");
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    if attempts % REGISTER_RETRY_WARN_EVERY == 0 {
                        warn!(
                            attempts = attempts,
                            error = %e,
                            "domain manager not available; retrying registration"
                        );
                    }
                }
                Err(BusError::Rejected(msg)) => {
                    error!(error = %msg, "domain manager rejected registration");
                    return Err(DomainError::RemoteFatal(msg));
                }
                Err(e) => {
                    error!(error = %e, "failed to register with domain manager");
                    return Err(e.into());
                }
            }

            tokio::time::sleep(Duration::from_millis(DOMAIN_REGISTER_RETRY_MS)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::EventChannelManager;
    use async_trait::async_trait;
    use std::result::Result as StdResult;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FlakyDomainManager {
        failures_left: AtomicU32,
        registered: Mutex<Vec<String>>,
        reject: bool,
    }

    impl FlakyDomainManager {
        fn new(failures: u32, reject: bool) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                registered: Mutex::new(Vec::new()),
                reject,
            }
        }
    }

    #[async_trait]
    impl DomainManager for FlakyDomainManager {
        async fn register_device_manager(&self, devmgr_ior: &str) -> StdResult<(), BusError> {
            if self.reject {
                return Err(BusError::Rejected("duplicate device manager".to_string()));
            }
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(BusError::Transient("still starting".to_string()));
            }
            self.registered.lock().unwrap().push(devmgr_ior.to_string());
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
            Err(BusError::NotFound("no broker".to_string()))
        }
    }

    struct LateNaming {
        misses_left: AtomicU32,
        dom_mgr: Arc<dyn DomainManager>,
    }

    #[async_trait]
    impl NamingContext for LateNaming {
        async fn resolve_domain_manager(
            &self,
            _name: &str,
        ) -> StdResult<Arc<dyn DomainManager>, BusError> {
            let left = self.misses_left.load(Ordering::SeqCst);
            if left > 0 {
                self.misses_left.store(left - 1, Ordering::SeqCst);
                return Err(BusError::NotFound("not bound yet".to_string()));
            }
            Ok(self.dom_mgr.clone())
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

    fn federation(naming: Arc<dyn NamingContext>, token: CancellationToken) -> FederationService {
        FederationService::new(naming, token, 10_000)
    }

    #[tokio::test]
    async fn test_connect_retries_until_bound() {
        let dom_mgr = Arc::new(FlakyDomainManager::new(0, false));
        let naming = Arc::new(LateNaming {
            misses_left: AtomicU32::new(5),
            dom_mgr: dom_mgr.clone(),
        });
        let service = federation(naming, CancellationToken::new());
        let resolved = service.connect("DOM/DomainManager").await;
        assert!(resolved.is_ok());
    }

    #[tokio::test]
    async fn test_connect_interrupted_by_shutdown() {
        let dom_mgr = Arc::new(FlakyDomainManager::new(0, false));
        let naming = Arc::new(LateNaming {
            misses_left: AtomicU32::new(u32::MAX),
            dom_mgr,
        });
        let token = CancellationToken::new();
        let service = federation(naming, token.clone());

        let task = tokio::spawn(async move { service.connect("DOM/DomainManager").await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(DomainError::Interrupted(_))));
    }

    #[tokio::test]
    async fn test_register_retries_transient_failures() {
        let dom_mgr = Arc::new(FlakyDomainManager::new(12, false));
        let naming = Arc::new(LateNaming {
            misses_left: AtomicU32::new(0),
            dom_mgr: dom_mgr.clone(),
        });
        let service = federation(naming, CancellationToken::new());

        let handle: Arc<dyn DomainManager> = dom_mgr.clone();
        service
            .register_device_manager(&handle, "ior:devmgr")
            .await
            .unwrap();
        assert_eq!(dom_mgr.registered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_rejection_is_fatal() {
        let dom_mgr = Arc::new(FlakyDomainManager::new(0, true));
        let naming = Arc::new(LateNaming {
            misses_left: AtomicU32::new(0),
            dom_mgr: dom_mgr.clone(),
        });
        let service = federation(naming, CancellationToken::new());

        let handle: Arc<dyn DomainManager> = dom_mgr;
        let result = service.register_device_manager(&handle, "ior:devmgr").await;
        assert!(matches!(result, Err(DomainError::RemoteFatal(_))));
    }

    #[tokio::test]
    async fn test_register_interrupted_mid_retry() {
        let dom_mgr = Arc::new(FlakyDomainManager::new(u32::MAX, false));
        let naming = Arc::new(LateNaming {
            misses_left: AtomicU32::new(0),
            dom_mgr: dom_mgr.clone(),
        });
        let token = CancellationToken::new();
        let service = federation(naming, token.clone());

        let handle: Arc<dyn DomainManager> = dom_mgr;
        let task =
            tokio::spawn(async move { service.register_device_manager(&handle, "ior:x").await });
        tokio::time::sleep(Duration::from_millis(250)).await;
        token.cancel();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(DomainError::Interrupted(_))));
    }
}
