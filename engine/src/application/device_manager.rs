//! Device Manager
//! Composition root and public remote surface of the node: owns the
//! registry, drives the deployment state machine at startup, correlates
//! child registrations and exits, and performs the escalating shutdown.

use crate::domain::constants::{DEVICE_RELEASE_TIMEOUT_MS, PENDING_WAIT_SLICE_MS};
use crate::domain::entities::{DeviceSnapshot, HostCapabilities, NodeDescriptor};
use crate::domain::ports::{
    DeviceHandle, DomainManager, FileSystem, NamingContext, ProcessExecutor, ServiceHandle,
};
use crate::domain::services::{
    cache_directory, deployment_planning, match_implementation, ChildExit, ChildWatchingService,
    DescriptorLoader, DeviceLauncher, DeviceRegistry, EventNotificationService, FederationService,
    ReapedNode,
};
use crate::domain::{AdminState, Deployment, DomainError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Static configuration of one device manager instance. The force-quit and
/// client-wait times remain writable at runtime; everything else is fixed at
/// construction.
#[derive(Debug, Clone)]
pub struct DeviceManagerConfig {
    /// Node descriptor path within the abstract file system
    pub dcd_file: String,
    /// Overrides the domain manager name from the node descriptor
    pub domain_name_override: Option<String>,
    /// Root under which the per-node cache directory is created
    pub cache_root: String,
    /// This device manager's own stringified reference on the bus
    pub devmgr_ior: String,
    pub logging_config_uri: Option<String>,
    /// Seconds granted to children after each kill-escalation stage
    pub force_quit_sec: f64,
    /// Bounded-blocking timeout applied to child references (milliseconds)
    pub client_wait_ms: u64,
}

impl Default for DeviceManagerConfig {
    fn default() -> Self {
        use crate::domain::constants::{DEFAULT_CLIENT_WAIT_MS, DEFAULT_DEVICE_FORCE_QUIT_SEC};
        Self {
            dcd_file: String::new(),
            domain_name_override: None,
            cache_root: String::new(),
            devmgr_ior: String::new(),
            logging_config_uri: None,
            force_quit_sec: DEFAULT_DEVICE_FORCE_QUIT_SEC,
            client_wait_ms: DEFAULT_CLIENT_WAIT_MS,
        }
    }
}

struct Tunables {
    force_quit_sec: f64,
    client_wait_ms: u64,
}

pub struct DeviceManager {
    identifier: String,
    label: String,
    domain_name: String,
    dcd_file: String,
    cache_root: String,
    devmgr_ior: String,
    logging_config_uri: Option<String>,
    hostname: String,
    node: NodeDescriptor,
    host: HostCapabilities,
    own_implementation: Option<String>,

    tunables: RwLock<Tunables>,
    admin_state: Mutex<AdminState>,
    dom_mgr: Mutex<Option<Arc<dyn DomainManager>>>,

    registry: Arc<DeviceRegistry>,
    file_system: Arc<dyn FileSystem>,
    naming: Arc<dyn NamingContext>,
    executor: Arc<dyn ProcessExecutor>,
    watcher: ChildWatchingService,
    events: EventNotificationService,

    shutdown_token: CancellationToken,
    halted: AtomicBool,
    halt_notify: Notify,
}

impl DeviceManager {
    /// Parse the node descriptor and the device manager's own package, and
    /// match the latter against the host. A node whose own package has no
    /// usable implementation cannot start; that failure is fatal here.
    ///
    /// Returns the manager together with the child-exit event stream; the
    /// caller owns running [`DeviceManager::reap_loop`] on it.
    pub fn new(
        config: DeviceManagerConfig,
        file_system: Arc<dyn FileSystem>,
        naming: Arc<dyn NamingContext>,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Result<(Arc<Self>, UnboundedReceiver<ChildExit>)> {
        let loader = DescriptorLoader::new(file_system.clone());
        let node = loader.load_node_descriptor(&config.dcd_file)?;

        let domain_name = config
            .domain_name_override
            .clone()
            .unwrap_or_else(|| node.domain_manager_name.clone());

        let (host, own_implementation) = match &node.device_manager_package {
            Some(package_ref) => {
                let own = loader.load_software_package(package_ref)?;
                let host = HostCapabilities::from_properties(&own.properties);
                let own_impl = match_implementation(&own, &host)?;
                (host, Some(own_impl.id.clone()))
            }
            None => (HostCapabilities::from_properties(&[]), None),
        };

        info!(
            identifier = %node.identifier,
            label = %node.label,
            domain = %domain_name,
            implementation = ?own_implementation,
            "device manager configured"
        );

        let (watcher, exit_rx) = ChildWatchingService::new();
        let events = EventNotificationService::new(naming.clone());

        let manager = Arc::new(Self {
            identifier: node.identifier.clone(),
            label: node.label.clone(),
            domain_name,
            dcd_file: config.dcd_file,
            cache_root: config.cache_root,
            devmgr_ior: config.devmgr_ior,
            logging_config_uri: config.logging_config_uri,
            hostname: hostname(),
            host,
            own_implementation,
            node,
            tunables: RwLock::new(Tunables {
                force_quit_sec: config.force_quit_sec,
                client_wait_ms: config.client_wait_ms,
            }),
            admin_state: Mutex::new(AdminState::Unregistered),
            dom_mgr: Mutex::new(None),
            registry: Arc::new(DeviceRegistry::new()),
            file_system,
            naming,
            executor,
            watcher,
            events,
            shutdown_token: CancellationToken::new(),
            halted: AtomicBool::new(false),
            halt_notify: Notify::new(),
        });
        Ok((manager, exit_rx))
    }

    /// Bring the node up in the fixed startup order: federate into the
    /// domain, bind into the naming tree, register for identity events,
    /// create the cache directory, then plan and launch the placements.
    /// Failures before planning are fatal; per-placement failures are not.
    pub async fn post_construct(&self) -> Result<()> {
        let federation = FederationService::new(
            self.naming.clone(),
            self.shutdown_token.clone(),
            self.client_wait_time(),
        );

        let dom_mgr = federation.connect(&self.domain_name).await?;
        *self.dom_mgr.lock().unwrap() = Some(dom_mgr.clone());

        federation
            .register_device_manager(&dom_mgr, &self.devmgr_ior)
            .await?;

        self.naming
            .bind(&self.label, &self.devmgr_ior)
            .await
            .map_err(|e| {
                error!(label = %self.label, error = %e, "unable to bind device manager into naming tree");
                DomainError::from(e)
            })?;

        self.events.register(&dom_mgr).await;

        *self.admin_state.lock().unwrap() = AdminState::Registered;

        let cache_dir = format!("{}/.{}", self.cache_root, self.label);
        trace!(path = %cache_dir, "creating device manager cache");
        cache_directory::make_directory(&cache_dir)?;

        self.deploy_placements().await;
        Ok(())
    }

    async fn deploy_placements(&self) {
        let loader = DescriptorLoader::new(self.file_system.clone());
        let mut entries = Vec::new();
        for placement in &self.node.placements {
            match loader.load_software_package(&placement.package_ref) {
                Ok(package) => entries.push((placement.clone(), package)),
                Err(e) => {
                    error!(
                        placement = %placement.display_id(),
                        error = %e,
                        "skipping placement; failed to load software package"
                    );
                }
            }
        }

        let plan = deployment_planning::plan(entries, &self.host);

        let launcher = DeviceLauncher::new(
            self.registry.clone(),
            self.executor.clone(),
            self.file_system.clone(),
            self.watcher.clone(),
            self.shutdown_token.clone(),
            self.devmgr_ior.clone(),
        );

        for planned in &plan.standalone {
            launcher.launch_placement(planned, false).await;
        }
        for planned in &plan.composite {
            launcher.launch_placement(planned, true).await;
        }
    }

    // ===== Public remote operations =====

    /// Register a device with this node. Runs the initialization protocol
    /// against the device (initialize properties, initialize, configure),
    /// binds it into the naming tree, promotes it in the registry, and then
    /// forwards to the domain manager. Forward failures are logged only; the
    /// local view stays authoritative.
    pub async fn register_device(&self, device: Option<Arc<dyn DeviceHandle>>) -> Result<()> {
        let Some(device) = device else {
            warn!("attempted to register nil device");
            return Err(DomainError::InvalidRef(
                "registering device is a nil reference".to_string(),
            ));
        };

        // Do not service registrations once shutdown has begun
        if self.shutdown_token.is_cancelled() {
            return Ok(());
        }

        device.set_call_policy(self.client_wait_time(), 0);
        let label = device.label().await.map_err(invalid_ref)?;
        let identifier = device.identifier().await.map_err(invalid_ref)?;
        let ior = device.ior();

        info!(
            device = %label,
            identifier = %identifier,
            node = %self.label,
            "registering device"
        );

        if self.registry.device_is_registered(&ior) {
            warn!(device = %label, "device is already registered");
            return Ok(());
        }

        match self.registry.find_profile(&identifier) {
            Some(deployment) => {
                self.run_initialization_protocol(&device, &label, &deployment)
                    .await?
            }
            None => {
                debug!(
                    device = %label,
                    "no deployment record; registering externally launched device"
                );
            }
        }

        // Local bind precedes the domain manager forward. A taken name means
        // someone beat us to it; treat the device as registered.
        if let Err(e) = self.naming.bind(&label, &ior).await {
            warn!(device = %label, error = %e, "device is already registered");
            return Ok(());
        }
        self.registry
            .promote_device(&identifier, &label, &ior, device.clone());

        if self.admin_state() == AdminState::Registered {
            let dom_mgr = self.dom_mgr.lock().unwrap().clone();
            if let Some(dom_mgr) = dom_mgr {
                info!(device = %label, domain = %self.domain_name, "registering device with domain manager");
                if let Err(e) = dom_mgr.register_device(&ior, &self.devmgr_ior).await {
                    error!(device = %label, error = %e, "failed to register device with domain manager");
                }
            }
        } else {
            warn!(
                device = %label,
                "skipping domain manager forward; device manager is not registered"
            );
        }

        trace!(device = %label, "done registering device");
        Ok(())
    }

    /// Unregister a device, located by stringified-reference equality. A
    /// device whose process is still alive moves back to the pending set for
    /// the reaper.
    pub async fn unregister_device(&self, device: Option<Arc<dyn DeviceHandle>>) -> Result<()> {
        let Some(device) = device else {
            error!("attempt to unregister nil device");
            return Err(DomainError::InvalidRef(
                "cannot unregister device; reference is nil".to_string(),
            ));
        };

        let ior = device.ior();
        let Some(snapshot) = self.registry.remove_registered_device_by_ior(&ior) else {
            error!("cannot unregister device; it was not registered");
            return Err(DomainError::InvalidRef(
                "cannot unregister device; it was not registered".to_string(),
            ));
        };

        self.local_unregister_device(&snapshot).await;
        Ok(())
    }

    /// Register a service under its unique usage name. A second service with
    /// the same name rebinds the naming entry, displacing the first. Unlike
    /// devices, a failed domain manager forward reverses the local
    /// registration.
    pub async fn register_service(
        &self,
        service: Option<Arc<dyn ServiceHandle>>,
        name: &str,
    ) -> Result<()> {
        let Some(service) = service else {
            return Err(DomainError::InvalidRef(
                "registering service is a nil reference".to_string(),
            ));
        };

        if self.shutdown_token.is_cancelled() {
            return Ok(());
        }

        info!(service = %name, "registering service");
        service.set_call_policy(self.client_wait_time(), 0);

        let ior = service.ior();
        // Usage names are mandatory and unique per service type: a second
        // registration under the same name displaces the first, whose node
        // returns to pending so its process is still reaped
        if let Some(existing) = self.registry.registered_service_ior(name) {
            if existing == ior {
                warn!(service = %name, "service is already registered");
                return Ok(());
            }
            warn!(service = %name, "displacing previously registered service");
            self.registry.remove_registered_service(name);
        }

        if let Err(e) = self.naming.rebind(name, &ior).await {
            warn!(service = %name, error = %e, "service is already registered");
            return Ok(());
        }
        self.registry.promote_service(name, &ior, service.clone());

        if self.admin_state() == AdminState::Registered {
            let dom_mgr = self.dom_mgr.lock().unwrap().clone();
            if let Some(dom_mgr) = dom_mgr {
                if let Err(e) = dom_mgr
                    .register_service(&ior, &self.devmgr_ior, name)
                    .await
                {
                    error!(
                        service = %name,
                        error = %e,
                        "failed to register service with the domain manager; unregistering it locally"
                    );
                    let _ = self.naming.unbind(name).await;
                    self.registry.retract_service(name);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    pub async fn unregister_service(
        &self,
        service: Option<Arc<dyn ServiceHandle>>,
        name: &str,
    ) -> Result<()> {
        info!(service = %name, "unregistering service");
        if service.is_none() {
            return Err(DomainError::InvalidRef(
                "cannot unregister service; reference is nil".to_string(),
            ));
        }

        let Some(snapshot) = self.registry.remove_registered_service(name) else {
            return Err(DomainError::InvalidRef(
                "cannot unregister service; it was not registered".to_string(),
            ));
        };
        self.local_unregister_service(&snapshot.label, &snapshot.ior)
            .await;
        Ok(())
    }

    /// Object-equivalence check against the registered set.
    pub fn device_is_registered(&self, device: &Arc<dyn DeviceHandle>) -> bool {
        self.registry.device_is_registered(&device.ior())
    }

    /// Snapshot of the registered device handles.
    pub fn registered_devices(&self) -> Vec<Arc<dyn DeviceHandle>> {
        self.registry.registered_device_handles()
    }

    /// Snapshot of the registered services as (usage name, handle) pairs.
    pub fn registered_services(&self) -> Vec<(String, Arc<dyn ServiceHandle>)> {
        self.registry.registered_service_handles()
    }

    /// Implementation id the instantiation was deployed with; empty string
    /// when the instantiation is unknown.
    pub fn get_component_implementation_id(&self, instantiation_id: &str) -> String {
        self.registry.implementation_id(instantiation_id)
    }

    /// Stringified reference of a registered device by instantiation id;
    /// empty string when absent.
    pub fn ior_from_id(&self, instantiation_id: &str) -> String {
        self.registry.ior_from_id(instantiation_id)
    }

    pub fn find_profile(&self, instantiation_id: &str) -> Option<Deployment> {
        self.registry.find_profile(instantiation_id)
    }

    // ===== Child reaping =====

    /// Dispatch loop for child-exit events; runs until the event stream
    /// closes. Must stay live through shutdown: the escalation waits depend
    /// on exits being processed.
    pub async fn reap_loop(self: Arc<Self>, mut exit_rx: UnboundedReceiver<ChildExit>) {
        debug!("child reaper started");
        while let Some(exit) = exit_rx.recv().await {
            self.child_exited(exit).await;
        }
        debug!("child reaper stopped");
    }

    /// React to one child exit: claim the node, perform the implicit local
    /// unregister for children that had registered, and log how the process
    /// ended. An unknown pid is an error and the event is dropped.
    pub async fn child_exited(&self, exit: ChildExit) {
        let Some(reaped) = self.registry.take_by_pid(exit.pid) else {
            error!(
                pid = exit.pid,
                "process is not associated with a managed device or service"
            );
            return;
        };

        match reaped {
            ReapedNode::Device {
                node,
                was_registered,
            } => {
                if was_registered {
                    self.local_unregister_device(&node).await;
                }
                match exit.signal {
                    Some(signal) => warn!(
                        child = %node.label,
                        pid = exit.pid,
                        signal = signal,
                        "child process terminated with signal"
                    ),
                    None => info!(
                        child = %node.label,
                        pid = exit.pid,
                        status = exit.code.unwrap_or(-1),
                        "child process exited"
                    ),
                }
            }
            ReapedNode::Service {
                node,
                was_registered,
            } => {
                if was_registered {
                    self.local_unregister_service(&node.label, &node.ior).await;
                }
                // Services are stopped by signal on shutdown, so signalled
                // termination is the expected path
                match exit.signal {
                    Some(signal) => info!(
                        child = %node.label,
                        pid = exit.pid,
                        signal = signal,
                        "child process terminated with signal"
                    ),
                    None => info!(
                        child = %node.label,
                        pid = exit.pid,
                        status = exit.code.unwrap_or(-1),
                        "child process exited"
                    ),
                }
            }
        }
    }

    // ===== Shutdown =====

    /// Idempotent, error-swallowing shutdown: unregister from the domain,
    /// drain the registered sets, unbind, then escalate signals over the
    /// pending children until they drain. Safe against partial
    /// initialization; always reaches the terminal state.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        {
            let mut state = self.admin_state.lock().unwrap();
            if state.is_shutting_down() {
                debug!("shutdown already in progress");
                return;
            }
            *state = AdminState::ShuttingDown;
        }
        info!(node = %self.label, "device manager shutting down");

        // Unregister this node from the domain manager
        let dom_mgr = self.dom_mgr.lock().unwrap().clone();
        if let Some(dom_mgr) = &dom_mgr {
            if let Err(e) = dom_mgr.unregister_device_manager(&self.devmgr_ior).await {
                debug!(error = %e, "device manager unregister failed");
            }
        }

        self.events.unregister().await;

        // Drain registered services; externally launched ones (pid 0) are
        // unregistered and left running
        while let Some(service) = self.registry.take_front_registered_service() {
            self.local_unregister_service(&service.label, &service.ior)
                .await;
        }

        // Release each registered device without holding the registry lock
        // across the remote call; devices that fail to unregister themselves
        // are forced out
        loop {
            let Some((snapshot, handle)) = self.registry.front_registered_device() else {
                break;
            };
            info!(device = %snapshot.label, "releasing device");
            handle.set_call_policy(DEVICE_RELEASE_TIMEOUT_MS, 0);
            let _ = tokio::time::timeout(
                Duration::from_millis(DEVICE_RELEASE_TIMEOUT_MS),
                handle.release_object(),
            )
            .await;
            self.registry.confirm_device_release(&snapshot.ior);
        }

        // Unbind this node's context
        if let Err(e) = self.naming.unbind(&self.label).await {
            debug!(error = %e, "unable to unbind device manager context");
        }

        let grace = self.force_quit_duration();

        // Services: orderly terminate, then kill
        self.kill_pending_services(libc::SIGTERM).await;
        if !grace.is_zero() {
            self.registry.wait_pending_services_empty(grace).await;
        }
        self.kill_pending_services(libc::SIGKILL).await;

        // Devices: escalate interrupt, terminate, kill
        self.kill_pending_devices(libc::SIGINT).await;
        if !grace.is_zero() {
            self.registry.wait_pending_devices_empty(grace).await;
        }
        self.kill_pending_devices(libc::SIGTERM).await;
        if !grace.is_zero() {
            self.registry.wait_pending_devices_empty(grace).await;
        }
        self.kill_pending_devices(libc::SIGKILL).await;

        // SIGKILL cannot be ignored; give the reaper a bounded window to
        // observe the last exits so the pending sets drain before we return
        let drain = grace.max(Duration::from_millis(PENDING_WAIT_SLICE_MS));
        self.registry.wait_pending_devices_empty(drain).await;
        self.registry.wait_pending_services_empty(drain).await;

        *self.admin_state.lock().unwrap() = AdminState::Shutdown;
        info!(node = %self.label, "device manager shutdown complete");
    }

    /// Immediate teardown: kill every pending device outright, then run the
    /// normal shutdown.
    pub async fn abort(&self) {
        warn!(node = %self.label, "aborting device manager");
        self.kill_pending_devices(libc::SIGKILL).await;
        self.shutdown().await;
    }

    // ===== Run loop =====

    /// Block until halted.
    pub async fn run(&self) {
        info!(node = %self.label, "device manager running");
        while !self.halted.load(Ordering::Acquire) {
            self.halt_notify.notified().await;
        }
    }

    /// Wake `run`.
    pub fn halt(&self) {
        debug!(node = %self.label, "halt requested");
        self.halted.store(true, Ordering::Release);
        self.halt_notify.notify_waiters();
    }

    // ===== Read-only properties =====

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn device_configuration_profile(&self) -> &str {
        &self.dcd_file
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn logging_config_uri(&self) -> Option<&str> {
        self.logging_config_uri.as_deref()
    }

    pub fn cache_root(&self) -> &str {
        &self.cache_root
    }

    pub fn own_implementation(&self) -> Option<&str> {
        self.own_implementation.as_deref()
    }

    pub fn file_sys(&self) -> Arc<dyn FileSystem> {
        self.file_system.clone()
    }

    pub fn dom_mgr(&self) -> Option<Arc<dyn DomainManager>> {
        self.dom_mgr.lock().unwrap().clone()
    }

    pub fn admin_state(&self) -> AdminState {
        *self.admin_state.lock().unwrap()
    }

    pub fn all_children_exited(&self) -> bool {
        self.registry.all_children_exited()
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    // ===== Writable properties =====

    pub fn device_force_quit_time(&self) -> f64 {
        self.tunables.read().unwrap().force_quit_sec
    }

    pub fn set_device_force_quit_time(&self, seconds: f64) {
        self.tunables.write().unwrap().force_quit_sec = seconds.max(0.0);
    }

    pub fn client_wait_time(&self) -> u64 {
        self.tunables.read().unwrap().client_wait_ms
    }

    pub fn set_client_wait_time(&self, milliseconds: u64) {
        self.tunables.write().unwrap().client_wait_ms = milliseconds;
    }

    // ===== Internals =====

    fn force_quit_duration(&self) -> Duration {
        Duration::from_secs_f64(self.device_force_quit_time().max(0.0))
    }

    async fn run_initialization_protocol(
        &self,
        device: &Arc<dyn DeviceHandle>,
        label: &str,
        deployment: &Deployment,
    ) -> Result<()> {
        let overrides = &deployment.instantiation.overrides;

        if deployment.profile.is_configurable() {
            let construct = deployment.profile.nonnil_construct_properties(overrides);
            debug!(device = %label, count = construct.len(), "initializing device properties");
            device
                .initialize_properties(&construct)
                .await
                .map_err(|e| {
                    error!(
                        device = %label,
                        error = %e,
                        "initialize_properties failed; device registration rejected"
                    );
                    DomainError::InvalidRef(format!(
                        "device '{}' may not have been initialized correctly: {}",
                        label, e
                    ))
                })?;
        }

        debug!(device = %label, node = %self.label, "initializing device");
        device.initialize().await.map_err(|e| {
            error!(device = %label, error = %e, "initialize failed; device registration rejected");
            DomainError::InvalidRef(format!("device '{}' failed to initialize: {}", label, e))
        })?;

        let configure = deployment.profile.nonnil_configure_properties(overrides);
        if !configure.is_empty() {
            debug!(device = %label, count = configure.len(), "configuring device");
            device.configure(&configure).await.map_err(|e| {
                error!(device = %label, error = %e, "configure failed; device registration rejected");
                DomainError::InvalidRef(format!(
                    "device '{}' may not have been configured correctly: {}",
                    label, e
                ))
            })?;
        }
        Ok(())
    }

    async fn local_unregister_device(&self, node: &DeviceSnapshot) {
        if let Err(e) = self.naming.unbind(&node.label).await {
            error!(device = %node.label, error = %e, "unable to unbind device");
        }

        // No forward once shutdown has started; local state is already
        // authoritative
        if self.admin_state() == AdminState::Registered {
            let dom_mgr = self.dom_mgr.lock().unwrap().clone();
            if let Some(dom_mgr) = dom_mgr {
                if let Err(e) = dom_mgr.unregister_device(&node.ior).await {
                    error!(device = %node.label, error = %e, "domain manager unregister failed");
                }
            }
        }
    }

    async fn local_unregister_service(&self, label: &str, ior: &str) {
        if let Err(e) = self.naming.unbind(label).await {
            debug!(service = %label, error = %e, "unable to unbind service");
        }

        if self.admin_state() == AdminState::Registered {
            let dom_mgr = self.dom_mgr.lock().unwrap().clone();
            if let Some(dom_mgr) = dom_mgr {
                if let Err(e) = dom_mgr.unregister_service(ior, label).await {
                    error!(service = %label, error = %e, "domain manager unregister failed");
                }
            }
        }
    }

    async fn kill_pending_devices(&self, signal: i32) {
        for pid in self.registry.pending_device_pids() {
            trace!(pid = pid, signal = signal, "signalling pending device");
            if let Err(e) = self.executor.kill(pid, signal).await {
                debug!(pid = pid, signal = signal, error = %e, "signal delivery failed");
            }
        }
    }

    async fn kill_pending_services(&self, signal: i32) {
        for pid in self.registry.pending_service_pids() {
            trace!(pid = pid, signal = signal, "signalling pending service");
            if let Err(e) = self.executor.kill(pid, signal).await {
                debug!(pid = pid, signal = signal, error = %e, "signal delivery failed");
            }
        }
    }
}

fn invalid_ref(err: crate::domain::ports::BusError) -> DomainError {
    DomainError::InvalidRef(err.to_string())
}

fn hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
