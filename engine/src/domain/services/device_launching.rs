//! Device Launching Service
//! Composes launch parameters for each planned instantiation and spawns the
//! child process. The pending registry node is installed before the spawn so
//! a fast child can register before the spawn call returns.

use crate::domain::constants::COMPOSITE_IOR_POLL_MS;
use crate::domain::entities::{DeviceNode, Instantiation, ServiceNode};
use crate::domain::ports::{FileSystem, ProcessExecutor, SpawnConfig};
use crate::domain::services::child_watching::ChildWatchingService;
use crate::domain::services::deployment_planning::PlannedPlacement;
use crate::domain::services::device_registry::DeviceRegistry;
use crate::domain::{ComponentType, Deployment, DomainError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

pub struct DeviceLauncher {
    registry: Arc<DeviceRegistry>,
    executor: Arc<dyn ProcessExecutor>,
    file_system: Arc<dyn FileSystem>,
    watcher: ChildWatchingService,
    shutdown: CancellationToken,
    devmgr_ior: String,
}

impl DeviceLauncher {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        executor: Arc<dyn ProcessExecutor>,
        file_system: Arc<dyn FileSystem>,
        watcher: ChildWatchingService,
        shutdown: CancellationToken,
        devmgr_ior: String,
    ) -> Self {
        Self {
            registry,
            executor,
            file_system,
            watcher,
            shutdown,
            devmgr_ior,
        }
    }

    /// Launch every instantiation of a planned placement. Individual launch
    /// failures are logged and skipped; they never abort the deployment of
    /// the rest of the node.
    pub async fn launch_placement(&self, planned: &PlannedPlacement, composite: bool) {
        for instantiation in &planned.placement.instantiations {
            if let Err(e) = self.launch_instantiation(planned, instantiation, composite).await {
                error!(
                    instantiation = %instantiation.id,
                    error = %e,
                    "skipping instantiation of component"
                );
            }
        }
    }

    async fn launch_instantiation(
        &self,
        planned: &PlannedPlacement,
        instantiation: &Instantiation,
        composite: bool,
    ) -> Result<()> {
        let component_type = if composite {
            ComponentType::SharedLibrary
        } else {
            match planned.profile.package.kind {
                crate::domain::ComponentKind::Device => ComponentType::Device,
                crate::domain::ComponentKind::Service => ComponentType::Service,
            }
        };

        info!(
            instantiation = %instantiation.id,
            package = %planned.profile.package.name,
            component_type = %component_type,
            "placing component"
        );

        // Composite children are loaded by their parent, which performs its
        // own path resolution; standalone children need a host-local path.
        let executable = if composite {
            planned.code_path.clone()
        } else {
            self.file_system.absolute_path(&planned.code_path)?
        };

        let composite_ior = if composite {
            let parent = planned
                .placement
                .composite_part_of
                .as_deref()
                .unwrap_or_default();
            self.await_parent_ior(parent).await?
        } else {
            String::new()
        };

        // The launch is authorized: record the deployment so the registering
        // child can be resolved back to its instantiation.
        self.registry.record_deployment(Deployment {
            placement: planned.placement.clone(),
            profile: planned.profile.clone(),
            instantiation: instantiation.clone(),
            implementation_id: planned.implementation_id.clone(),
            component_type,
        });

        let config = self.compose_spawn_config(
            planned,
            instantiation,
            component_type,
            executable,
            &composite_ior,
        );

        // Pending node first; the child may call back before spawn returns.
        match component_type {
            ComponentType::Device | ComponentType::SharedLibrary => {
                self.registry.insert_pending_device(DeviceNode::launched(
                    instantiation.id.clone(),
                    instantiation.usage_name.clone(),
                ));
            }
            ComponentType::Service => {
                self.registry
                    .insert_pending_service(ServiceNode::launched(
                        instantiation.usage_name.clone(),
                    ));
            }
        }

        match self.executor.spawn(config).await {
            Ok(result) => {
                match component_type {
                    ComponentType::Device | ComponentType::SharedLibrary => {
                        self.registry.assign_device_pid(&instantiation.id, result.pid);
                    }
                    ComponentType::Service => {
                        self.registry
                            .assign_service_pid(&instantiation.usage_name, result.pid);
                    }
                }
                if let Some(exit_handle) = result.exit_handle {
                    self.watcher.watch(
                        result.pid,
                        instantiation.usage_name.clone(),
                        exit_handle,
                    );
                }
                info!(
                    instantiation = %instantiation.id,
                    pid = result.pid,
                    "component launched"
                );
                Ok(())
            }
            Err(e) => {
                match component_type {
                    ComponentType::Device | ComponentType::SharedLibrary => {
                        self.registry.remove_pending_device(&instantiation.id);
                    }
                    ComponentType::Service => {
                        self.registry.remove_pending_service(&instantiation.usage_name);
                    }
                }
                Err(DomainError::LaunchFailed {
                    label: instantiation.usage_name.clone(),
                    detail: e.to_string(),
                })
            }
        }
    }

    fn compose_spawn_config(
        &self,
        planned: &PlannedPlacement,
        instantiation: &Instantiation,
        component_type: ComponentType,
        executable: String,
        composite_ior: &str,
    ) -> SpawnConfig {
        let mut config = SpawnConfig::new(executable);

        config.push_param("DEVICE_MGR_IOR", self.devmgr_ior.as_str());
        config.push_param("FILE_SYSTEM_IOR", self.file_system.ior());

        match component_type {
            ComponentType::Device | ComponentType::SharedLibrary => {
                config.push_param(
                    "PROFILE_NAME",
                    planned.profile.package.descriptor_path.as_str(),
                );
                config.push_param("DEVICE_ID", instantiation.id.as_str());
                config.push_param("DEVICE_LABEL", instantiation.usage_name.as_str());
                if component_type == ComponentType::SharedLibrary {
                    config.push_param("COMPOSITE_DEVICE_IOR", composite_ior);
                }
            }
            ComponentType::Service => {
                config.push_param("SERVICE_NAME", instantiation.usage_name.as_str());
            }
        }

        for param in planned.profile.exec_parameters(&instantiation.overrides) {
            trace!(id = %param.id, value = %param.value, "adding exec parameter");
            config.push_param(param.id, param.value);
        }

        config
    }

    /// A composite child may only launch once its parent has registered;
    /// poll the registered set for the parent's reference. Interruptible:
    /// shutdown turns the wait into an error for this instantiation.
    async fn await_parent_ior(&self, parent_instantiation_id: &str) -> Result<String> {
        loop {
            let ior = self.registry.ior_from_id(parent_instantiation_id);
            if !ior.is_empty() {
                trace!(parent = %parent_instantiation_id, "composite parent registered");
                return Ok(ior);
            }
            if self.shutdown.is_cancelled() {
                return Err(DomainError::Interrupted(format!(
                    "waiting for composite parent '{}'",
                    parent_instantiation_id
                )));
            }
            tokio::time::sleep(Duration::from_millis(COMPOSITE_IOR_POLL_MS)).await;
        }
    }
}
