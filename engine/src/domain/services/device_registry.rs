//! Device Registry
//! The authoritative in-memory view of this node's children: devices and
//! services that have been launched but not yet registered (pending) and
//! those currently registered, plus the deployment records that tie
//! registering children back to their planned instantiations.
//!
//! All five collections live behind one non-recursive mutex; public methods
//! lock exactly once. Nothing here performs remote invocations: callers
//! snapshot what they need, drop the lock, and reconcile afterwards.
//! Whenever a pending set transitions to empty the registry notifies
//! waiters, which is what bounds the shutdown stage waits.

use crate::domain::entities::{
    Deployment, DeviceNode, DeviceSnapshot, ServiceNode, ServiceSnapshot,
};
use crate::domain::ports::{DeviceHandle, ServiceHandle};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[derive(Default)]
struct RegistryState {
    pending_devices: Vec<DeviceNode>,
    registered_devices: Vec<DeviceNode>,
    pending_services: Vec<ServiceNode>,
    registered_services: Vec<ServiceNode>,
    deployed: Vec<Deployment>,
}

/// A node claimed by its exiting process.
pub enum ReapedNode {
    Device {
        node: DeviceSnapshot,
        was_registered: bool,
    },
    Service {
        node: ServiceSnapshot,
        was_registered: bool,
    },
}

#[derive(Default)]
pub struct DeviceRegistry {
    state: Mutex<RegistryState>,
    pending_empty: Notify,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap()
    }

    fn notify_if_drained(&self, state: &RegistryState) {
        if state.pending_devices.is_empty() || state.pending_services.is_empty() {
            self.pending_empty.notify_waiters();
        }
    }

    // ===== Launch-side bookkeeping =====

    /// Install a pending device node. Must happen before the child process
    /// is spawned: the child may register before the spawn call returns.
    pub fn insert_pending_device(&self, node: DeviceNode) {
        let mut state = self.lock();
        debug!(identifier = %node.identifier, "inserting pending device");
        state.pending_devices.push(node);
    }

    pub fn insert_pending_service(&self, node: ServiceNode) {
        let mut state = self.lock();
        debug!(label = %node.label, "inserting pending service");
        state.pending_services.push(node);
    }

    /// Record the pid once the spawn has returned. The node may already have
    /// moved to the registered set if the child registered first.
    pub fn assign_device_pid(&self, identifier: &str, pid: u32) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        let node = state
            .pending_devices
            .iter_mut()
            .chain(state.registered_devices.iter_mut())
            .find(|n| n.identifier == identifier);
        match node {
            Some(node) => {
                node.pid = pid;
                true
            }
            None => false,
        }
    }

    pub fn assign_service_pid(&self, label: &str, pid: u32) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        let node = state
            .pending_services
            .iter_mut()
            .chain(state.registered_services.iter_mut())
            .find(|n| n.label == label);
        match node {
            Some(node) => {
                node.pid = pid;
                true
            }
            None => false,
        }
    }

    /// Abandon a pending device whose spawn failed.
    pub fn remove_pending_device(&self, identifier: &str) -> Option<DeviceSnapshot> {
        let mut state = self.lock();
        let idx = state
            .pending_devices
            .iter()
            .position(|n| n.identifier == identifier)?;
        let node = state.pending_devices.remove(idx);
        self.notify_if_drained(&state);
        Some(DeviceSnapshot::from(&node))
    }

    pub fn remove_pending_service(&self, label: &str) -> Option<ServiceSnapshot> {
        let mut state = self.lock();
        let idx = state
            .pending_services
            .iter()
            .position(|n| n.label == label)?;
        let node = state.pending_services.remove(idx);
        self.notify_if_drained(&state);
        Some(ServiceSnapshot::from(&node))
    }

    // ===== Registration =====

    /// Object-equivalence check against every registered device handle.
    pub fn device_is_registered(&self, ior: &str) -> bool {
        self.lock().registered_devices.iter().any(|n| n.ior == ior)
    }

    pub fn service_is_registered(&self, label: &str) -> bool {
        self.lock()
            .registered_services
            .iter()
            .any(|n| n.label == label)
    }

    /// Reference of the service currently registered under `label`.
    pub fn registered_service_ior(&self, label: &str) -> Option<String> {
        self.lock()
            .registered_services
            .iter()
            .find(|n| n.label == label)
            .map(|n| n.ior.clone())
    }

    /// Move the pending node matching `identifier` into the registered set,
    /// filling in the fields only known at registration time. A device that
    /// was not launched here gets a fresh `pid = 0` node. Returns whether a
    /// pending node was found.
    pub fn promote_device(
        &self,
        identifier: &str,
        label: &str,
        ior: &str,
        handle: Arc<dyn DeviceHandle>,
    ) -> bool {
        let mut state = self.lock();
        let pending_idx = state
            .pending_devices
            .iter()
            .position(|n| n.identifier == identifier);
        let mut node = match pending_idx {
            Some(idx) => state.pending_devices.remove(idx),
            None => {
                warn!(
                    identifier = %identifier,
                    "registering device was not launched by this device manager"
                );
                DeviceNode::external(identifier)
            }
        };

        // The label has probably not changed, but the device is
        // authoritative for its own identity.
        node.label = label.to_string();
        node.ior = ior.to_string();
        node.handle = Some(handle);
        state.registered_devices.push(node);
        self.notify_if_drained(&state);
        pending_idx.is_some()
    }

    /// Service analogue of `promote_device`, keyed by usage name. Only
    /// freshly launched pending nodes (empty reference) are consumed; a
    /// displaced previously-registered node stays pending for the reaper.
    pub fn promote_service(&self, label: &str, ior: &str, handle: Arc<dyn ServiceHandle>) -> bool {
        let mut state = self.lock();
        let pending_idx = state
            .pending_services
            .iter()
            .position(|n| n.label == label && n.ior.is_empty());
        let mut node = match pending_idx {
            Some(idx) => state.pending_services.remove(idx),
            None => {
                warn!(
                    service = %label,
                    "registering service was not launched by this device manager"
                );
                ServiceNode::external(label)
            }
        };

        node.ior = ior.to_string();
        node.handle = Some(handle);
        state.registered_services.push(node);
        self.notify_if_drained(&state);
        pending_idx.is_some()
    }

    /// Reverse a `promote_service` after the domain manager refused the
    /// forward: the node leaves the registered set, returning to pending if
    /// its process is still ours to reap.
    pub fn retract_service(&self, label: &str) -> Option<ServiceSnapshot> {
        self.remove_registered_service(label)
    }

    /// Remove a registered device, located by stringified-IOR equality (not
    /// by identifier). A node whose process is still alive (`pid != 0`) goes
    /// back to the pending set so the reaper can finish it.
    pub fn remove_registered_device_by_ior(&self, ior: &str) -> Option<DeviceSnapshot> {
        let mut state = self.lock();
        let idx = state.registered_devices.iter().position(|n| n.ior == ior)?;
        let node = state.registered_devices.remove(idx);
        let snapshot = DeviceSnapshot::from(&node);
        if node.pid != 0 {
            state.pending_devices.push(node);
        }
        Some(snapshot)
    }

    pub fn remove_registered_service(&self, label: &str) -> Option<ServiceSnapshot> {
        let mut state = self.lock();
        let idx = state
            .registered_services
            .iter()
            .position(|n| n.label == label)?;
        let node = state.registered_services.remove(idx);
        let snapshot = ServiceSnapshot::from(&node);
        if node.pid != 0 {
            state.pending_services.push(node);
        }
        Some(snapshot)
    }

    // ===== Reaping =====

    /// Claim the node belonging to an exited process. Pending nodes are
    /// searched first; a registered node exiting early is removed and flagged
    /// so the caller can perform the implicit local unregister.
    pub fn take_by_pid(&self, pid: u32) -> Option<ReapedNode> {
        let mut state = self.lock();

        if let Some(idx) = state.pending_devices.iter().position(|n| n.pid == pid) {
            let node = state.pending_devices.remove(idx);
            self.notify_if_drained(&state);
            return Some(ReapedNode::Device {
                node: DeviceSnapshot::from(&node),
                was_registered: false,
            });
        }
        if let Some(idx) = state.registered_devices.iter().position(|n| n.pid == pid) {
            let node = state.registered_devices.remove(idx);
            return Some(ReapedNode::Device {
                node: DeviceSnapshot::from(&node),
                was_registered: true,
            });
        }
        if let Some(idx) = state.pending_services.iter().position(|n| n.pid == pid) {
            let node = state.pending_services.remove(idx);
            self.notify_if_drained(&state);
            return Some(ReapedNode::Service {
                node: ServiceSnapshot::from(&node),
                was_registered: false,
            });
        }
        if let Some(idx) = state.registered_services.iter().position(|n| n.pid == pid) {
            let node = state.registered_services.remove(idx);
            return Some(ReapedNode::Service {
                node: ServiceSnapshot::from(&node),
                was_registered: true,
            });
        }
        None
    }

    // ===== Shutdown support =====

    /// Front of the registered device list, for the release loop. The lock
    /// is not held while the caller invokes `release_object`.
    pub fn front_registered_device(&self) -> Option<(DeviceSnapshot, Arc<dyn DeviceHandle>)> {
        let state = self.lock();
        state.registered_devices.first().and_then(|node| {
            node.handle
                .clone()
                .map(|handle| (DeviceSnapshot::from(node), handle))
        })
    }

    /// Reconcile after a `release_object` attempt: if the released device is
    /// still at the front of the list the release must have failed to
    /// unregister it, so force it out (back to pending when its process
    /// lives).
    pub fn confirm_device_release(&self, ior: &str) {
        let mut state = self.lock();
        let still_front = state
            .registered_devices
            .first()
            .map(|n| n.ior == ior)
            .unwrap_or(false);
        if still_front {
            let node = state.registered_devices.remove(0);
            if node.pid != 0 {
                state.pending_devices.push(node);
            }
        }
    }

    /// Drain one registered service for shutdown, front first.
    pub fn take_front_registered_service(&self) -> Option<ServiceSnapshot> {
        let mut state = self.lock();
        if state.registered_services.is_empty() {
            return None;
        }
        let node = state.registered_services.remove(0);
        let snapshot = ServiceSnapshot::from(&node);
        if node.pid != 0 {
            state.pending_services.push(node);
        }
        Some(snapshot)
    }

    pub fn pending_device_pids(&self) -> Vec<u32> {
        self.lock()
            .pending_devices
            .iter()
            .map(|n| n.pid)
            .filter(|pid| *pid != 0)
            .collect()
    }

    pub fn pending_service_pids(&self) -> Vec<u32> {
        self.lock()
            .pending_services
            .iter()
            .map(|n| n.pid)
            .filter(|pid| *pid != 0)
            .collect()
    }

    pub fn registered_device_pids(&self) -> Vec<u32> {
        self.lock()
            .registered_devices
            .iter()
            .map(|n| n.pid)
            .filter(|pid| *pid != 0)
            .collect()
    }

    pub fn pending_devices_empty(&self) -> bool {
        self.lock().pending_devices.is_empty()
    }

    pub fn pending_services_empty(&self) -> bool {
        self.lock().pending_services.is_empty()
    }

    pub fn all_children_exited(&self) -> bool {
        let state = self.lock();
        state.pending_devices.is_empty()
            && state.registered_devices.is_empty()
            && state.pending_services.is_empty()
            && state.registered_services.is_empty()
    }

    /// Block until the pending device set empties or the deadline elapses.
    /// The wait wakes on the pending-empty notification but re-checks the
    /// set on a bounded slice so a missed notification cannot hang it.
    pub async fn wait_pending_devices_empty(&self, deadline: Duration) -> bool {
        self.wait_drained(deadline, || self.pending_devices_empty())
            .await
    }

    pub async fn wait_pending_services_empty(&self, deadline: Duration) -> bool {
        self.wait_drained(deadline, || self.pending_services_empty())
            .await
    }

    async fn wait_drained<F: Fn() -> bool>(&self, deadline: Duration, drained: F) -> bool {
        use crate::domain::constants::PENDING_WAIT_SLICE_MS;
        let start = tokio::time::Instant::now();
        loop {
            if drained() {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= deadline {
                return false;
            }
            let slice = Duration::from_millis(PENDING_WAIT_SLICE_MS).min(deadline - elapsed);
            let _ = tokio::time::timeout(slice, self.pending_empty.notified()).await;
        }
    }

    // ===== Snapshots and lookups =====

    pub fn registered_device_handles(&self) -> Vec<Arc<dyn DeviceHandle>> {
        self.lock()
            .registered_devices
            .iter()
            .filter_map(|n| n.handle.clone())
            .collect()
    }

    pub fn registered_service_handles(&self) -> Vec<(String, Arc<dyn ServiceHandle>)> {
        self.lock()
            .registered_services
            .iter()
            .filter_map(|n| n.handle.clone().map(|h| (n.label.clone(), h)))
            .collect()
    }

    pub fn record_deployment(&self, deployment: Deployment) {
        self.lock().deployed.push(deployment);
    }

    /// First deployment record matching the instantiation id.
    pub fn find_profile(&self, instantiation_id: &str) -> Option<Deployment> {
        self.lock()
            .deployed
            .iter()
            .find(|d| d.instantiation.id == instantiation_id)
            .cloned()
    }

    /// Implementation id the instantiation was deployed with; empty when the
    /// instantiation is unknown.
    pub fn implementation_id(&self, instantiation_id: &str) -> String {
        self.lock()
            .deployed
            .iter()
            .find(|d| d.instantiation.id == instantiation_id)
            .map(|d| d.implementation_id.clone())
            .unwrap_or_default()
    }

    /// Stringified reference of a registered device located by identifier;
    /// empty when absent.
    pub fn ior_from_id(&self, instantiation_id: &str) -> String {
        self.lock()
            .registered_devices
            .iter()
            .find(|n| n.identifier == instantiation_id)
            .map(|n| n.ior.clone())
            .unwrap_or_default()
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let state = self.lock();
        (
            state.pending_devices.len(),
            state.registered_devices.len(),
            state.pending_services.len(),
            state.registered_services.len(),
        )
    }
}
