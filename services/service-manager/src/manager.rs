//! Service manager: registry access, reconciliation, and update processing.
//!
//! The manager converges every registered service instance toward the state
//! configured for it in the shared tree:
//! - `sync_service` compares configured and discovered state and starts or
//!   stops the instance
//! - `process_update` records an instance's self-reported state in the
//!   discovered tree
//!
//! Neither operation returns an error. Failures are logged and the current
//! pass is abandoned; the next state change or bulk sync retries.

use std::sync::Arc;

use corral_events::Event;
use corral_id::{NodeId, ServiceId};
use corral_reconcile::{decide, discovered_state_for, ConvergenceStatus, ServiceState, SyncAction};
use corral_state::{service_id_from_path, service_state_path, NodeUrl, StateStore};
use tracing::{debug, error, info, warn};

use crate::instance::{ServiceInstance, ServiceInstanceUpdate};
use crate::registry::Registry;

/// Which tree a state is read from.
#[derive(Debug, Clone, Copy)]
enum Tree {
    Configured,
    Discovered,
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tree::Configured => write!(f, "configured"),
            Tree::Discovered => write!(f, "discovered"),
        }
    }
}

/// Per-node service lifecycle manager.
pub struct ServiceManager {
    /// This node's identity.
    node_id: NodeId,

    /// Registered instances.
    registry: Registry,

    /// Shared state store.
    store: Arc<dyn StateStore>,
}

impl ServiceManager {
    pub fn new(node_id: NodeId, registry: Registry, store: Arc<dyn StateStore>) -> Self {
        Self {
            node_id,
            registry,
            store,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a service instance.
    pub async fn add_service(&self, si: Arc<dyn ServiceInstance>) {
        info!(service_id = %si.id(), "Adding service");
        self.registry.add_service(si).await;
    }

    /// Deregister a service instance, returning it.
    pub async fn del_service(&self, id: &ServiceId) -> Option<Arc<dyn ServiceInstance>> {
        self.registry.del_service(id).await
    }

    /// Look up a registered service instance.
    pub async fn get_service(&self, id: &ServiceId) -> Option<Arc<dyn ServiceInstance>> {
        self.registry.get_service(id).await
    }

    /// Reconcile the service addressed by a state-change event.
    ///
    /// Events whose URL does not name a service are logged and dropped.
    pub async fn process_state_change(&self, event: &Event) -> Option<SyncAction> {
        let url = match NodeUrl::parse(event.url()) {
            Ok(url) => url,
            Err(e) => {
                debug!(url = %event.url(), error = %e, "Failed to parse URL for services state change");
                return None;
            }
        };

        match service_id_from_path(&url.path) {
            Ok(id) => self.sync_service(&id).await,
            Err(e) => {
                debug!(url = %event.url(), error = %e, "Failed to parse URL for services state change");
                None
            }
        }
    }

    /// Compare configured and discovered state of a service and act on it.
    ///
    /// Returns the action taken, or `None` if the service is not registered.
    pub async fn sync_service(&self, id: &ServiceId) -> Option<SyncAction> {
        debug!(service_id = %id, "Syncing service");

        let Some(si) = self.registry.get_service(id).await else {
            error!(service_id = %id, "Tried to sync non-existent service");
            return None;
        };

        let configured = self.read_state(Tree::Configured, id).await;
        let discovered = self.read_state(Tree::Discovered, id).await;
        let action = decide(configured, discovered);

        match action {
            SyncAction::Start => {
                info!(service_id = %id, %configured, %discovered, "Starting service");
                if let Err(e) = si.start().await {
                    error!(service_id = %id, error = %e, "Failed to start service");
                }
            }
            SyncAction::Stop => {
                info!(service_id = %id, %configured, %discovered, "Stopping service");
                if let Err(e) = si.stop().await {
                    error!(service_id = %id, error = %e, "Failed to stop service");
                }
            }
            SyncAction::Noop(reason) => {
                debug!(
                    service_id = %id,
                    %configured,
                    %discovered,
                    %reason,
                    status = %ConvergenceStatus::of(configured, discovered),
                    "No action needed"
                );
            }
        }

        Some(action)
    }

    /// Record a self-reported runtime state in the discovered tree.
    pub async fn process_update(&self, update: ServiceInstanceUpdate) {
        let state = discovered_state_for(update.state);
        debug!(
            service_id = %update.id,
            reported = %update.state,
            discovered = %state,
            "Processing service state update"
        );
        self.write_discovered_state(&update.id, state).await;
    }

    async fn read_state(&self, tree: Tree, id: &ServiceId) -> ServiceState {
        let path = service_state_path(id);

        let read = match tree {
            Tree::Configured => self.store.read_configured(&self.node_id).await,
            Tree::Discovered => self.store.read_discovered(&self.node_id).await,
        };

        let node = match read {
            Ok(node) => node,
            Err(e) => {
                error!(service_id = %id, tree = %tree, error = %e, "Failed to read state tree");
                return ServiceState::Unknown;
            }
        };

        let value = match node.get_value(&path) {
            Ok(value) => value,
            Err(e) => {
                warn!(service_id = %id, tree = %tree, path = %path, error = %e, "Failed to get state value");
                return ServiceState::Unknown;
            }
        };

        ServiceState::from_value(value).unwrap_or_else(|e| {
            warn!(service_id = %id, tree = %tree, path = %path, error = %e, "Invalid state value");
            ServiceState::Unknown
        })
    }

    async fn write_discovered_state(&self, id: &ServiceId, state: ServiceState) {
        let path = service_state_path(id);

        let mut node = match self.store.read_discovered(&self.node_id).await {
            Ok(node) => node,
            Err(e) => {
                error!(service_id = %id, error = %e, "Failed to read discovered tree");
                return;
            }
        };

        if let Err(e) = node.set_value(&path, state.to_value()) {
            error!(service_id = %id, path = %path, error = %e, "Failed to set discovered state value");
            return;
        }

        if let Err(e) = self.store.update_discovered(node).await {
            error!(service_id = %id, path = %path, error = %e, "Failed to update discovered tree");
        }
    }
}
