//! Registry of service instances managed on this node.

use std::collections::HashMap;
use std::sync::Arc;

use corral_id::ServiceId;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::instance::{ServiceInstance, UpdateSender};

/// Thread-safe map of service ids to registered instances.
///
/// Registration hands the instance the manager's update channel and control
/// socket; deregistration takes both away again.
pub struct Registry {
    services: Mutex<HashMap<ServiceId, Arc<dyn ServiceInstance>>>,
    updates: UpdateSender,
    sock: String,
}

impl Registry {
    pub fn new(updates: UpdateSender, sock: impl Into<String>) -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
            updates,
            sock: sock.into(),
        }
    }

    /// Control socket handed to registered instances.
    pub fn sock(&self) -> &str {
        &self.sock
    }

    /// Register an instance under its id.
    ///
    /// Registering an id twice is an error on the caller's side; it is logged
    /// and the new instance replaces the old one.
    pub async fn add_service(&self, si: Arc<dyn ServiceInstance>) {
        let mut services = self.services.lock().await;
        let id = si.id().clone();

        if services.contains_key(&id) {
            error!(service_id = %id, "Tried to add service that already exists");
        }

        si.watch(Some(self.updates.clone()));
        si.set_sock(&self.sock);
        services.insert(id.clone(), si);
        debug!(service_id = %id, "Service registered");
    }

    /// Deregister an instance, returning it to the caller.
    pub async fn del_service(&self, id: &ServiceId) -> Option<Arc<dyn ServiceInstance>> {
        let mut services = self.services.lock().await;
        let si = services.remove(id)?;

        si.watch(None);
        si.set_sock("");
        debug!(service_id = %id, "Service deregistered");
        Some(si)
    }

    pub async fn get_service(&self, id: &ServiceId) -> Option<Arc<dyn ServiceInstance>> {
        let services = self.services.lock().await;
        services.get(id).cloned()
    }

    /// Snapshot of the registered ids.
    pub async fn ids(&self) -> Vec<ServiceId> {
        let services = self.services.lock().await;
        services.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.services.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.services.lock().await.is_empty()
    }
}
