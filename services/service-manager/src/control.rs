//! Control loop for the service manager.
//!
//! The loop:
//! - Subscribes to state changes under this node's `/Services` subtree
//! - Registers the startup instances and schedules an initial sync of each
//! - Dispatches every admitted state change to `sync_service` and every
//!   instance update to `process_update`, each on its own task
//!
//! There is no ordering between dispatched tasks, including two tasks for the
//! same service.

use std::sync::Arc;

use anyhow::{Context, Result};
use corral_events::{Event, EventBus};
use corral_state::StateStore;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::Config;
use crate::filter;
use crate::instance::{ServiceInstance, ServiceInstanceUpdate};
use crate::manager::ServiceManager;
use crate::registry::Registry;

/// Dispatch loop feeding the service manager.
pub struct ControlLoop {
    manager: Arc<ServiceManager>,
    bus: Arc<dyn EventBus>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    updates_rx: mpsc::Receiver<ServiceInstanceUpdate>,
}

impl ControlLoop {
    /// Create the loop and the manager it drives.
    ///
    /// Admitted events queue without bound since the bus cannot wait on a
    /// slow loop. Instance updates use a channel of `channel_capacity` and
    /// senders wait for room.
    pub fn new(config: &Config, store: Arc<dyn StateStore>, bus: Arc<dyn EventBus>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::channel(config.channel_capacity.max(1));

        let registry = Registry::new(updates_tx, config.service_socket.clone());
        let manager = Arc::new(ServiceManager::new(config.node_id, registry, store));

        Self {
            manager,
            bus,
            events_tx,
            events_rx,
            updates_rx,
        }
    }

    /// Shared handle to the manager, for registering services at runtime.
    pub fn manager(&self) -> Arc<ServiceManager> {
        Arc::clone(&self.manager)
    }

    /// Run until shutdown is signaled.
    ///
    /// `ready` fires once the subscription is in place and every instance in
    /// `instances` has been registered and scheduled for its initial sync.
    /// Fails only if the subscription cannot be registered.
    pub async fn run(
        self,
        instances: Vec<Arc<dyn ServiceInstance>>,
        ready: oneshot::Sender<()>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let Self {
            manager,
            bus,
            events_tx,
            mut events_rx,
            mut updates_rx,
        } = self;

        let subscription = bus
            .subscribe(filter::services_listener(*manager.node_id(), events_tx))
            .context("subscribing to service state changes")?;

        info!(
            node_id = %manager.node_id(),
            subscription = %subscription,
            sock = %manager.registry().sock(),
            "Starting service manager"
        );

        for si in instances {
            manager.add_service(si).await;
        }

        let ids = manager.registry().ids().await;
        debug!(count = ids.len(), "Starting initial service sync");
        for id in ids {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                debug!(service_id = %id, "Initial service sync");
                manager.sync_service(&id).await;
            });
        }

        if ready.send(()).is_err() {
            debug!("Readiness receiver dropped");
        }

        let mut watch_shutdown = true;
        loop {
            tokio::select! {
                Some(event) = events_rx.recv() => {
                    debug!(url = %event.url(), "Processing state change event");
                    let manager = Arc::clone(&manager);
                    tokio::spawn(async move {
                        manager.process_state_change(&event).await;
                    });
                }
                Some(update) = updates_rx.recv() => {
                    debug!(service_id = %update.id, state = %update.state, "Processing service state update");
                    let manager = Arc::clone(&manager);
                    tokio::spawn(async move {
                        manager.process_update(update).await;
                    });
                }
                changed = shutdown.changed(), if watch_shutdown => {
                    // sender gone: nobody can ask us to stop any more
                    if changed.is_err() {
                        watch_shutdown = false;
                        continue;
                    }
                    let stop = *shutdown.borrow();
                    if stop {
                        info!("Service manager shutting down");
                        break;
                    }
                }
                else => {
                    info!("Service manager channels closed");
                    break;
                }
            }
        }

        bus.unsubscribe(subscription);
        Ok(())
    }
}
