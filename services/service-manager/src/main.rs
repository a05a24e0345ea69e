//! corral Service Manager
//!
//! Keeps this node's service instances converged on the state configured for
//! them, and records their reported runtime state.
//!
//! Runs against the in-memory state store and event bus with mock service
//! instances (`CORRAL_SERVICES`).

use std::sync::Arc;

use anyhow::{Context, Result};
use corral_events::LocalEventBus;
use corral_service_manager::{Config, ControlLoop, MockService, ServiceInstance};
use corral_state::MemoryStateStore;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("loading configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.as_str().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        node_id = %config.node_id,
        service_socket = %config.service_socket,
        services = config.services.len(),
        "Starting corral service manager"
    );

    let bus = Arc::new(LocalEventBus::new());
    let store = Arc::new(MemoryStateStore::with_event_bus(Arc::clone(&bus)));

    let instances: Vec<Arc<dyn ServiceInstance>> = config
        .services
        .iter()
        .map(|id| Arc::new(MockService::new(id.clone())) as Arc<dyn ServiceInstance>)
        .collect();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (ready_tx, ready_rx) = oneshot::channel();

    let control = ControlLoop::new(&config, store, bus);
    let mut control_handle =
        tokio::spawn(async move { control.run(instances, ready_tx, shutdown_rx).await });

    if ready_rx.await.is_ok() {
        info!("Service manager ready");
    }

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            None
        }
        result = &mut control_handle => Some(result),
    };

    let result = match result {
        Some(result) => result,
        None => control_handle.await,
    };

    match result {
        Ok(Ok(())) => info!("Service manager exited"),
        Ok(Err(e)) => error!(error = %e, "Service manager error"),
        Err(e) => error!(error = %e, "Service manager task panicked"),
    }

    info!("Service manager shutdown complete");
    Ok(())
}
