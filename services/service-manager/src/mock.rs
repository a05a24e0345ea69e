//! Mock service instance.
//!
//! Stands in for a real service module in development and tests:
//! - `start` simulates startup and reports `RUN`
//! - `stop` simulates shutdown and reports `STOP`
//! - a failing mock reports `ERROR` on every start

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use corral_id::ServiceId;
use corral_reconcile::ProcessState;
use tracing::{debug, info, warn};

use crate::instance::{ServiceInstance, ServiceInstanceUpdate, UpdateSender};

/// Mock service instance for testing and development.
pub struct MockService {
    id: ServiceId,

    /// Channel updates are reported on (None when not registered).
    updates: Mutex<Option<UpdateSender>>,

    /// Control socket assigned by the registry.
    sock: Mutex<String>,

    /// Simulated startup time.
    startup_delay: Duration,

    /// Whether starts should "fail".
    fail_starts: bool,

    starts: AtomicU64,
    stops: AtomicU64,
}

impl MockService {
    /// Create a mock that starts successfully.
    pub fn new(id: ServiceId) -> Self {
        Self {
            id,
            updates: Mutex::new(None),
            sock: Mutex::new(String::new()),
            startup_delay: Duration::from_millis(100),
            fail_starts: false,
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    /// Create a mock that fails all starts.
    pub fn failing(id: ServiceId) -> Self {
        Self {
            fail_starts: true,
            ..Self::new(id)
        }
    }

    /// Override the simulated startup time.
    #[must_use]
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }

    /// Whether an update channel is attached.
    pub fn is_watched(&self) -> bool {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Current control socket.
    pub fn sock(&self) -> String {
        self.sock.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn report(&self, state: ProcessState) {
        let updates = self
            .updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let Some(updates) = updates else {
            debug!(service_id = %self.id, state = %state, "[MOCK] Not watched, dropping report");
            return;
        };

        if let Err(e) = updates
            .send(ServiceInstanceUpdate::new(self.id.clone(), state))
            .await
        {
            warn!(service_id = %self.id, error = %e, "[MOCK] Failed to report state");
        }
    }
}

#[async_trait]
impl ServiceInstance for MockService {
    fn id(&self) -> &ServiceId {
        &self.id
    }

    async fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        if self.fail_starts {
            self.report(ProcessState::Error).await;
            anyhow::bail!("Mock service configured to fail");
        }

        info!(service_id = %self.id, sock = %self.sock(), "[MOCK] Starting service");

        // Simulate some startup delay
        tokio::time::sleep(self.startup_delay).await;

        self.report(ProcessState::Run).await;
        debug!(service_id = %self.id, "[MOCK] Service started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        info!(service_id = %self.id, "[MOCK] Stopping service");

        self.report(ProcessState::Stop).await;
        debug!(service_id = %self.id, "[MOCK] Service stopped");
        Ok(())
    }

    fn watch(&self, updates: Option<UpdateSender>) {
        *self.updates.lock().unwrap_or_else(|e| e.into_inner()) = updates;
    }

    fn set_sock(&self, sock: &str) {
        *self.sock.lock().unwrap_or_else(|e| e.into_inner()) = sock.to_string();
    }
}
