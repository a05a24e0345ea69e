//! Test doubles for corral integration tests.
//!
//! - [`RecordingService`]: a service instance that counts the starts and
//!   stops it receives and reports state only when told to
//! - [`wait_for`]: poll an async condition until it holds or times out

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use corral_id::ServiceId;
use corral_reconcile::ProcessState;
use corral_service_manager::{ServiceInstance, ServiceInstanceUpdate, UpdateSender};

/// Service instance that records the calls it receives.
pub struct RecordingService {
    id: ServiceId,
    updates: Mutex<Option<UpdateSender>>,
    sock: Mutex<String>,
    starts: AtomicU64,
    stops: AtomicU64,
    auto_report: bool,
    fail_start: AtomicBool,
}

impl RecordingService {
    /// A service that never reports on its own.
    pub fn new(id: &str) -> Self {
        Self {
            id: ServiceId::parse(id).expect("valid service id"),
            updates: Mutex::new(None),
            sock: Mutex::new(String::new()),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
            auto_report: false,
            fail_start: AtomicBool::new(false),
        }
    }

    /// A service that reports `RUN` after each start and `STOP` after each stop.
    pub fn auto_reporting(id: &str) -> Self {
        Self {
            auto_report: true,
            ..Self::new(id)
        }
    }

    pub fn service_id(&self) -> ServiceId {
        self.id.clone()
    }

    /// Make subsequent starts return an error.
    pub fn fail_starts(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_watched(&self) -> bool {
        self.updates.lock().unwrap().is_some()
    }

    pub fn sock(&self) -> String {
        self.sock.lock().unwrap().clone()
    }

    /// Report a runtime state. Returns false if no channel is attached.
    pub async fn report(&self, state: ProcessState) -> bool {
        let updates = self.updates.lock().unwrap().clone();
        match updates {
            Some(tx) => tx
                .send(ServiceInstanceUpdate::new(self.id.clone(), state))
                .await
                .is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl ServiceInstance for RecordingService {
    fn id(&self) -> &ServiceId {
        &self.id
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            anyhow::bail!("start failed");
        }
        if self.auto_report {
            self.report(ProcessState::Run).await;
        }
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.auto_report {
            self.report(ProcessState::Stop).await;
        }
        Ok(())
    }

    fn watch(&self, updates: Option<UpdateSender>) {
        *self.updates.lock().unwrap() = updates;
    }

    fn set_sock(&self, sock: &str) {
        *self.sock.lock().unwrap() = sock.to_string();
    }
}

/// Poll `cond` every few milliseconds until it returns true.
///
/// Returns false if `timeout` elapses first.
pub async fn wait_for<F, Fut>(timeout: Duration, mut cond: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
