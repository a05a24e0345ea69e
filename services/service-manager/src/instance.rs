//! Service instance interface.
//!
//! A service instance is a locally managed unit (a subordinate process or
//! module) that the service manager can start and stop. Instances report
//! their own runtime state back through the update channel they are handed
//! on registration.

use anyhow::Result;
use async_trait::async_trait;
use corral_id::ServiceId;
use corral_reconcile::ProcessState;
use tokio::sync::mpsc;

/// A runtime state reported by an instance about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstanceUpdate {
    pub id: ServiceId,
    pub state: ProcessState,
}

impl ServiceInstanceUpdate {
    pub fn new(id: ServiceId, state: ProcessState) -> Self {
        Self { id, state }
    }
}

/// Channel instances push their updates onto.
pub type UpdateSender = mpsc::Sender<ServiceInstanceUpdate>;

/// Capabilities the service manager needs from an instance.
#[async_trait]
pub trait ServiceInstance: Send + Sync {
    /// Unique id of the instance.
    fn id(&self) -> &ServiceId;

    /// Start the instance.
    ///
    /// Returning `Ok` means the start was issued, not that the instance is
    /// running; the instance confirms through its update channel.
    async fn start(&self) -> Result<()>;

    /// Stop the instance. Must be safe to call repeatedly.
    async fn stop(&self) -> Result<()>;

    /// Set (or, with `None`, detach) the channel updates are reported on.
    fn watch(&self, updates: Option<UpdateSender>);

    /// Set the control socket address. An empty string clears it.
    fn set_sock(&self, sock: &str);
}
