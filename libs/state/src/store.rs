//! State store interface and in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use corral_events::{Event, LocalEventBus, StateChangeType};
use corral_id::NodeId;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{NodeUrl, StatePath, StateTree, StoreError};

/// Access to the configured and discovered trees of the shared state store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a node's configured (desired) tree.
    async fn read_configured(&self, node: &NodeId) -> Result<StateTree, StoreError>;

    /// Read a node's discovered (observed) tree.
    async fn read_discovered(&self, node: &NodeId) -> Result<StateTree, StoreError>;

    /// Persist the values set on a tree obtained from `read_discovered`.
    ///
    /// Paths the caller did not set are left as they are in the store.
    async fn update_discovered(&self, tree: StateTree) -> Result<(), StoreError>;
}

/// In-memory state store.
///
/// Holds both trees for any number of nodes. When built with an event bus,
/// every configured-tree write publishes a state-change event for the
/// node-qualified URL of the written path.
#[derive(Default)]
pub struct MemoryStateStore {
    configured: RwLock<HashMap<NodeId, StateTree>>,
    discovered: RwLock<HashMap<NodeId, StateTree>>,
    events: Option<Arc<LocalEventBus>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStateStore {
    /// Create an empty store with no event publication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that publishes configured-tree changes to `bus`.
    pub fn with_event_bus(bus: Arc<LocalEventBus>) -> Self {
        Self {
            events: Some(bus),
            ..Self::default()
        }
    }

    /// Make every subsequent tree read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent discovered-tree write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Write a configured value, as an operator would.
    pub async fn set_configured(
        &self,
        node: &NodeId,
        path: &StatePath,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        let previous = {
            let mut trees = self.configured.write().await;
            trees
                .entry(*node)
                .or_insert_with(|| StateTree::new(*node))
                .set_value(path, value.clone())?
        };

        if let Some(bus) = &self.events {
            let change = if previous.is_some() {
                StateChangeType::Update
            } else {
                StateChangeType::Create
            };
            let url = NodeUrl::new(*node, path.clone()).to_string();
            bus.publish(Event::state_change(url, change, value));
        }

        Ok(())
    }

    /// Write a discovered value directly, bypassing the node agent.
    pub async fn set_discovered(
        &self,
        node: &NodeId,
        path: &StatePath,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut trees = self.discovered.write().await;
        trees
            .entry(*node)
            .or_insert_with(|| StateTree::new(*node))
            .set_value(path, value)?;
        Ok(())
    }

    pub async fn discovered_value(&self, node: &NodeId, path: &StatePath) -> Option<serde_json::Value> {
        let trees = self.discovered.read().await;
        trees.get(node).and_then(|t| t.get_value(path).ok()).cloned()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    async fn read(
        &self,
        trees: &RwLock<HashMap<NodeId, StateTree>>,
        node: &NodeId,
    ) -> Result<StateTree, StoreError> {
        self.check_reads()?;
        let trees = trees.read().await;
        Ok(trees
            .get(node)
            .map(StateTree::snapshot)
            .unwrap_or_else(|| StateTree::new(*node)))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read_configured(&self, node: &NodeId) -> Result<StateTree, StoreError> {
        self.read(&self.configured, node).await
    }

    async fn read_discovered(&self, node: &NodeId) -> Result<StateTree, StoreError> {
        self.read(&self.discovered, node).await
    }

    async fn update_discovered(&self, tree: StateTree) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        let node = *tree.node();
        let mut trees = self.discovered.write().await;
        let stored = trees.entry(node).or_insert_with(|| StateTree::new(node));

        let mut applied = 0;
        for (path, value) in tree.changes() {
            stored.set_value(path, value.clone())?;
            applied += 1;
        }

        debug!(node_id = %node, applied, "Updated discovered tree");
        Ok(())
    }
}
