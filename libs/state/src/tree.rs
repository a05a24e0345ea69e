//! Snapshot of one node's state tree.

use std::collections::{BTreeMap, BTreeSet};

use corral_id::NodeId;

use crate::{StatePath, StoreError};

/// Values of one node's tree, keyed by path.
///
/// A tree is read from a [`StateStore`](crate::StateStore), modified locally,
/// and written back. The tree remembers which paths were set since it was
/// read, and a store only applies those, so concurrent writers touching
/// different paths do not overwrite each other.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTree {
    node: NodeId,
    values: BTreeMap<StatePath, serde_json::Value>,
    changed: BTreeSet<StatePath>,
}

impl StateTree {
    /// Create an empty tree for a node.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            values: BTreeMap::new(),
            changed: BTreeSet::new(),
        }
    }

    /// Copy of this tree with no pending changes.
    pub fn snapshot(&self) -> Self {
        Self {
            node: self.node,
            values: self.values.clone(),
            changed: BTreeSet::new(),
        }
    }

    /// Node this tree belongs to.
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn get_value(&self, path: &StatePath) -> Result<&serde_json::Value, StoreError> {
        self.values
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    /// Set the value at `path`, returning the previous value.
    pub fn set_value(
        &mut self,
        path: &StatePath,
        value: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        if path.is_root() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        self.changed.insert(path.clone());
        Ok(self.values.insert(path.clone(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values set since this tree was read.
    pub fn changes(&self) -> impl Iterator<Item = (&StatePath, &serde_json::Value)> {
        self.changed
            .iter()
            .filter_map(|path| self.values.get(path).map(|value| (path, value)))
    }
}
