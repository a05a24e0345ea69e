//! State tree access for corral nodes.
//!
//! Every node has two parallel trees in the shared state store:
//! - the **configured** tree holds desired state, written by operators
//! - the **discovered** tree holds observed state, written by node agents
//!
//! Values are addressed by hierarchical [`StatePath`]s relative to the node
//! (`/Services/pxe/State`). Event URLs qualify a path with its node
//! ([`NodeUrl`], `<node_id>/Services/pxe/State`).
//!
//! ## Modules
//!
//! - `path`: typed paths, node URLs, and service path helpers
//! - `tree`: a snapshot of one node's tree
//! - `store`: the store interface and an in-memory implementation

mod error;
mod path;
mod store;
mod tree;

pub use error::{PathError, StoreError};
pub use path::{service_id_from_path, service_state_path, NodeUrl, StatePath, SERVICES_ROOT, STATE_KEY};
pub use store::{MemoryStateStore, StateStore};
pub use tree::StateTree;
