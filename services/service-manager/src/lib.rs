//! corral Service Manager Library
//!
//! The service manager runs on every node and keeps the node's service
//! instances in the state configured for them in the shared state tree.
//! Instances report their runtime state back, and the manager records it in
//! the discovered tree.
//!
//! ## Architecture
//!
//! ```text
//! configured tree ──► EventBus ──► filter ──► ControlLoop ──► ServiceManager::sync_service
//!                                                 ▲                  │ start / stop
//!                                                 │                  ▼
//! discovered tree ◄── ServiceManager::process_update ◄──────── ServiceInstance
//! ```
//!
//! ## Modules
//!
//! - `control`: dispatch loop and startup sequence
//! - `filter`: state-change subscription for this node's services subtree
//! - `manager`: reconciliation and update processing
//! - `registry`: registered service instances
//! - `instance`: service instance interface
//! - `mock`: mock service instance for development

pub mod config;
pub mod control;
pub mod filter;
pub mod instance;
pub mod manager;
pub mod mock;
pub mod registry;

// Re-export commonly used types
pub use config::Config;
pub use control::ControlLoop;
pub use instance::{ServiceInstance, ServiceInstanceUpdate, UpdateSender};
pub use manager::ServiceManager;
pub use mock::MockService;
pub use registry::Registry;
