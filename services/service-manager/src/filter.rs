//! Event subscription filter for this node's services subtree.
//!
//! Only state changes under `<this node>/Services/...` reach the control
//! loop; every other event in the shared tree is dropped at the bus.

use corral_events::{chan_sender, Event, EventListener, EventType};
use corral_id::NodeId;
use corral_state::{service_id_from_path, NodeUrl};
use tokio::sync::mpsc;

/// Name the service manager subscribes under.
pub const LISTENER_NAME: &str = "ServiceManager";

/// Returns true if `event` addresses a service under `<node>/Services`.
///
/// Uses the same URL and path parsing as the manager, so every admitted
/// event resolves to a service id.
pub fn admits(node: &NodeId, event: &Event) -> bool {
    match NodeUrl::parse(event.url()) {
        Ok(url) => url.node == *node && service_id_from_path(&url.path).is_ok(),
        Err(_) => false,
    }
}

/// Build the state-change listener that forwards admitted events to `tx`.
pub fn services_listener(node: NodeId, tx: mpsc::UnboundedSender<Event>) -> EventListener {
    EventListener::new(
        LISTENER_NAME,
        EventType::StateChange,
        move |event: &Event| admits(&node, event),
        chan_sender(tx),
    )
}
