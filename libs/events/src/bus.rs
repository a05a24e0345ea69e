//! Event bus subscription interface and an in-process implementation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Event, EventError, EventType};

/// Predicate deciding whether a listener receives an event.
pub type EventFilter = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// Handler invoked with every admitted event.
pub type EventHandler = Box<dyn Fn(Event) -> Result<(), EventError> + Send + Sync>;

/// A subscription request: which events to receive and where to put them.
pub struct EventListener {
    name: String,
    kind: EventType,
    filter: EventFilter,
    handler: EventHandler,
}

impl EventListener {
    /// Create a listener for events of `kind` admitted by `filter`.
    pub fn new<F, H>(name: impl Into<String>, kind: EventType, filter: F, handler: H) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
        H: Fn(Event) -> Result<(), EventError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            filter: Box::new(filter),
            handler: Box::new(handler),
        }
    }

    /// Listener name (used in logs).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event kind this listener receives.
    pub fn kind(&self) -> EventType {
        self.kind
    }

    /// Run the listener's predicate.
    pub fn admits(&self, event: &Event) -> bool {
        event.kind == self.kind && (self.filter)(event)
    }

    /// Deliver an event to the listener's handler.
    pub fn deliver(&self, event: Event) -> Result<(), EventError> {
        (self.handler)(event)
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Build a handler that forwards events onto an unbounded channel.
///
/// Delivery never blocks the bus and never drops an admitted event. The only
/// failure is a receiver that has gone away.
pub fn chan_sender(
    tx: mpsc::UnboundedSender<Event>,
) -> impl Fn(Event) -> Result<(), EventError> + Send + Sync {
    move |event: Event| {
        tx.send(event)
            .map_err(|mpsc::error::SendError(ev)| EventError::ChannelClosed(ev.url))
    }
}

/// Identifier of a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Subscription side of an event bus.
pub trait EventBus: Send + Sync {
    /// Register a listener. Listener names must be unique.
    fn subscribe(&self, listener: EventListener) -> Result<SubscriptionId, EventError>;

    /// Remove a subscription. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// In-process event bus.
///
/// `publish` runs every matching listener's handler synchronously on the
/// caller's thread. Handler failures are logged and do not affect other
/// listeners.
#[derive(Debug, Default)]
pub struct LocalEventBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, EventListener)>>,
}

impl LocalEventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to all admitting listeners.
    ///
    /// Returns the number of listeners the event was delivered to.
    pub fn publish(&self, event: Event) -> usize {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;

        for (id, listener) in listeners.iter() {
            if !listener.admits(&event) {
                continue;
            }

            match listener.deliver(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        subscription = %id,
                        listener = listener.name(),
                        url = %event.url,
                        error = %e,
                        "Failed to deliver event"
                    );
                }
            }
        }

        debug!(kind = %event.kind, url = %event.url, delivered, "Published event");
        delivered
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl EventBus for LocalEventBus {
    fn subscribe(&self, listener: EventListener) -> Result<SubscriptionId, EventError> {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());

        if listeners.iter().any(|(_, l)| l.name() == listener.name()) {
            return Err(EventError::DuplicateListener(listener.name().to_string()));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(subscription = %id, listener = listener.name(), kind = %listener.kind(), "Subscribed");
        listeners.push((id, listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        before != listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StateChangeType;

    fn change(url: &str) -> Event {
        Event::state_change(url, StateChangeType::Update, serde_json::json!("RUN"))
    }

    #[test]
    fn test_publish_respects_kind_and_filter() {
        let bus = LocalEventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        bus.subscribe(EventListener::new(
            "services",
            EventType::StateChange,
            |e: &Event| e.url().contains("/Services/"),
            chan_sender(tx),
        ))
        .unwrap();

        assert_eq!(bus.publish(change("n/Services/a/State")), 1);
        assert_eq!(bus.publish(change("n/Arch")), 0);
        assert_eq!(
            bus.publish(Event::raw(EventType::Discovery, "n/Services/a/State", serde_json::json!(1))),
            0
        );

        let got = rx.try_recv().unwrap();
        assert_eq!(got.url(), "n/Services/a/State");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = LocalEventBus::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = bus
            .subscribe(EventListener::new("l", EventType::StateChange, |_: &Event| true, chan_sender(tx)))
            .unwrap();

        assert_eq!(bus.listener_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(change("n/Services/a/State")), 0);
    }

    #[test]
    fn test_duplicate_listener_rejected() {
        let bus = LocalEventBus::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        bus.subscribe(EventListener::new("l", EventType::StateChange, |_: &Event| true, chan_sender(tx.clone())))
            .unwrap();

        let result = bus.subscribe(EventListener::new("l", EventType::StateChange, |_: &Event| true, chan_sender(tx)));
        assert_eq!(result, Err(EventError::DuplicateListener("l".to_string())));
    }

    #[test]
    fn test_chan_sender_keeps_every_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let send = chan_sender(tx);

        for i in 0..100 {
            assert!(send(change(&format!("n/Services/s{i}/State"))).is_ok());
        }

        let mut received = 0;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.url(), format!("n/Services/s{received}/State"));
            received += 1;
        }
        assert_eq!(received, 100);
    }

    #[test]
    fn test_chan_sender_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let send = chan_sender(tx);

        drop(rx);
        assert_eq!(send(change("c")), Err(EventError::ChannelClosed("c".to_string())));
    }
}
