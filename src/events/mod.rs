//! Synchronous publish/subscribe bus
//!
//! Listeners are grouped by [`EventKind`] and called in subscription order on
//! the publishing thread. A failing listener aborts the publish and its error
//! reaches the publisher; later listeners for that call are skipped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

/// Events carried by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An armed episode ended, by timeout or after a command ran
    Settled,

    /// A command changed these lights
    LightsChanged {
        /// Hue light ids touched by the command
        light_ids: Vec<u32>,
    },
}

/// Subscription key for an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Settled,
    LightsChanged,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Settled => EventKind::Settled,
            Event::LightsChanged { .. } => EventKind::LightsChanged,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Settled => write!(f, "SETTLED"),
            Event::LightsChanged { light_ids } => write!(f, "LIGHTS_CHANGED {:?}", light_ids),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Settled => write!(f, "settled"),
            EventKind::LightsChanged => write!(f, "lights_changed"),
        }
    }
}

/// A bus callback. Identity is the `Rc` allocation, so keep a clone around to
/// unsubscribe later.
pub type Listener = Rc<dyn Fn(&Event) -> anyhow::Result<()>>;

/// Errors reported by the bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("listener is not subscribed to {event}")]
    NotSubscribed { event: EventKind },

    #[error("listener for {event} failed")]
    Listener {
        event: EventKind,
        #[source]
        source: anyhow::Error,
    },
}

/// Event bus owned by the driving thread and shared by `Rc`
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<EventKind, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. The same listener may be added more than once and
    /// is then called once per subscription.
    pub fn subscribe(&self, event: EventKind, listener: Listener) {
        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(listener);
        debug!(%event, "listener subscribed");
    }

    /// Remove the first subscription of `listener` for `event`
    pub fn unsubscribe(&self, event: EventKind, listener: &Listener) -> Result<(), BusError> {
        let mut listeners = self.listeners.borrow_mut();
        let list = listeners
            .get_mut(&event)
            .ok_or(BusError::NotSubscribed { event })?;
        let index = list
            .iter()
            .position(|l| Rc::ptr_eq(l, listener))
            .ok_or(BusError::NotSubscribed { event })?;
        list.remove(index);
        debug!(%event, "listener unsubscribed");
        Ok(())
    }

    /// Call every listener subscribed to the event's kind, in order
    pub fn publish(&self, event: &Event) -> Result<(), BusError> {
        let kind = event.kind();

        // Snapshot so listeners may touch the bus while being called
        let snapshot: Vec<Listener> = match self.listeners.borrow().get(&kind) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return Ok(()),
        };

        debug!(%event, listeners = snapshot.len(), "publishing event");

        for listener in snapshot {
            listener(event).map_err(|source| BusError::Listener { event: kind, source })?;
        }

        Ok(())
    }

    /// Number of live subscriptions for an event kind
    pub fn listener_count(&self, event: EventKind) -> usize {
        self.listeners.borrow().get(&event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Rc::clone(log);
        Rc::new(move |_event: &Event| -> anyhow::Result<()> {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_publish_calls_listener_with_payload() {
        let bus = EventBus::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        bus.subscribe(
            EventKind::LightsChanged,
            Rc::new(move |event: &Event| -> anyhow::Result<()> {
                if let Event::LightsChanged { light_ids } = event {
                    sink.borrow_mut().extend(light_ids.iter().copied());
                }
                Ok(())
            }),
        );

        bus.publish(&Event::LightsChanged { light_ids: vec![4, 5] })
            .unwrap();
        assert_eq!(*received.borrow(), vec![4, 5]);
    }

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.subscribe(EventKind::Settled, recorder(&log, "a"));
        bus.subscribe(EventKind::Settled, recorder(&log, "b"));

        bus.publish(&Event::Settled).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_subscription_called_twice() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let listener = recorder(&log, "x");
        bus.subscribe(EventKind::Settled, Rc::clone(&listener));
        bus.subscribe(EventKind::Settled, Rc::clone(&listener));

        bus.publish(&Event::Settled).unwrap();
        assert_eq!(log.borrow().len(), 2);

        // Unsubscribe removes one occurrence only
        bus.unsubscribe(EventKind::Settled, &listener).unwrap();
        assert_eq!(bus.listener_count(EventKind::Settled), 1);
        bus.publish(&Event::Settled).unwrap();
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_unsubscribe_stops_listener() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let listener = recorder(&log, "a");
        bus.subscribe(EventKind::Settled, Rc::clone(&listener));
        bus.unsubscribe(EventKind::Settled, &listener).unwrap();

        bus.publish(&Event::Settled).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_listener_fails() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let subscribed = recorder(&log, "a");
        let stranger = recorder(&log, "a");

        let err = bus.unsubscribe(EventKind::Settled, &stranger).unwrap_err();
        assert!(matches!(err, BusError::NotSubscribed { event: EventKind::Settled }));

        // Subscribed under another kind does not count
        bus.subscribe(EventKind::LightsChanged, Rc::clone(&subscribed));
        assert!(bus.unsubscribe(EventKind::Settled, &subscribed).is_err());

        // Equal behaviour is not identity
        bus.subscribe(EventKind::Settled, subscribed);
        assert!(bus.unsubscribe(EventKind::Settled, &stranger).is_err());
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(&Event::Settled).unwrap();
        bus.publish(&Event::LightsChanged { light_ids: vec![1] })
            .unwrap();
    }

    #[test]
    fn test_listeners_independent_per_event() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.subscribe(EventKind::LightsChanged, recorder(&log, "lights"));

        bus.publish(&Event::Settled).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_failing_listener_aborts_publish() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.subscribe(EventKind::Settled, recorder(&log, "first"));
        bus.subscribe(
            EventKind::Settled,
            Rc::new(|_event: &Event| -> anyhow::Result<()> { Err(anyhow::anyhow!("boom")) }),
        );
        bus.subscribe(EventKind::Settled, recorder(&log, "never"));

        let err = bus.publish(&Event::Settled).unwrap_err();
        assert!(matches!(err, BusError::Listener { event: EventKind::Settled, .. }));
        assert_eq!(*log.borrow(), vec!["first"]);
    }

    #[test]
    fn test_listener_may_subscribe_during_publish() {
        let bus = Rc::new(EventBus::new());
        let calls = Rc::new(Cell::new(0));

        let inner_bus = Rc::clone(&bus);
        let inner_calls = Rc::clone(&calls);
        bus.subscribe(
            EventKind::Settled,
            Rc::new(move |_event: &Event| -> anyhow::Result<()> {
                inner_calls.set(inner_calls.get() + 1);
                let counter = Rc::clone(&inner_calls);
                inner_bus.subscribe(
                    EventKind::Settled,
                    Rc::new(move |_event: &Event| -> anyhow::Result<()> {
                        counter.set(counter.get() + 10);
                        Ok(())
                    }),
                );
                Ok(())
            }),
        );

        // The new subscription is not part of the running publish
        bus.publish(&Event::Settled).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(bus.listener_count(EventKind::Settled), 2);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(Event::Settled.to_string(), "SETTLED");
        assert_eq!(
            Event::LightsChanged { light_ids: vec![5, 6] }.to_string(),
            "LIGHTS_CHANGED [5, 6]"
        );
    }
}
