//! Event emitter / caching bus.
//!
//! `emit` either delivers an event to observers attached to its target
//! entity or absorbs it into that entity's backlog for later replay.
//! Force events (disconnect, nick-in-use, server-switch) are additionally
//! posted to the server-wide observer set regardless of liveness.
//!
//! Delivery crosses from the protocol task to a consumer exactly once,
//! through the unbounded channel handed out by [`EventBus::attach`]; a
//! single lock serializes emission against attach/detach, so events for
//! one entity always reach an observer in production order.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::entity::EntityId;
use crate::event::Event;

#[derive(Default)]
struct Slot {
    observers: Vec<mpsc::UnboundedSender<Event>>,
    backlog: Vec<Event>,
}

impl Slot {
    /// Send to every live observer, dropping the ones whose receiver is
    /// gone. Returns whether at least one delivery happened.
    fn deliver(&mut self, event: &Event) -> bool {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
        !self.observers.is_empty()
    }
}

/// The synchronization point between the protocol task and consumers.
#[derive(Default)]
pub struct EventBus {
    slots: Mutex<HashMap<EntityId, Slot>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> EventBus {
        EventBus::default()
    }

    /// Attach an observer to an entity, marking it live.
    ///
    /// Any backlog is drained into the returned channel in original order
    /// before this call returns, so a late-attaching observer never sees a
    /// live event ahead of the history that preceded it.
    pub fn attach(&self, id: &EntityId) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slots = self.slots.lock();
        let slot = slots.entry(id.clone()).or_default();
        for event in slot.backlog.drain(..) {
            // Receiver is still in scope; an unbounded send cannot fail here.
            let _ = tx.send(event);
        }
        slot.observers.push(tx);
        rx
    }

    /// Detach all observers from an entity; later events go to its backlog.
    pub fn detach(&self, id: &EntityId) {
        if let Some(slot) = self.slots.lock().get_mut(id) {
            slot.observers.clear();
        }
    }

    /// Whether a live observer is currently attached to an entity.
    pub fn is_attached(&self, id: &EntityId) -> bool {
        self.slots
            .lock()
            .get(id)
            .is_some_and(|slot| !slot.observers.is_empty())
    }

    /// Drop an entity's slot entirely, discarding any backlog.
    ///
    /// Used when the entity itself is removed (part, kick, query close).
    pub fn forget(&self, id: &EntityId) {
        self.slots.lock().remove(id);
    }

    /// Deliver an event live or absorb it into the target's backlog.
    pub fn emit(&self, event: Event) {
        let mut slots = self.slots.lock();

        if event.kind.is_force() {
            // Force-post to the server-wide set; when nobody observes the
            // server, the one backlog copy preserves the failure report.
            let slot = slots.entry(EntityId::Server).or_default();
            if !slot.deliver(&event) {
                slot.backlog.push(event.clone());
            }
            if event.target == EntityId::Server {
                return;
            }
        }

        let slot = slots.entry(event.target.clone()).or_default();
        if !slot.deliver(&event) {
            slot.backlog.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn message(target: EntityId, text: &str) -> Event {
        Event::new(
            target,
            text,
            EventKind::ChannelMessage {
                nick: "alice".into(),
                text: text.into(),
                mention: false,
            },
        )
    }

    #[test]
    fn test_live_delivery_in_order() {
        let bus = EventBus::new();
        let id = EntityId::Channel("#rust".into());
        let mut rx = bus.attach(&id);

        bus.emit(message(id.clone(), "one"));
        bus.emit(message(id.clone(), "two"));

        assert_eq!(rx.try_recv().unwrap().message, "one");
        assert_eq!(rx.try_recv().unwrap().message, "two");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_backlog_drained_on_attach() {
        let bus = EventBus::new();
        let id = EntityId::Channel("#rust".into());

        bus.emit(message(id.clone(), "one"));
        bus.emit(message(id.clone(), "two"));

        let mut rx = bus.attach(&id);
        bus.emit(message(id.clone(), "three"));

        // Backlog replays before the live event, production order intact.
        assert_eq!(rx.try_recv().unwrap().message, "one");
        assert_eq!(rx.try_recv().unwrap().message, "two");
        assert_eq!(rx.try_recv().unwrap().message, "three");
    }

    #[test]
    fn test_detach_resumes_backlogging() {
        let bus = EventBus::new();
        let id = EntityId::Channel("#rust".into());

        let mut rx = bus.attach(&id);
        bus.emit(message(id.clone(), "live"));
        assert_eq!(rx.try_recv().unwrap().message, "live");

        bus.detach(&id);
        bus.emit(message(id.clone(), "cached"));
        assert!(rx.try_recv().is_err());

        let mut rx2 = bus.attach(&id);
        assert_eq!(rx2.try_recv().unwrap().message, "cached");
    }

    #[test]
    fn test_exactly_once_no_duplication() {
        let bus = EventBus::new();
        let id = EntityId::Channel("#rust".into());

        bus.emit(message(id.clone(), "early"));
        let mut rx = bus.attach(&id);
        assert_eq!(rx.try_recv().unwrap().message, "early");
        // The drained entry is gone; a reattach must not replay it.
        bus.detach(&id);
        let mut rx2 = bus.attach(&id);
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_force_event_reaches_server_observer() {
        let bus = EventBus::new();
        let mut server_rx = bus.attach(&EntityId::Server);

        bus.emit(Event::new(
            EntityId::Server,
            "connection lost",
            EventKind::Disconnected {
                reason: "eof".into(),
            },
        ));

        let event = server_rx.try_recv().unwrap();
        assert!(matches!(event.kind, EventKind::Disconnected { .. }));
        // Delivered once, not once live plus once more.
        assert!(server_rx.try_recv().is_err());
    }

    #[test]
    fn test_force_event_backlogged_when_detached() {
        let bus = EventBus::new();
        bus.emit(Event::new(
            EntityId::Server,
            "connection lost",
            EventKind::Disconnected {
                reason: "eof".into(),
            },
        ));

        let mut rx = bus.attach(&EntityId::Server);
        assert!(matches!(
            rx.try_recv().unwrap().kind,
            EventKind::Disconnected { .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_counts_as_detached() {
        let bus = EventBus::new();
        let id = EntityId::Channel("#rust".into());

        let rx = bus.attach(&id);
        drop(rx);

        bus.emit(message(id.clone(), "after drop"));
        let mut rx2 = bus.attach(&id);
        assert_eq!(rx2.try_recv().unwrap().message, "after drop");
    }

    #[test]
    fn test_forget_discards_backlog() {
        let bus = EventBus::new();
        let id = EntityId::Query("alice".into());

        bus.emit(message(id.clone(), "hi"));
        bus.forget(&id);

        let mut rx = bus.attach(&id);
        assert!(rx.try_recv().is_err());
    }
}
