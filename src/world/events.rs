//! Publish/subscribe point for cross-cutting notifications.
//!
//! Listeners run synchronously, in registration order, when an event is
//! emitted. Every event is also queued so the world can resolve its effects
//! (damage, despawns) at a well-defined point of the tick.

use std::collections::{HashMap, VecDeque};

use crate::world::coords::Position;
use crate::world::entities::EntityId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Attack,
    Death,
    Collision,
    Interaction,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    None,
    Damage(f32),
    ImpactForce(f32),
    /// Where the subject died
    Remains(Position),
    Message(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub source: EntityId,
    pub target: Option<EntityId>,
    pub payload: EventPayload,
}

impl Event {
    pub fn attack(source: EntityId, target: EntityId, damage: f32) -> Self {
        Self { kind: EventKind::Attack, source, target: Some(target), payload: EventPayload::Damage(damage) }
    }

    /// `source` killed `target` (source == target for deaths by need).
    pub fn death(source: EntityId, target: EntityId, at: Position) -> Self {
        Self { kind: EventKind::Death, source, target: Some(target), payload: EventPayload::Remains(at) }
    }

    pub fn collision(source: EntityId, target: EntityId, force: f32) -> Self {
        Self { kind: EventKind::Collision, source, target: Some(target), payload: EventPayload::ImpactForce(force) }
    }

    pub fn interaction(source: EntityId, target: Option<EntityId>, message: impl Into<String>) -> Self {
        Self { kind: EventKind::Interaction, source, target, payload: EventPayload::Message(message.into()) }
    }
}

pub type Listener = Box<dyn FnMut(&Event)>;

#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<Listener>>,
    pending: VecDeque<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, listener: impl FnMut(&Event) + 'static) {
        self.listeners.entry(kind).or_default().push(Box::new(listener));
    }

    /// Notify listeners for the event's kind, then queue it for resolution.
    pub fn emit(&mut self, event: Event) {
        if let Some(listeners) = self.listeners.get_mut(&event.kind) {
            for listener in listeners.iter_mut() {
                listener(&event);
            }
        }
        self.pending.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.values().map(Vec::len).sum::<usize>())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_listeners_run_in_registration_order() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            bus.subscribe(EventKind::Attack, move |_| log.borrow_mut().push(tag));
        }

        bus.emit(Event::attack(EntityId(1), EntityId(2), 5.0));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_listeners_only_see_their_kind() {
        let mut bus = EventBus::new();
        let deaths = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&deaths);
        bus.subscribe(EventKind::Death, move |event| {
            assert_eq!(event.kind, EventKind::Death);
            *counter.borrow_mut() += 1;
        });

        bus.emit(Event::attack(EntityId(1), EntityId(2), 5.0));
        bus.emit(Event::collision(EntityId(1), EntityId(2), 1.0));
        bus.emit(Event::death(EntityId(1), EntityId(2), Position::default()));
        assert_eq!(*deaths.borrow(), 1);
        assert_eq!(bus.listener_count(EventKind::Death), 1);
        assert_eq!(bus.listener_count(EventKind::Attack), 0);
    }

    #[test]
    fn test_events_are_queued_in_order() {
        let mut bus = EventBus::new();
        bus.emit(Event::interaction(EntityId(3), None, "greet"));
        bus.emit(Event::attack(EntityId(1), EntityId(2), 5.0));
        assert_eq!(bus.pending(), 2);

        let drained = bus.drain();
        assert_eq!(drained[0].kind, EventKind::Interaction);
        assert_eq!(drained[1].payload, EventPayload::Damage(5.0));
        assert_eq!(bus.pending(), 0);
    }
}
