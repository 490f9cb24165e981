//! Canonical player events and the event bus
//!
//! Every event the player emits is a [`PlayerEvent`] variant carrying its own
//! payload type. Listeners subscribe per [`EventKind`] and are invoked in
//! registration order.

use crate::{Error, MediaLevel, PlaybackState, PlaybackStatus, VolumeState};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Canonical event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    LoadStart,
    DurationChange,
    TimeUpdate,
    RateChange,
    VolumeChange,
    StatusChange,
    Error,
    Levels,
    LevelChange,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::LoadStart,
        EventKind::DurationChange,
        EventKind::TimeUpdate,
        EventKind::RateChange,
        EventKind::VolumeChange,
        EventKind::StatusChange,
        EventKind::Error,
        EventKind::Levels,
        EventKind::LevelChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LoadStart => "loadstart",
            EventKind::DurationChange => "durationchange",
            EventKind::TimeUpdate => "timeupdate",
            EventKind::RateChange => "ratechange",
            EventKind::VolumeChange => "volumechange",
            EventKind::StatusChange => "statuschange",
            EventKind::Error => "error",
            EventKind::Levels => "levels",
            EventKind::LevelChange => "levelchange",
        }
    }

    /// Look up a kind by its event name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted by the player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Media started loading; carries the full playback state
    LoadStart(PlaybackState),
    /// New duration in seconds
    DurationChange(f64),
    /// New position in seconds
    TimeUpdate(f64),
    /// New playback rate
    RateChange(f64),
    VolumeChange(VolumeState),
    StatusChange(PlaybackStatus),
    /// Asynchronous playback or streaming failure
    Error(Error),
    /// Renditions available for the attached stream
    Levels(Vec<MediaLevel>),
    /// Index of the rendition now playing
    LevelChange(usize),
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::LoadStart(_) => EventKind::LoadStart,
            PlayerEvent::DurationChange(_) => EventKind::DurationChange,
            PlayerEvent::TimeUpdate(_) => EventKind::TimeUpdate,
            PlayerEvent::RateChange(_) => EventKind::RateChange,
            PlayerEvent::VolumeChange(_) => EventKind::VolumeChange,
            PlayerEvent::StatusChange(_) => EventKind::StatusChange,
            PlayerEvent::Error(_) => EventKind::Error,
            PlayerEvent::Levels(_) => EventKind::Levels,
            PlayerEvent::LevelChange(_) => EventKind::LevelChange,
        }
    }
}

/// Handle returned by [`EventBus::on`] and [`EventBus::once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<dyn Fn(&PlayerEvent)>;

struct Listener {
    id: ListenerId,
    callback: Callback,
    once: bool,
}

/// Single-threaded event bus.
///
/// Emission works on a snapshot of the listener list, so listeners may
/// subscribe, unsubscribe or emit while being invoked.
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<EventKind, Vec<Listener>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event of `kind`
    pub fn on(&self, kind: EventKind, callback: impl Fn(&PlayerEvent) + 'static) -> ListenerId {
        self.add(kind, Rc::new(callback), false)
    }

    /// Subscribe to the next event of `kind` only
    pub fn once(&self, kind: EventKind, callback: impl Fn(&PlayerEvent) + 'static) -> ListenerId {
        self.add(kind, Rc::new(callback), true)
    }

    /// Unsubscribe; returns false if the listener was not registered
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|listener| listener.id != id);
        before != list.len()
    }

    /// Invoke every listener of the event's kind; returns false if there were none
    pub fn emit(&self, event: &PlayerEvent) -> bool {
        let snapshot: Vec<Callback> = {
            let mut listeners = self.listeners.borrow_mut();
            let Some(list) = listeners.get_mut(&event.kind()) else {
                return false;
            };
            let snapshot = list.iter().map(|l| l.callback.clone()).collect();
            list.retain(|listener| !listener.once);
            snapshot
        };

        for callback in &snapshot {
            callback(event);
        }
        !snapshot.is_empty()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .get(&kind)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Drop every listener of `kind`, or all listeners when `None`
    pub fn remove_all_listeners(&self, kind: Option<EventKind>) {
        let mut listeners = self.listeners.borrow_mut();
        match kind {
            Some(kind) => {
                listeners.remove(&kind);
            }
            None => listeners.clear(),
        }
    }

    fn add(&self, kind: EventKind, callback: Callback, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(Listener { id, callback, once });
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.borrow();
        let mut map = f.debug_map();
        for (kind, list) in listeners.iter() {
            map.entry(kind, &list.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&PlayerEvent)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &str| -> Box<dyn Fn(&PlayerEvent)> {
            let sink = sink.clone();
            let tag = tag.to_string();
            Box::new(move |_event: &PlayerEvent| sink.borrow_mut().push(tag.clone()))
        };
        (log, make)
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on(EventKind::TimeUpdate, make("a"));
        bus.once(EventKind::TimeUpdate, make("b"));
        bus.on(EventKind::TimeUpdate, make("c"));

        assert!(bus.emit(&PlayerEvent::TimeUpdate(1.0)));
        assert!(bus.emit(&PlayerEvent::TimeUpdate(2.0)));

        assert_eq!(*log.borrow(), vec!["a", "b", "c", "a", "c"]);
        assert_eq!(bus.listener_count(EventKind::TimeUpdate), 2);
    }

    #[test]
    fn test_only_matching_kind_is_invoked() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on(EventKind::RateChange, make("rate"));

        assert!(!bus.emit(&PlayerEvent::TimeUpdate(1.0)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_off_removes_listener() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let id = bus.on(EventKind::LevelChange, make("x"));

        assert!(bus.off(EventKind::LevelChange, id));
        assert!(!bus.off(EventKind::LevelChange, id));
        assert!(!bus.off(EventKind::Levels, id));
        bus.emit(&PlayerEvent::LevelChange(0));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_listener_can_unsubscribe_itself_during_emit() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));

        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let (bus_ref, hits_ref, slot_ref) = (bus.clone(), hits.clone(), slot.clone());
        let id = bus.on(EventKind::StatusChange, move |_| {
            hits_ref.set(hits_ref.get() + 1);
            if let Some(id) = slot_ref.get() {
                bus_ref.off(EventKind::StatusChange, id);
            }
        });
        slot.set(Some(id));

        bus.emit(&PlayerEvent::StatusChange(PlaybackStatus::Playing));
        bus.emit(&PlayerEvent::StatusChange(PlaybackStatus::Paused));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_once_listener_emitting_recursively_fires_once() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));
        let (bus_ref, hits_ref) = (bus.clone(), hits.clone());
        bus.once(EventKind::TimeUpdate, move |_| {
            hits_ref.set(hits_ref.get() + 1);
            bus_ref.emit(&PlayerEvent::TimeUpdate(9.0));
        });

        bus.emit(&PlayerEvent::TimeUpdate(1.0));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_event_names() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_name("progress"), None);
        assert_eq!(PlayerEvent::Levels(vec![]).kind(), EventKind::Levels);
    }

    #[test]
    fn test_remove_all_listeners() {
        let bus = EventBus::new();
        bus.on(EventKind::Error, |_| {});
        bus.on(EventKind::Levels, |_| {});
        bus.remove_all_listeners(Some(EventKind::Error));
        assert_eq!(bus.listener_count(EventKind::Error), 0);
        assert_eq!(bus.listener_count(EventKind::Levels), 1);
        bus.remove_all_listeners(None);
        assert_eq!(bus.listener_count(EventKind::Levels), 0);
    }
}
