//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted while the mail pool and robots step and are delivered
//! in batch at the end of the tick. Each event kind has its own
//! [`EventBuffer`] ring buffer with a configurable capacity.
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.
//!
//! A kind with no listener keeps only its most recent events. A kind with a
//! listener never drops one: its buffer doubles when a tick fills it.

use crate::fixed::Ticks;
use crate::id::{MailId, RobotId};
use crate::item::WrappingState;
use crate::robot::RobotState;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Mail flow --
    MailArrived {
        item: MailId,
        destination: u32,
        tick: Ticks,
    },
    LoadRejected {
        robot: RobotId,
        item: MailId,
        tick: Ticks,
    },
    TubeReturned {
        robot: RobotId,
        item: MailId,
        tick: Ticks,
    },
    MailDelivered {
        robot: RobotId,
        item: MailId,
        floor: u32,
        arrival: Ticks,
        weight: u32,
        fragile: bool,
        tick: Ticks,
    },
    DuplicateDelivery {
        robot: RobotId,
        item: MailId,
        tick: Ticks,
    },

    // -- Robot --
    RobotDispatched {
        robot: RobotId,
        tick: Ticks,
    },
    RobotStateChanged {
        robot: RobotId,
        from: RobotState,
        to: RobotState,
        tick: Ticks,
    },
    RobotMoved {
        robot: RobotId,
        from: u32,
        to: u32,
        tick: Ticks,
    },
    MoveSuppressed {
        robot: RobotId,
        floor: u32,
        target: u32,
        tick: Ticks,
    },

    // -- Wrapping --
    WrappingAdvanced {
        robot: RobotId,
        item: MailId,
        state: WrappingState,
        tick: Ticks,
    },
    ItemUnwrapped {
        robot: RobotId,
        item: MailId,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MailArrived,
    LoadRejected,
    TubeReturned,
    MailDelivered,
    DuplicateDelivery,
    RobotDispatched,
    RobotStateChanged,
    RobotMoved,
    MoveSuppressed,
    WrappingAdvanced,
    ItemUnwrapped,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 11;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MailArrived { .. } => EventKind::MailArrived,
            Event::LoadRejected { .. } => EventKind::LoadRejected,
            Event::TubeReturned { .. } => EventKind::TubeReturned,
            Event::MailDelivered { .. } => EventKind::MailDelivered,
            Event::DuplicateDelivery { .. } => EventKind::DuplicateDelivery,
            Event::RobotDispatched { .. } => EventKind::RobotDispatched,
            Event::RobotStateChanged { .. } => EventKind::RobotStateChanged,
            Event::RobotMoved { .. } => EventKind::RobotMoved,
            Event::MoveSuppressed { .. } => EventKind::MoveSuppressed,
            Event::WrappingAdvanced { .. } => EventKind::WrappingAdvanced,
            Event::ItemUnwrapped { .. } => EventKind::ItemUnwrapped,
        }
    }

    /// The tick at which the event occurred.
    pub fn tick(&self) -> Ticks {
        match self {
            Event::MailArrived { tick, .. }
            | Event::LoadRejected { tick, .. }
            | Event::TubeReturned { tick, .. }
            | Event::MailDelivered { tick, .. }
            | Event::DuplicateDelivery { tick, .. }
            | Event::RobotDispatched { tick, .. }
            | Event::RobotStateChanged { tick, .. }
            | Event::RobotMoved { tick, .. }
            | Event::MoveSuppressed { tick, .. }
            | Event::WrappingAdvanced { tick, .. }
            | Event::ItemUnwrapped { tick, .. } => *tick,
        }
    }
}

impl EventKind {
    /// Every kind, in delivery order.
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::MailArrived,
        EventKind::LoadRejected,
        EventKind::TubeReturned,
        EventKind::MailDelivered,
        EventKind::DuplicateDelivery,
        EventKind::RobotDispatched,
        EventKind::RobotStateChanged,
        EventKind::RobotMoved,
        EventKind::MoveSuppressed,
        EventKind::WrappingAdvanced,
        EventKind::ItemUnwrapped,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. When full, the oldest events are
/// dropped unless the owner calls [`EventBuffer::grow`] first.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Double the capacity, keeping every buffered event in order.
    pub fn grow(&mut self) {
        let old = self.capacity();
        if self.is_full() {
            // Oldest entry first, so the new slots follow the newest.
            self.events.rotate_left(self.head);
            self.head = old;
        }
        self.events.resize_with(old * 2, || None);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Clear all events. The lifetime write counter is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// The central event bus. Holds one ring buffer per event kind, listener
/// lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Emit an event. No-ops if the event kind is suppressed. A full buffer
    /// grows instead of dropping when the kind has listeners.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        let buffer = self.buffers[idx].get_or_insert_with(|| EventBuffer::new(capacity));
        if buffer.is_full() && !self.listeners[idx].is_empty() {
            buffer.grow();
        }
        buffer.push(event);
    }

    /// Register a passive listener for an event kind. Listeners are called
    /// in registration order during delivery.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Deliver all buffered events to listeners, kind by kind, oldest first,
    /// then clear the buffers.
    pub fn deliver(&mut self) {
        for kind in EventKind::ALL {
            let idx = kind.index();
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            for listener in &mut self.listeners[idx] {
                for event in buffer.iter() {
                    listener(event);
                }
            }
            buffer.clear();
        }
    }

    /// Get the event buffer for a specific kind (read-only).
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Count of events currently buffered for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map(EventBuffer::len).unwrap_or(0)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map(EventBuffer::total_written).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn arrived(id: u64, tick: Ticks) -> Event {
        Event::MailArrived {
            item: MailId(id),
            destination: 3,
            tick,
        }
    }

    #[test]
    fn ring_wraps_and_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        for i in 0..5 {
            buf.push(arrived(i, i));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        let ticks: Vec<Ticks> = buf.iter().map(Event::tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_clamped() {
        let mut buf = EventBuffer::new(0);
        buf.push(arrived(0, 0));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.iter().len(), 1);
    }

    #[test]
    fn suppressed_kind_is_not_buffered() {
        let mut bus = EventBus::new(8);
        bus.suppress(EventKind::MailArrived);
        bus.emit(arrived(0, 0));
        assert!(bus.is_suppressed(EventKind::MailArrived));
        assert!(bus.buffer(EventKind::MailArrived).is_none());
        assert_eq!(bus.total_emitted(EventKind::MailArrived), 0);
    }

    #[test]
    fn listeners_receive_in_order_and_buffers_clear() {
        let mut bus = EventBus::new(8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on_passive(
            EventKind::MailArrived,
            Box::new(move |e| sink.borrow_mut().push(e.tick())),
        );
        bus.emit(arrived(0, 4));
        bus.emit(arrived(1, 5));
        assert_eq!(bus.buffered_count(EventKind::MailArrived), 2);

        bus.deliver();
        assert_eq!(*seen.borrow(), vec![4, 5]);
        assert_eq!(bus.buffered_count(EventKind::MailArrived), 0);
        assert_eq!(bus.total_emitted(EventKind::MailArrived), 2);
    }

    #[test]
    fn grow_keeps_order_after_wrapping() {
        let mut buf = EventBuffer::new(3);
        for i in 0..4 {
            buf.push(arrived(i, i));
        }
        buf.grow();
        assert_eq!(buf.capacity(), 6);
        buf.push(arrived(4, 4));
        buf.push(arrived(5, 5));
        let ticks: Vec<Ticks> = buf.iter().map(Event::tick).collect();
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn listened_kind_is_never_dropped() {
        let mut bus = EventBus::new(8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on_passive(
            EventKind::MailArrived,
            Box::new(move |e| sink.borrow_mut().push(e.tick())),
        );
        for i in 0..3000 {
            bus.emit(arrived(i, i));
        }
        assert_eq!(bus.buffered_count(EventKind::MailArrived), 3000);

        bus.deliver();
        assert_eq!(*seen.borrow(), (0..3000).collect::<Vec<Ticks>>());

        // Unlistened kinds still keep only the newest events.
        for i in 0..20 {
            bus.emit(Event::RobotMoved {
                robot: RobotId::default(),
                from: 1,
                to: 2,
                tick: i,
            });
        }
        assert_eq!(bus.buffered_count(EventKind::RobotMoved), 8);
        assert_eq!(bus.total_emitted(EventKind::RobotMoved), 20);
    }

    #[test]
    fn kinds_are_independent() {
        let mut bus = EventBus::default();
        bus.emit(arrived(0, 0));
        assert_eq!(bus.buffered_count(EventKind::MailArrived), 1);
        assert_eq!(bus.buffered_count(EventKind::MailDelivered), 0);
    }

    #[test]
    fn kind_table_matches_discriminants() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
