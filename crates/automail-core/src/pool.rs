//! The mail pool: holds unassigned items and hands them to idle robots.
//!
//! [`MailPool`] is the capacity contract the robots rely on. Which item goes
//! to which robot is a policy decision; [`SimpleMailPool`] is the default
//! oldest-first policy.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::event::{Event, EventBus};
use crate::fixed::Ticks;
use crate::id::RobotId;
use crate::item::MailItem;
use crate::registry::RobotRegistry;
use crate::robot::{LoadError, LoadRejected, Robot, Slot};

/// Source of every item that reaches a robot.
///
/// Implementations must never load more items than a robot has free slots,
/// must never put a fragile item anywhere but a special slot, and must
/// dispatch a robot exactly once after loading it.
pub trait MailPool {
    /// Accept an item. Never fails; covers both new arrivals and tube items
    /// returned by robots.
    fn intake(&mut self, item: MailItem);

    /// A robot is back at the mailroom and ready for a new load.
    fn register_waiting(&mut self, robot: RobotId);

    /// Load and dispatch waiting robots.
    fn step(&mut self, robots: &mut RobotRegistry, tick: Ticks, events: &mut EventBus);

    /// Items currently held by the pool.
    fn pending(&self) -> usize;

    /// Items the pool gave up on because no robot could ever carry them.
    fn undeliverable(&self) -> usize {
        0
    }
}

/// Oldest-first pool. Waiting robots are served in the order they arrived.
#[derive(Debug, Default)]
pub struct SimpleMailPool {
    /// Sorted by (arrival, id).
    items: Vec<MailItem>,
    waiting: VecDeque<RobotId>,
    quarantined: Vec<MailItem>,
}

impl SimpleMailPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in hand-out order.
    pub fn items(&self) -> &[MailItem] {
        &self.items
    }

    /// Robots waiting for a load, in service order.
    pub fn waiting(&self) -> impl Iterator<Item = RobotId> + '_ {
        self.waiting.iter().copied()
    }

    /// Items no robot can carry.
    pub fn quarantined(&self) -> &[MailItem] {
        &self.quarantined
    }

    fn take_next(&mut self, fragile: bool) -> Option<MailItem> {
        let pos = self.items.iter().position(|i| i.is_fragile() == fragile)?;
        Some(self.items.remove(pos))
    }

    /// Fill one slot with the oldest matching item. Returns whether the slot
    /// was filled.
    fn fill(&mut self, robot: &mut Robot, slot: Slot, tick: Ticks, events: &mut EventBus) -> bool {
        let fragile = slot == Slot::Special;
        while let Some(item) = self.take_next(fragile) {
            match robot.load_into(slot, item) {
                Ok(()) => return true,
                Err(LoadRejected { item, reason }) => {
                    warn!(tick, robot = robot.label(), item = %item.id(), %reason, "load rejected");
                    events.emit(Event::LoadRejected {
                        robot: robot.id(),
                        item: item.id(),
                        tick,
                    });
                    if let LoadError::Overweight { .. } = reason {
                        self.quarantined.push(item);
                        continue;
                    }
                    self.intake(item);
                    return false;
                }
            }
        }
        false
    }

    fn load(&mut self, robot: &mut Robot, tick: Ticks, events: &mut EventBus) -> usize {
        let mut slots = Vec::with_capacity(3);
        if robot.kind().has_special_slot() {
            slots.push(Slot::Special);
        }
        slots.extend([Slot::Hand, Slot::Tube]);

        let mut loaded = 0;
        for slot in slots {
            if robot.slot(slot).is_none() && self.fill(robot, slot, tick, events) {
                loaded += 1;
            }
        }
        loaded
    }
}

impl MailPool for SimpleMailPool {
    fn intake(&mut self, item: MailItem) {
        let key = (item.arrival(), item.id());
        let pos = self
            .items
            .partition_point(|i| (i.arrival(), i.id()) <= key);
        self.items.insert(pos, item);
    }

    fn register_waiting(&mut self, robot: RobotId) {
        if !self.waiting.contains(&robot) {
            self.waiting.push_back(robot);
        }
    }

    fn step(&mut self, robots: &mut RobotRegistry, tick: Ticks, events: &mut EventBus) {
        let mut still_waiting = VecDeque::with_capacity(self.waiting.len());
        while let Some(id) = self.waiting.pop_front() {
            let Some(robot) = robots.get_mut(id) else {
                continue;
            };
            let loaded = self.load(robot, tick, events);
            if loaded == 0 {
                still_waiting.push_back(id);
                continue;
            }
            robot.dispatch();
            debug!(tick, robot = robot.label(), loaded, "robot dispatched");
            events.emit(Event::RobotDispatched { robot: id, tick });
        }
        self.waiting = still_waiting;
    }

    fn pending(&self) -> usize {
        self.items.len()
    }

    fn undeliverable(&self) -> usize {
        self.quarantined.len()
    }
}
