//! The robot registry: every robot in the building, in registration order,
//! plus the read-only presence snapshots used for collision checks.
//!
//! Robots are registered through a [`RegistryBuilder`] before the run starts.
//! After [`RegistryBuilder::build`] the membership is fixed; only the robots'
//! own state changes from tick to tick.

use slotmap::SlotMap;

use crate::id::RobotId;
use crate::robot::{Robot, RobotKind, RobotState};
use crate::sim::StateHash;

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Where a robot is and what it carries, as seen by its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotPresence {
    pub robot: RobotId,
    pub kind: RobotKind,
    pub state: RobotState,
    pub floor: u32,
    /// Only set while the robot is delivering.
    pub destination: Option<u32>,
    /// The special slot is occupied and the hand and tube are empty.
    pub special_only: bool,
    /// The special slot is occupied.
    pub carrying_fragile: bool,
}

/// Point-in-time view of every robot's presence, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    entries: Vec<RobotPresence>,
}

impl RegistrySnapshot {
    pub fn entries(&self) -> &[RobotPresence] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, robot: RobotId) -> Option<&RobotPresence> {
        self.entries.iter().find(|p| p.robot == robot)
    }

    /// Replace the entry for `presence.robot` so later robots in the same
    /// tick see where it moved.
    pub fn refresh(&mut self, presence: RobotPresence) {
        if let Some(entry) = self.entries.iter_mut().find(|p| p.robot == presence.robot) {
            *entry = presence;
        }
    }

    /// Whether any robot other than `robot` currently stands on `floor`.
    pub fn occupied_by_other(&self, robot: RobotId, floor: u32) -> bool {
        self.entries
            .iter()
            .any(|p| p.robot != robot && p.floor == floor)
    }

    /// Whether another robot is on `floor` carrying only a fragile item
    /// bound for that same floor.
    pub fn fragile_delivery_at(&self, robot: RobotId, floor: u32) -> bool {
        self.entries.iter().any(|p| {
            p.robot != robot
                && p.special_only
                && p.floor == floor
                && p.destination == Some(floor)
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects robots before the run. All robots start at the mailroom.
#[derive(Debug)]
pub struct RegistryBuilder {
    mailroom: u32,
    robots: SlotMap<RobotId, Robot>,
    order: Vec<RobotId>,
}

impl RegistryBuilder {
    pub fn new(mailroom: u32) -> Self {
        Self {
            mailroom,
            robots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Register a robot. Robots step in registration order.
    pub fn register(&mut self, kind: RobotKind) -> RobotId {
        let label = format!("R{}", self.order.len());
        let mailroom = self.mailroom;
        let id = self
            .robots
            .insert_with_key(|id| Robot::new(id, label, kind, mailroom));
        self.order.push(id);
        id
    }

    /// Register `count` robots of the same kind.
    pub fn register_many(&mut self, kind: RobotKind, count: usize) -> Vec<RobotId> {
        (0..count).map(|_| self.register(kind)).collect()
    }

    pub fn build(self) -> RobotRegistry {
        tracing::debug!(robots = self.order.len(), "robot registry built");
        RobotRegistry {
            robots: self.robots,
            order: self.order,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every robot in the building, keyed by [`RobotId`].
#[derive(Debug)]
pub struct RobotRegistry {
    robots: SlotMap<RobotId, Robot>,
    order: Vec<RobotId>,
}

impl RobotRegistry {
    pub fn get(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(id)
    }

    pub fn get_mut(&mut self, id: RobotId) -> Option<&mut Robot> {
        self.robots.get_mut(id)
    }

    /// Robot ids in registration order.
    pub fn ids(&self) -> &[RobotId] {
        &self.order
    }

    /// Robots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Robot> {
        self.order.iter().filter_map(|id| self.robots.get(*id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove a robot from the building. Returns it with whatever it carried.
    pub fn unregister(&mut self, id: RobotId) -> Option<Robot> {
        let robot = self.robots.remove(id)?;
        self.order.retain(|r| *r != id);
        Some(robot)
    }

    /// Snapshot every robot's presence.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: self.iter().map(Robot::presence).collect(),
        }
    }

    /// Feed every robot's state into `hash`, in registration order.
    pub fn hash_into(&self, hash: &mut StateHash) {
        for robot in self.iter() {
            robot.hash_into(hash);
        }
    }
}
