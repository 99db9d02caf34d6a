//! Delivery robots: slots, the per-robot state machine, the fragile-item
//! wrapping protocol, and collision avoidance.
//!
//! # State machine
//!
//! ```text
//! RETURNING --(at mailroom)--> WAITING --(loaded + dispatched)--> DELIVERING
//!     ^                                                               |
//!     +----------------------------(empty)----------------------------+
//! ```
//!
//! Each call to [`Robot::step`] performs exactly one action: a floor move, a
//! wrapping or unwrapping step, a delivery, or nothing.
//!
//! # Variants
//!
//! A [`RobotKind::Standard`] robot has a hand and a tube. A
//! [`RobotKind::FragileCapable`] robot also has a special slot that only
//! ever holds a fragile item. Wrapping and the fragile collision rule are
//! only reachable through the special slot.

use tracing::{debug, error, info, trace, warn};

use crate::building::Building;
use crate::delivery::{DeliveryError, DeliverySink};
use crate::error::{ErrorKind, SimError};
use crate::event::{Event, EventBus};
use crate::fixed::Ticks;
use crate::id::{MailId, RobotId};
use crate::item::{MailItem, WrappingState};
use crate::pool::MailPool;
use crate::registry::{RegistrySnapshot, RobotPresence};
use crate::sim::StateHash;

/// Heaviest single item a robot can carry, in grams.
pub const ROBOT_MAX_ITEM_WEIGHT: u32 = 2000;

// ---------------------------------------------------------------------------
// Kinds, states, slots
// ---------------------------------------------------------------------------

/// Robot capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RobotKind {
    Standard,
    FragileCapable,
}

impl RobotKind {
    /// Number of item slots.
    pub fn slot_capacity(self) -> usize {
        match self {
            RobotKind::Standard => 2,
            RobotKind::FragileCapable => 3,
        }
    }

    /// Deliveries allowed between leaving the mailroom and coming back.
    pub fn max_deliveries_per_trip(self) -> u32 {
        match self {
            RobotKind::Standard => 2,
            RobotKind::FragileCapable => 3,
        }
    }

    pub fn has_special_slot(self) -> bool {
        matches!(self, RobotKind::FragileCapable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RobotState {
    Returning,
    Waiting,
    Delivering,
}

impl std::fmt::Display for RobotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RobotState::Returning => "RETURNING",
            RobotState::Waiting => "WAITING",
            RobotState::Delivering => "DELIVERING",
        })
    }
}

/// A carrying position on a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The item being delivered now.
    Hand,
    /// A second non-fragile item queued behind the hand.
    Tube,
    /// Fragile items only; fragile-capable robots only.
    Special,
}

// ---------------------------------------------------------------------------
// Load errors
// ---------------------------------------------------------------------------

/// Why a robot refused an item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("item {item} weighs {weight}g, over the {limit}g limit")]
    Overweight { item: MailId, weight: u32, limit: u32 },

    #[error("{slot:?} slot already holds an item")]
    NoFreeSlot { slot: Slot },

    #[error("fragile item {item} cannot ride in the {slot:?} slot")]
    FragileInStandardSlot { item: MailId, slot: Slot },

    #[error("robot has no special slot for fragile item {item}")]
    NoSpecialSlot { item: MailId },

    #[error("item {item} is not fragile and cannot use the special slot")]
    NotFragile { item: MailId },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Overweight { .. } | LoadError::NoFreeSlot { .. } => {
                ErrorKind::CapacityViolation
            }
            LoadError::FragileInStandardSlot { .. }
            | LoadError::NoSpecialSlot { .. }
            | LoadError::NotFragile { .. } => ErrorKind::FragilityViolation,
        }
    }
}

/// A refused load. The item comes back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("load rejected: {reason}")]
pub struct LoadRejected {
    pub item: MailItem,
    #[source]
    pub reason: LoadError,
}

// ---------------------------------------------------------------------------
// Step context
// ---------------------------------------------------------------------------

/// Everything a robot touches during one step besides itself.
pub struct StepContext<'a> {
    pub tick: Ticks,
    pub building: &'a Building,
    /// Peers' presence as of this point in the tick.
    pub snapshot: &'a RegistrySnapshot,
    pub pool: &'a mut dyn MailPool,
    pub sink: &'a mut dyn DeliverySink,
    pub events: &'a mut EventBus,
}

// ---------------------------------------------------------------------------
// Robot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Robot {
    id: RobotId,
    label: String,
    kind: RobotKind,
    state: RobotState,
    floor: u32,
    destination: Option<u32>,
    hand: Option<MailItem>,
    tube: Option<MailItem>,
    special: Option<MailItem>,
    /// One-shot signal from the pool; consumed when leaving WAITING.
    dispatched: bool,
    /// Deliveries since the robot last left WAITING.
    deliveries: u32,
}

impl Robot {
    /// A new robot standing at the mailroom. It starts RETURNING so that its
    /// first step registers it with the pool.
    pub fn new(id: RobotId, label: String, kind: RobotKind, mailroom: u32) -> Self {
        Self {
            id,
            label,
            kind,
            state: RobotState::Returning,
            floor: mailroom,
            destination: None,
            hand: None,
            tube: None,
            special: None,
            dispatched: false,
            deliveries: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> RobotId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> RobotKind {
        self.kind
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// The floor being delivered to. `None` unless DELIVERING.
    pub fn destination(&self) -> Option<u32> {
        self.destination
    }

    pub fn hand(&self) -> Option<&MailItem> {
        self.hand.as_ref()
    }

    pub fn tube(&self) -> Option<&MailItem> {
        self.tube.as_ref()
    }

    pub fn special(&self) -> Option<&MailItem> {
        self.special.as_ref()
    }

    pub fn slot(&self, slot: Slot) -> Option<&MailItem> {
        match slot {
            Slot::Hand => self.hand.as_ref(),
            Slot::Tube => self.tube.as_ref(),
            Slot::Special => self.special.as_ref(),
        }
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    pub fn deliveries_this_trip(&self) -> u32 {
        self.deliveries
    }

    /// Number of items currently carried.
    pub fn carried(&self) -> usize {
        [&self.hand, &self.tube, &self.special]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    pub fn free_slots(&self) -> usize {
        self.kind.slot_capacity() - self.carried()
    }

    pub fn is_empty(&self) -> bool {
        self.carried() == 0
    }

    /// Carrying a fragile item and nothing else.
    pub fn is_special_only(&self) -> bool {
        self.special.is_some() && self.hand.is_none() && self.tube.is_none()
    }

    pub fn presence(&self) -> RobotPresence {
        RobotPresence {
            robot: self.id,
            kind: self.kind,
            state: self.state,
            floor: self.floor,
            destination: self.destination,
            special_only: self.is_special_only(),
            carrying_fragile: self.special.is_some(),
        }
    }

    pub(crate) fn hash_into(&self, hash: &mut StateHash) {
        hash.write_u32(self.state as u32);
        hash.write_u32(self.floor);
        hash.write_u32(self.destination.unwrap_or(0));
        for slot in [&self.hand, &self.tube, &self.special] {
            match slot {
                Some(item) => {
                    hash.write_u64(item.id().0);
                    hash.write_u32(item.wrapping() as u32);
                }
                None => hash.write_u64(u64::MAX),
            }
        }
        hash.write_u32(self.deliveries);
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load an item into the slot it belongs in: the special slot for fragile
    /// items, otherwise the hand, then the tube.
    pub fn load(&mut self, item: MailItem) -> Result<Slot, LoadRejected> {
        let slot = if item.is_fragile() {
            Slot::Special
        } else if self.hand.is_none() {
            Slot::Hand
        } else {
            Slot::Tube
        };
        self.load_into(slot, item).map(|()| slot)
    }

    /// Load an item into a specific slot. On refusal the robot is unchanged
    /// and the item is handed back.
    pub fn load_into(&mut self, slot: Slot, item: MailItem) -> Result<(), LoadRejected> {
        match self.check_load(slot, &item) {
            Ok(()) => {
                *self.slot_mut(slot) = Some(item);
                Ok(())
            }
            Err(reason) => Err(LoadRejected { item, reason }),
        }
    }

    fn check_load(&self, slot: Slot, item: &MailItem) -> Result<(), LoadError> {
        match slot {
            Slot::Special if !self.kind.has_special_slot() => {
                return Err(LoadError::NoSpecialSlot { item: item.id() });
            }
            Slot::Special if !item.is_fragile() => {
                return Err(LoadError::NotFragile { item: item.id() });
            }
            Slot::Hand | Slot::Tube if item.is_fragile() => {
                return Err(LoadError::FragileInStandardSlot {
                    item: item.id(),
                    slot,
                });
            }
            _ => {}
        }
        if item.weight() > ROBOT_MAX_ITEM_WEIGHT {
            return Err(LoadError::Overweight {
                item: item.id(),
                weight: item.weight(),
                limit: ROBOT_MAX_ITEM_WEIGHT,
            });
        }
        if self.slot(slot).is_some() {
            return Err(LoadError::NoFreeSlot { slot });
        }
        Ok(())
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<MailItem> {
        match slot {
            Slot::Hand => &mut self.hand,
            Slot::Tube => &mut self.tube,
            Slot::Special => &mut self.special,
        }
    }

    /// Signal that loading is complete and the robot may leave.
    pub fn dispatch(&mut self) {
        self.dispatched = true;
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Advance the robot by one tick.
    ///
    /// Only [`SimError::ExcessiveDelivery`] escapes; everything else is
    /// handled in place.
    pub fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), SimError> {
        match self.state {
            RobotState::Returning => self.step_returning(ctx),
            RobotState::Waiting => self.step_waiting(ctx),
            RobotState::Delivering => return self.step_delivering(ctx),
        }
        Ok(())
    }

    fn step_returning(&mut self, ctx: &mut StepContext<'_>) {
        let mailroom = ctx.building.mailroom();
        if self.floor != mailroom {
            self.move_one_floor(mailroom, ctx);
            return;
        }
        if let Some(item) = self.tube.take() {
            info!(tick = ctx.tick, robot = %self.label, item = %item.id(), "tube item returned to pool");
            ctx.events.emit(Event::TubeReturned {
                robot: self.id,
                item: item.id(),
                tick: ctx.tick,
            });
            ctx.pool.intake(item);
        }
        ctx.pool.register_waiting(self.id);
        self.change_state(RobotState::Waiting, ctx);
    }

    fn step_waiting(&mut self, ctx: &mut StepContext<'_>) {
        let deliverable = self.hand.is_some() || self.tube.is_some() || self.special.is_some();
        if deliverable && std::mem::take(&mut self.dispatched) {
            self.deliveries = 0;
            self.pre_delivery(ctx);
        }
    }

    /// Wrap the special item one step per tick until it is fully wrapped,
    /// then set off.
    fn pre_delivery(&mut self, ctx: &mut StepContext<'_>) {
        if let Some(special) = self.special.as_mut()
            && !special.is_wrapped()
        {
            let state = special.wrap();
            debug!(tick = ctx.tick, robot = %self.label, item = %special.id(), ?state, "wrapping");
            ctx.events.emit(Event::WrappingAdvanced {
                robot: self.id,
                item: special.id(),
                state,
                tick: ctx.tick,
            });
            // Resume next tick.
            self.dispatched = true;
            return;
        }
        self.set_route();
        self.change_state(RobotState::Delivering, ctx);
    }

    fn step_delivering(&mut self, ctx: &mut StepContext<'_>) -> Result<(), SimError> {
        let Some(destination) = self.destination else {
            self.change_state(RobotState::Returning, ctx);
            return Ok(());
        };
        if self.floor != destination {
            self.advance_towards(destination, ctx);
            return Ok(());
        }

        self.handle_arrival(ctx)?;
        if self.is_empty() {
            self.destination = None;
            self.change_state(RobotState::Returning, ctx);
        } else {
            self.set_route();
        }
        Ok(())
    }

    /// At the destination floor: the hand item goes first; a wrapped special
    /// item is unwrapped this tick and delivered on the next.
    fn handle_arrival(&mut self, ctx: &mut StepContext<'_>) -> Result<(), SimError> {
        let floor = self.floor;
        if let Some(item) = self.hand.take_if(|i| i.destination() == floor) {
            return self.hand_over(item, ctx);
        }

        let Some(special) = self.special.as_mut() else {
            return Ok(());
        };
        if special.destination() != floor {
            return Ok(());
        }
        match special.wrapping() {
            WrappingState::Wrapped => {
                special.unwrap_packaging();
                debug!(tick = ctx.tick, robot = %self.label, item = %special.id(), "unwrapping");
                ctx.events.emit(Event::ItemUnwrapped {
                    robot: self.id,
                    item: special.id(),
                    tick: ctx.tick,
                });
                Ok(())
            }
            WrappingState::HalfWrapped => {
                // Never left the mailroom properly wrapped; finish first.
                let state = special.wrap();
                ctx.events.emit(Event::WrappingAdvanced {
                    robot: self.id,
                    item: special.id(),
                    state,
                    tick: ctx.tick,
                });
                Ok(())
            }
            WrappingState::Unwrapped => match self.special.take() {
                Some(item) => self.hand_over(item, ctx),
                None => Ok(()),
            },
        }
    }

    fn hand_over(&mut self, item: MailItem, ctx: &mut StepContext<'_>) -> Result<(), SimError> {
        let (id, arrival, weight, fragile) =
            (item.id(), item.arrival(), item.weight(), item.is_fragile());
        let description = item.to_string();
        match ctx.sink.deliver(item, ctx.tick) {
            Ok(()) => {
                info!(tick = ctx.tick, robot = %self.label, floor = self.floor, "delivered [{description}]");
                ctx.events.emit(Event::MailDelivered {
                    robot: self.id,
                    item: id,
                    floor: self.floor,
                    arrival,
                    weight,
                    fragile,
                    tick: ctx.tick,
                });
            }
            Err(err @ DeliveryError::MailAlreadyDelivered { .. }) => {
                warn!(tick = ctx.tick, robot = %self.label, %err, "duplicate delivery skipped");
                ctx.events.emit(Event::DuplicateDelivery {
                    robot: self.id,
                    item: id,
                    tick: ctx.tick,
                });
            }
        }

        self.deliveries += 1;
        let limit = self.kind.max_deliveries_per_trip();
        if self.deliveries > limit {
            error!(tick = ctx.tick, robot = %self.label, delivered = self.deliveries, limit, "excessive delivery");
            return Err(SimError::ExcessiveDelivery {
                robot: self.label.clone(),
                delivered: self.deliveries,
                limit,
            });
        }
        Ok(())
    }

    /// Aim at the next item: a special item bound for the current floor,
    /// then the hand, then the special slot. A lone tube item moves up into
    /// the hand.
    ///
    /// A fragile item for the floor the robot stands on is handled before
    /// leaving. Coming back for it later would mean a fragile-only final step
    /// onto that floor, which never happens while idle robots wait there.
    fn set_route(&mut self) {
        if self.hand.is_none() {
            self.hand = self.tube.take();
        }
        let floor = self.floor;
        let here = self.special.as_ref().filter(|s| s.destination() == floor);
        self.destination = here
            .or(self.hand.as_ref())
            .or(self.special.as_ref())
            .map(MailItem::destination);
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    /// One floor towards `destination`, unless the final step would break
    /// fragile isolation.
    fn advance_towards(&mut self, destination: u32, ctx: &mut StepContext<'_>) {
        if self.floor.abs_diff(destination) == 1 && self.move_blocked(destination, ctx.snapshot) {
            trace!(tick = ctx.tick, robot = %self.label, floor = self.floor, target = destination, "move suppressed");
            ctx.events.emit(Event::MoveSuppressed {
                robot: self.id,
                floor: self.floor,
                target: destination,
                tick: ctx.tick,
            });
            return;
        }
        self.move_one_floor(destination, ctx);
    }

    /// A robot carrying only a fragile item never arrives on an occupied
    /// floor. A robot carrying no fragile item never arrives where a
    /// fragile-only delivery to that floor is under way.
    fn move_blocked(&self, target: u32, snapshot: &RegistrySnapshot) -> bool {
        if self.is_special_only() {
            snapshot.occupied_by_other(self.id, target)
        } else if self.special.is_none() {
            snapshot.fragile_delivery_at(self.id, target)
        } else {
            false
        }
    }

    fn move_one_floor(&mut self, destination: u32, ctx: &mut StepContext<'_>) {
        let from = self.floor;
        if from < destination {
            self.floor += 1;
        } else if from > destination {
            self.floor -= 1;
        } else {
            return;
        }
        ctx.events.emit(Event::RobotMoved {
            robot: self.id,
            from,
            to: self.floor,
            tick: ctx.tick,
        });
    }

    fn change_state(&mut self, next: RobotState, ctx: &mut StepContext<'_>) {
        if self.state != next {
            debug!(tick = ctx.tick, robot = %self.label, from = %self.state, to = %next, "state changed");
            ctx.events.emit(Event::RobotStateChanged {
                robot: self.id,
                from: self.state,
                to: next,
                tick: ctx.tick,
            });
        }
        self.state = next;
        if next == RobotState::Delivering
            && let Some(item) = self.hand.as_ref().or(self.special.as_ref())
        {
            info!(tick = ctx.tick, robot = %self.label, tube = self.tube.is_some(), "-> [{item}]");
        }
    }
}
