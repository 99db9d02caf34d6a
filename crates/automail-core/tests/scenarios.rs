//! End-to-end robot scenarios driven through `Simulation::step`.

use std::cell::RefCell;
use std::rc::Rc;

use automail_core::building::Building;
use automail_core::delivery::{DeliveryLog, DeliverySink};
use automail_core::engine::{Simulation, SimulationBuilder};
use automail_core::error::{ErrorKind, SimError};
use automail_core::event::{Event, EventBus, EventKind};
use automail_core::fixed::Ticks;
use automail_core::generator::MailGenerator;
use automail_core::id::RobotId;
use automail_core::item::{MailItem, WrappingState};
use automail_core::pool::{MailPool, SimpleMailPool};
use automail_core::registry::{RegistryBuilder, RobotRegistry};
use automail_core::robot::{LoadError, ROBOT_MAX_ITEM_WEIGHT, RobotKind, RobotState};
use automail_core::test_utils::*;

/// Collect every event of the given kinds.
fn record(sim: &mut Simulation, kinds: &[EventKind]) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let sink = log.clone();
        sim.on_passive(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    }
    log
}

fn ticks_of(log: &Rc<RefCell<Vec<Event>>>, kind: EventKind) -> Vec<Ticks> {
    let mut ticks: Vec<Ticks> = log
        .borrow()
        .iter()
        .filter(|e| e.kind() == kind)
        .map(Event::tick)
        .collect();
    ticks.sort_unstable();
    ticks
}

// ---------------------------------------------------------------------------
// Single standard robot
// ---------------------------------------------------------------------------

#[test]
fn standard_robot_reaches_floor_five_in_four_ticks() {
    let mut sim = standard_fleet(1, vec![make_item(0, 5, 0)]);
    let log = record(&mut sim, &[EventKind::RobotMoved, EventKind::MailDelivered]);

    // t0: registers and waits. t1: loaded, dispatched, departs.
    step_n(&mut sim, 1);
    assert_eq!(robot_at(&sim, 0).state(), RobotState::Waiting);
    step_n(&mut sim, 1);
    let robot = robot_at(&sim, 0);
    assert_eq!(robot.state(), RobotState::Delivering);
    assert_eq!(robot.floor(), 1);
    assert_eq!(robot.destination(), Some(5));

    step_n(&mut sim, 4);
    assert_eq!(robot_at(&sim, 0).floor(), 5);
    assert_eq!(ticks_of(&log, EventKind::RobotMoved), vec![2, 3, 4, 5]);

    let outcome = sim.step().unwrap();
    assert_eq!(outcome.delivered, 1);
    assert!(outcome.finished);
    assert_eq!(robot_at(&sim, 0).state(), RobotState::Returning);
    assert_eq!(ticks_of(&log, EventKind::MailDelivered), vec![6]);
}

#[test]
fn robot_returns_to_mailroom_and_waits_again() {
    let mut sim = standard_fleet(1, vec![make_item(0, 3, 0), make_item(1, 2, 30)]);
    // t0 wait, t1 depart, t2-t3 up, t4 deliver, t5-t6 down, t7 waiting.
    step_n(&mut sim, 8);
    let robot = robot_at(&sim, 0);
    assert_eq!(robot.floor(), 1);
    assert_eq!(robot.state(), RobotState::Waiting);
    assert_eq!(robot.deliveries_this_trip(), 1);
    sim.run().unwrap();
    assert_eq!(sim.sink().delivered_count(), 2);
}

// ---------------------------------------------------------------------------
// Fragile wrapping
// ---------------------------------------------------------------------------

#[test]
fn fragile_item_costs_two_wrap_ticks_and_one_unwrap_tick() {
    let mut sim = caution_fleet(1, vec![fragile_item(0, 3, 0)]);
    let log = record(
        &mut sim,
        &[
            EventKind::WrappingAdvanced,
            EventKind::RobotMoved,
            EventKind::ItemUnwrapped,
            EventKind::MailDelivered,
        ],
    );
    sim.run().unwrap();

    assert_eq!(ticks_of(&log, EventKind::WrappingAdvanced), vec![1, 2]);
    // Departs at t3 without moving, then two floors.
    assert_eq!(ticks_of(&log, EventKind::RobotMoved), vec![4, 5]);
    assert_eq!(ticks_of(&log, EventKind::ItemUnwrapped), vec![6]);
    assert_eq!(ticks_of(&log, EventKind::MailDelivered), vec![7]);

    let states: Vec<WrappingState> = log
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::WrappingAdvanced { state, .. } => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![WrappingState::HalfWrapped, WrappingState::Wrapped]);
}

#[test]
fn fragile_and_plain_items_share_a_trip() {
    let mut sim = caution_fleet(1, vec![fragile_item(0, 4, 0), make_item(1, 2, 0)]);
    sim.run().unwrap();
    let delivered: Vec<u64> = sim.sink().records().iter().map(|r| r.item.id().0).collect();
    assert_eq!(delivered, vec![1, 0]);
}

// ---------------------------------------------------------------------------
// Collision avoidance
// ---------------------------------------------------------------------------

#[test]
fn standard_robot_waits_for_fragile_delivery_to_clear() {
    // R0 is fragile-capable and carries only a fragile item to floor 3.
    // R1 departs later with a letter for floor 3.
    let mut sim = SimulationBuilder::new()
        .floors(10)
        .robots(RobotKind::FragileCapable, 1)
        .robots(RobotKind::Standard, 1)
        .build_with_mail(vec![fragile_item(0, 3, 0), make_item(1, 3, 4)])
        .unwrap();
    let log = record(&mut sim, &[EventKind::MoveSuppressed, EventKind::MailDelivered]);

    // R0: wrap t1-t2, depart t3, floor 3 at t5, unwrap t6, deliver t7.
    // R1: depart t4, floor 2 at t5, blocked at t6.
    step_n(&mut sim, 7);
    assert_eq!(robot_at(&sim, 0).floor(), 3);
    assert_eq!(robot_at(&sim, 1).floor(), 2);

    step_n(&mut sim, 1);
    assert_eq!(robot_at(&sim, 0).state(), RobotState::Returning);
    assert_eq!(robot_at(&sim, 1).floor(), 3);

    sim.run().unwrap();
    assert_eq!(ticks_of(&log, EventKind::MoveSuppressed), vec![6]);
    assert_eq!(ticks_of(&log, EventKind::MailDelivered), vec![7, 8]);
}

#[test]
fn fragile_only_robot_never_arrives_on_occupied_floor() {
    // R0 is standard with a late letter for floor 3; R1 carries only a
    // fragile item to floor 3 and must wait while R0 is there.
    let mut sim = SimulationBuilder::new()
        .floors(10)
        .robots(RobotKind::Standard, 1)
        .robots(RobotKind::FragileCapable, 1)
        .build_with_mail(vec![fragile_item(0, 3, 0), make_item(1, 3, 3)])
        .unwrap();
    let log = record(&mut sim, &[EventKind::MoveSuppressed, EventKind::MailDelivered]);

    sim.run().unwrap();

    // R0 on floor 3 during t5 and t6; R1 blocked both ticks.
    assert_eq!(ticks_of(&log, EventKind::MoveSuppressed), vec![5, 6]);
    let fragile = sim.sink().record(automail_core::id::MailId(0)).unwrap();
    assert_eq!(fragile.delivered_at, 9);
}

#[test]
fn fragile_mail_for_the_mailroom_floor_is_delivered_before_departure() {
    // R0 takes a fragile item for floor 1 and a letter for floor 3. R1 waits
    // at the mailroom the whole time, so coming back with only the fragile
    // item would never be allowed onto floor 1.
    let mut sim = SimulationBuilder::new()
        .floors(10)
        .robots(RobotKind::FragileCapable, 2)
        .max_ticks(Some(500))
        .build_with_mail(vec![fragile_item(0, 1, 0), make_item(1, 3, 0)])
        .unwrap();
    let log = record(&mut sim, &[EventKind::MoveSuppressed, EventKind::MailDelivered]);

    let summary = sim.run().unwrap();
    assert_eq!(summary.delivered, 2);

    // Wrap t1-t2, depart t3, unwrap t4, fragile t5, floor 3 at t7, letter t8.
    assert_eq!(ticks_of(&log, EventKind::MailDelivered), vec![5, 8]);
    assert!(ticks_of(&log, EventKind::MoveSuppressed).is_empty());
    let delivered: Vec<u64> = sim.sink().records().iter().map(|r| r.item.id().0).collect();
    assert_eq!(delivered, vec![0, 1]);
}

#[test]
fn returning_robots_are_not_blocked() {
    let mut sim = SimulationBuilder::new()
        .floors(10)
        .robots(RobotKind::FragileCapable, 2)
        .build_with_mail(vec![fragile_item(0, 2, 0), fragile_item(1, 2, 0)])
        .unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.delivered, 2);
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

#[test]
fn overweight_load_is_rejected_and_slot_stays_empty() {
    let mut registry = RegistryBuilder::new(1);
    let id = registry.register(RobotKind::Standard);
    let mut robots = registry.build();
    let robot = robots.get_mut(id).unwrap();

    let rejected = robot
        .load(heavy_item(0, 4, 0, ROBOT_MAX_ITEM_WEIGHT + 1))
        .unwrap_err();
    assert!(matches!(rejected.reason, LoadError::Overweight { .. }));
    assert_eq!(rejected.reason.kind(), ErrorKind::CapacityViolation);
    assert!(!rejected.reason.kind().is_fatal());
    assert!(robot.hand().is_none());
    assert!(robot.is_empty());
}

#[test]
fn overweight_mail_is_quarantined_and_run_still_finishes() {
    let mut sim = standard_fleet(
        2,
        vec![
            heavy_item(0, 4, 0, ROBOT_MAX_ITEM_WEIGHT + 500),
            make_item(1, 4, 0),
        ],
    );
    let summary = sim.run().unwrap();
    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.undeliverable, 1);
    assert_eq!(sim.pool().quarantined()[0].id().0, 0);
}

// ---------------------------------------------------------------------------
// Excessive delivery
// ---------------------------------------------------------------------------

/// Breaks the capacity contract by topping up the tube of delivering robots.
struct OverfillingPool {
    inner: SimpleMailPool,
    stash: Vec<MailItem>,
}

impl MailPool for OverfillingPool {
    fn intake(&mut self, item: MailItem) {
        self.inner.intake(item);
    }

    fn register_waiting(&mut self, robot: RobotId) {
        self.inner.register_waiting(robot);
    }

    fn step(&mut self, robots: &mut RobotRegistry, tick: Ticks, events: &mut EventBus) {
        self.inner.step(robots, tick, events);
        for id in robots.ids().to_vec() {
            let Some(robot) = robots.get_mut(id) else {
                continue;
            };
            if robot.state() == RobotState::Delivering
                && robot.hand().is_some()
                && robot.tube().is_none()
                && let Some(item) = self.stash.pop()
            {
                let _ = robot.load(item);
            }
        }
    }

    fn pending(&self) -> usize {
        self.inner.pending()
    }
}

#[test]
fn excessive_delivery_aborts_the_run() {
    let building = Building::new(10).unwrap();
    let mut registry = RegistryBuilder::new(building.mailroom());
    registry.register(RobotKind::Standard);
    let pool = OverfillingPool {
        inner: SimpleMailPool::new(),
        stash: (100..110).map(|id| make_item(id, 3, 0)).collect(),
    };
    let generator = MailGenerator::from_items(vec![make_item(0, 3, 0), make_item(1, 3, 50)]);
    let mut sim = Simulation::from_parts(
        building,
        registry.build(),
        pool,
        DeliveryLog::new(),
        generator,
    );

    let err = sim.run().unwrap_err();
    assert!(matches!(
        err,
        SimError::ExcessiveDelivery {
            delivered: 3,
            limit: 2,
            ..
        }
    ));
    assert_eq!(err.kind(), Some(ErrorKind::ExcessiveDelivery));
    assert!(sim.is_aborted());
    assert_eq!(sim.step().unwrap_err(), SimError::Aborted);
    // The third item still reached the sink before the abort.
    assert_eq!(sim.sink().delivered_count(), 3);
}
