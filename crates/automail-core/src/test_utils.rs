//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::engine::{Simulation, SimulationBuilder};
use crate::fixed::{Fixed64, Ticks};
use crate::generator::GeneratorConfig;
use crate::id::MailId;
use crate::item::MailItem;
use crate::robot::{Robot, RobotKind};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Item constructors
// ===========================================================================

/// A 500g non-fragile item.
pub fn make_item(id: u64, destination: u32, arrival: Ticks) -> MailItem {
    MailItem::new(MailId(id), destination, arrival, 500, false)
}

/// A 500g fragile item.
pub fn fragile_item(id: u64, destination: u32, arrival: Ticks) -> MailItem {
    MailItem::new(MailId(id), destination, arrival, 500, true)
}

pub fn heavy_item(id: u64, destination: u32, arrival: Ticks, weight: u32) -> MailItem {
    MailItem::new(MailId(id), destination, arrival, weight, false)
}

// ===========================================================================
// Simulation constructors
// ===========================================================================

/// `count` standard robots in a 10-floor building, delivering `items`.
pub fn standard_fleet(count: usize, items: Vec<MailItem>) -> Simulation {
    fleet(RobotKind::Standard, count, items)
}

/// `count` fragile-capable robots in a 10-floor building, delivering `items`.
pub fn caution_fleet(count: usize, items: Vec<MailItem>) -> Simulation {
    fleet(RobotKind::FragileCapable, count, items)
}

fn fleet(kind: RobotKind, count: usize, items: Vec<MailItem>) -> Simulation {
    SimulationBuilder::new()
        .floors(10)
        .robots(kind, count)
        .build_with_mail(items)
        .expect("valid test fleet")
}

/// A seeded run with generated mail, matching the default configuration.
pub fn generated_run(kind: RobotKind, robots: usize, seed: u64, fragile: bool) -> Simulation {
    SimulationBuilder::new()
        .floors(10)
        .robots(kind, robots)
        .mail(GeneratorConfig {
            fragile_chance: fragile.then(|| fixed(0.1)),
            ..GeneratorConfig::default()
        })
        .seed(seed)
        .max_ticks(Some(100_000))
        .build()
        .expect("valid generated run")
}

// ===========================================================================
// Stepping helpers
// ===========================================================================

/// Step `n` ticks, panicking on any error.
pub fn step_n(sim: &mut Simulation, n: u64) {
    for _ in 0..n {
        sim.step().expect("step failed");
    }
}

/// The robot registered at position `index`.
pub fn robot_at(sim: &Simulation, index: usize) -> &Robot {
    let id = sim.robots().ids()[index];
    sim.robots().get(id).expect("registered robot")
}
