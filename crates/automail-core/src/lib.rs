//! Automail Core -- the robot mail-delivery simulation engine.
//!
//! Robots carry mail from a mailroom to destination floors, one floor per
//! tick. This crate provides the robot state machine, the fragile-item
//! wrapping protocol, inter-robot collision avoidance, the mail pool capacity
//! contract, and the deterministic driver that ties them together.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Simulation::step`] advances the run by one tick:
//!
//! 1. **Generate** -- mail arriving this tick enters the pool.
//! 2. **Hand-out** -- the pool loads waiting robots and dispatches them.
//! 3. **Robots** -- each robot performs one action, in registration order.
//! 4. **Post-tick** -- buffered events reach their listeners.
//! 5. **Bookkeeping** -- the clock advances and the state hash is updated.
//!
//! ```rust,ignore
//! let mut sim = SimulationBuilder::new()
//!     .floors(10)
//!     .robots(RobotKind::FragileCapable, 3)
//!     .seed(30006)
//!     .build()?;
//! let summary = sim.run()?;
//! ```
//!
//! # Key Types
//!
//! - [`engine::Simulation`] -- Driver and owner of every collaborator.
//! - [`robot::Robot`] -- Per-robot state machine with hand, tube, and
//!   optional special slot.
//! - [`registry::RobotRegistry`] -- Robots in registration order, plus the
//!   presence snapshots used for collision checks.
//! - [`pool::MailPool`] -- Capacity contract between the pool and robots;
//!   [`pool::SimpleMailPool`] is the default oldest-first policy.
//! - [`delivery::DeliverySink`] -- Exactly-once delivery recording.
//! - [`event::EventBus`] -- Buffered typed events with passive listeners.

pub mod building;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod event;
pub mod fixed;
pub mod generator;
pub mod id;
pub mod item;
pub mod pool;
pub mod registry;
pub mod rng;
pub mod robot;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
