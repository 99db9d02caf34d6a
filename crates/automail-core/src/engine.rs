//! The simulation driver: owns every collaborator and runs the tick pipeline.
//!
//! # Tick pipeline
//!
//! Each `step()` runs:
//! 1. **Generate** -- release mail arriving this tick into the pool
//! 2. **Hand-out** -- the pool loads and dispatches waiting robots
//! 3. **Robots** -- every robot takes one step, in registration order
//! 4. **Post-tick** -- deliver buffered events to listeners
//! 5. **Bookkeeping** -- advance the clock, compute the state hash
//!
//! A fatal robot error skips bookkeeping and leaves the simulation aborted;
//! further steps return [`SimError::Aborted`].

use tracing::{debug, info};

use crate::building::Building;
use crate::delivery::{DeliveryLog, DeliverySink};
use crate::error::SimError;
use crate::event::{EventBus, EventKind, PassiveListener};
use crate::fixed::Ticks;
use crate::generator::{GeneratorConfig, MailGenerator};
use crate::item::MailItem;
use crate::pool::{MailPool, SimpleMailPool};
use crate::registry::{RegistryBuilder, RobotRegistry};
use crate::robot::{RobotKind, StepContext};
use crate::sim::{Clock, StateHash, StepOutcome};

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Simulation<P: MailPool = SimpleMailPool, S: DeliverySink = DeliveryLog> {
    building: Building,
    clock: Clock,
    robots: RobotRegistry,
    pool: P,
    sink: S,
    generator: MailGenerator,
    pub event_bus: EventBus,
    max_ticks: Option<Ticks>,
    aborted: bool,
    last_state_hash: u64,
}

/// Totals at the end of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: Ticks,
    pub delivered: usize,
    /// Items no robot could carry.
    pub undeliverable: usize,
}

impl<P: MailPool, S: DeliverySink> Simulation<P, S> {
    /// Assemble a simulation from already-built parts.
    pub fn from_parts(
        building: Building,
        robots: RobotRegistry,
        pool: P,
        sink: S,
        generator: MailGenerator,
    ) -> Self {
        Self {
            building,
            clock: Clock::new(),
            robots,
            pool,
            sink,
            generator,
            event_bus: EventBus::default(),
            max_ticks: None,
            aborted: false,
            last_state_hash: 0,
        }
    }

    /// Stop `run()` with [`SimError::TickLimitExceeded`] after `limit` ticks.
    pub fn set_max_ticks(&mut self, limit: Option<Ticks>) {
        self.max_ticks = limit;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn building(&self) -> &Building {
        &self.building
    }

    /// The tick the next `step()` will simulate.
    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    pub fn robots(&self) -> &RobotRegistry {
        &self.robots
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn generator(&self) -> &MailGenerator {
        &self.generator
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Hash of robot state after the most recent completed step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Every generated item is either delivered or known undeliverable.
    pub fn is_finished(&self) -> bool {
        self.generator.remaining() == 0
            && self.sink.delivered_count() + self.pool.undeliverable() >= self.generator.total()
    }

    // -----------------------------------------------------------------------
    // Event system
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Simulate one tick.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        if self.aborted {
            return Err(SimError::Aborted);
        }
        let tick = self.clock.now();

        let arrived = self
            .generator
            .step(tick, &mut self.pool, &mut self.event_bus);
        self.pool.step(&mut self.robots, tick, &mut self.event_bus);

        let before = self.sink.delivered_count();
        if let Err(err) = self.step_robots(tick) {
            self.aborted = true;
            self.event_bus.deliver();
            return Err(err);
        }
        let delivered = self.sink.delivered_count() - before;

        self.event_bus.deliver();

        self.clock.advance();
        self.last_state_hash = self.compute_state_hash();

        Ok(StepOutcome {
            tick,
            arrived,
            delivered,
            finished: self.is_finished(),
        })
    }

    fn step_robots(&mut self, tick: Ticks) -> Result<(), SimError> {
        let mut snapshot = self.robots.snapshot();
        for i in 0..self.robots.len() {
            let id = self.robots.ids()[i];
            let Some(robot) = self.robots.get_mut(id) else {
                continue;
            };
            let mut ctx = StepContext {
                tick,
                building: &self.building,
                snapshot: &snapshot,
                pool: &mut self.pool,
                sink: &mut self.sink,
                events: &mut self.event_bus,
            };
            robot.step(&mut ctx)?;
            snapshot.refresh(robot.presence());
        }
        Ok(())
    }

    /// Step until every item is accounted for.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        while !self.is_finished() {
            if let Some(limit) = self.max_ticks
                && self.clock.now() >= limit
            {
                return Err(SimError::TickLimitExceeded { limit });
            }
            self.step()?;
        }
        let summary = RunSummary {
            ticks: self.clock.now(),
            delivered: self.sink.delivered_count(),
            undeliverable: self.pool.undeliverable(),
        };
        info!(?summary, "simulation finished");
        Ok(summary)
    }

    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.clock.now());
        self.robots.hash_into(&mut hasher);
        hasher.write_u64(self.pool.pending() as u64);
        hasher.write_u64(self.sink.delivered_count() as u64);
        hasher.finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`Simulation`] with the default pool and sink.
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    floors: u32,
    mailroom: u32,
    fleet: Vec<(RobotKind, usize)>,
    mail: GeneratorConfig,
    seed: u64,
    max_ticks: Option<Ticks>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self {
            floors: 10,
            mailroom: Building::LOWEST_FLOOR,
            fleet: Vec::new(),
            mail: GeneratorConfig::default(),
            seed: 0,
            max_ticks: None,
        }
    }
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn floors(mut self, floors: u32) -> Self {
        self.floors = floors;
        self
    }

    pub fn mailroom(mut self, floor: u32) -> Self {
        self.mailroom = floor;
        self
    }

    /// Add `count` robots of `kind`. Robots step in the order added.
    pub fn robots(mut self, kind: RobotKind, count: usize) -> Self {
        self.fleet.push((kind, count));
        self
    }

    pub fn mail(mut self, mail: GeneratorConfig) -> Self {
        self.mail = mail;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn max_ticks(mut self, limit: Option<Ticks>) -> Self {
        self.max_ticks = limit;
        self
    }

    /// Build with a generated mail schedule.
    pub fn build(self) -> Result<Simulation, SimError> {
        let building = self.building()?;
        let generator = MailGenerator::new(&self.mail, &building, self.seed);
        self.finish(building, generator)
    }

    /// Build with a fixed list of items instead of a generated schedule.
    pub fn build_with_mail(self, items: Vec<MailItem>) -> Result<Simulation, SimError> {
        let building = self.building()?;
        self.finish(building, MailGenerator::from_items(items))
    }

    fn building(&self) -> Result<Building, SimError> {
        Building::with_mailroom(self.floors, self.mailroom)
            .map_err(|e| SimError::Config(e.to_string()))
    }

    fn finish(self, building: Building, generator: MailGenerator) -> Result<Simulation, SimError> {
        let mut registry = RegistryBuilder::new(building.mailroom());
        for (kind, count) in &self.fleet {
            registry.register_many(*kind, *count);
        }
        let robots = registry.build();
        if robots.is_empty() {
            return Err(SimError::Config("at least one robot is required".into()));
        }
        let can_carry_fragile = self
            .fleet
            .iter()
            .any(|(kind, count)| *count > 0 && kind.has_special_slot());
        if !can_carry_fragile && generator.schedule().iter().any(MailItem::is_fragile) {
            return Err(SimError::Config(
                "fragile mail needs at least one fragile-capable robot".into(),
            ));
        }
        debug!(
            floors = building.floors(),
            mailroom = building.mailroom(),
            robots = robots.len(),
            mail = generator.total(),
            "simulation assembled"
        );
        let mut sim = Simulation::from_parts(
            building,
            robots,
            SimpleMailPool::new(),
            DeliveryLog::new(),
            generator,
        );
        sim.set_max_ticks(self.max_ticks);
        Ok(sim)
    }
}
