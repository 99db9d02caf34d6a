//! Seeded mail generation and arrival scheduling.
//!
//! The whole schedule is drawn up front so that the number of items is known
//! before the first tick; [`MailGenerator::step`] then releases each item into
//! the pool on its arrival tick.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::building::Building;
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::id::MailIdAllocator;
use crate::item::MailItem;
use crate::pool::MailPool;
use crate::rng::SimRng;

/// Parameters for drawing a mail schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub mail_to_create: u32,
    /// Heaviest item drawn, in grams.
    pub mail_max_weight: u32,
    /// Latest arrival tick.
    pub last_delivery_time: Ticks,
    /// Probability that an item is fragile. `None` disables fragile mail.
    pub fragile_chance: Option<Fixed64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mail_to_create: 80,
            mail_max_weight: 2000,
            last_delivery_time: 100,
            fragile_chance: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailGenerator {
    /// Sorted by (arrival, id).
    schedule: Vec<MailItem>,
    next: usize,
}

impl MailGenerator {
    /// Draw a complete schedule for `building` from `seed`.
    pub fn new(config: &GeneratorConfig, building: &Building, seed: u64) -> Self {
        let mut rng = SimRng::new(seed);
        let mut ids = MailIdAllocator::new();
        let mut schedule: Vec<MailItem> = (0..config.mail_to_create)
            .map(|_| {
                let destination = rng.range_inclusive(
                    u64::from(Building::LOWEST_FLOOR),
                    u64::from(building.top_floor()),
                ) as u32;
                let arrival = rng.range_inclusive(1, config.last_delivery_time.max(1));
                let weight = rng.range_inclusive(1, u64::from(config.mail_max_weight.max(1))) as u32;
                let fragile = config.fragile_chance.is_some_and(|p| rng.chance(p));
                MailItem::new(ids.allocate(), destination, arrival, weight, fragile)
            })
            .collect();
        schedule.sort_by_key(|item| (item.arrival(), item.id()));
        debug!(items = schedule.len(), seed, "mail schedule drawn");
        Self { schedule, next: 0 }
    }

    /// A generator releasing a fixed list of items.
    pub fn from_items(mut items: Vec<MailItem>) -> Self {
        items.sort_by_key(|item| (item.arrival(), item.id()));
        Self {
            schedule: items,
            next: 0,
        }
    }

    /// Items in the whole schedule.
    pub fn total(&self) -> usize {
        self.schedule.len()
    }

    /// Items not yet released.
    pub fn remaining(&self) -> usize {
        self.schedule.len() - self.next
    }

    pub fn schedule(&self) -> &[MailItem] {
        &self.schedule
    }

    /// Release every item arriving at or before `tick` into `pool`. Returns
    /// how many were released.
    pub fn step(&mut self, tick: Ticks, pool: &mut dyn MailPool, events: &mut EventBus) -> usize {
        let start = self.next;
        while let Some(item) = self.schedule.get(self.next)
            && item.arrival() <= tick
        {
            debug!(tick, "arrived [{item}]");
            events.emit(Event::MailArrived {
                item: item.id(),
                destination: item.destination(),
                tick,
            });
            pool.intake(item.clone());
            self.next += 1;
        }
        self.next - start
    }
}
