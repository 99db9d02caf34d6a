//! Delivery scoring and statistics for Automail runs.
//!
//! Listens to core events (`MailDelivered`, `DuplicateDelivery`,
//! `MoveSuppressed`) and aggregates them into a running score and the
//! per-category delivery counts printed at the end of a run.
//!
//! # Usage
//!
//! ```ignore
//! let stats = DeliveryStats::attach(&mut sim);
//! let summary = sim.run()?;
//! let report = Report::new(&stats.borrow(), sim.now(), config.statistics);
//! println!("{report}");
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use automail_core::delivery::DeliverySink;
use automail_core::engine::Simulation;
use automail_core::event::{Event, EventKind};
use automail_core::fixed::Ticks;
use automail_core::item::TOTAL_WRAPPING_TIME;
use automail_core::pool::MailPool;
use serde::Serialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Penalty exponent applied to delivery latency.
pub const LATENCY_PENALTY: f64 = 1.2;

/// Score for one delivery. Grows super-linearly with the ticks the item
/// spent between arriving at the mailroom and reaching its floor.
pub fn delivery_score(arrival: Ticks, delivered_at: Ticks) -> f64 {
    let priority_weight: f64 = 0.0;
    let latency = delivered_at.saturating_sub(arrival) as f64;
    latency.powf(LATENCY_PENALTY) * (1.0 + priority_weight.sqrt())
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Running totals fed by simulation events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryStats {
    pub total_score: f64,
    pub delivered: u64,
    pub normal_packs: u64,
    pub normal_weight: u64,
    pub caution_packs: u64,
    pub caution_weight: u64,
    /// Ticks spent wrapping and unwrapping delivered fragile items.
    pub wrapping_time: Ticks,
    pub last_delivery: Option<Ticks>,
    pub duplicates: u64,
    pub suppressed_moves: u64,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the totals. Events of other kinds are ignored.
    pub fn process_event(&mut self, event: &Event) {
        match *event {
            Event::MailDelivered {
                arrival,
                weight,
                fragile,
                tick,
                ..
            } => {
                self.total_score += delivery_score(arrival, tick);
                self.delivered += 1;
                self.last_delivery = Some(tick);
                if fragile {
                    self.caution_packs += 1;
                    self.caution_weight += u64::from(weight);
                    self.wrapping_time += TOTAL_WRAPPING_TIME;
                } else {
                    self.normal_packs += 1;
                    self.normal_weight += u64::from(weight);
                }
            }
            Event::DuplicateDelivery { .. } => self.duplicates += 1,
            Event::MoveSuppressed { .. } => self.suppressed_moves += 1,
            _ => {}
        }
    }

    /// Subscribe a shared `DeliveryStats` to `sim`'s events.
    pub fn attach<P: MailPool, S: DeliverySink>(
        sim: &mut Simulation<P, S>,
    ) -> Rc<RefCell<DeliveryStats>> {
        let stats = Rc::new(RefCell::new(DeliveryStats::new()));
        for kind in [
            EventKind::MailDelivered,
            EventKind::DuplicateDelivery,
            EventKind::MoveSuppressed,
        ] {
            let sink = Rc::clone(&stats);
            sim.on_passive(kind, Box::new(move |e| sink.borrow_mut().process_event(e)));
        }
        debug!(tick = sim.now(), "delivery statistics attached");
        stats
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The category breakdown printed when statistics are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsBlock {
    pub normal_packs: u64,
    pub caution_packs: u64,
    pub normal_weight: u64,
    pub caution_weight: u64,
    pub wrapping_time: Ticks,
}

/// End-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// The tick at which the run completed.
    pub final_tick: Ticks,
    pub total_score: f64,
    pub statistics: Option<StatisticsBlock>,
}

impl Report {
    pub fn new(stats: &DeliveryStats, final_tick: Ticks, with_statistics: bool) -> Self {
        let statistics = with_statistics.then(|| StatisticsBlock {
            normal_packs: stats.normal_packs,
            caution_packs: stats.caution_packs,
            normal_weight: stats.normal_weight,
            caution_weight: stats.caution_weight,
            wrapping_time: stats.wrapping_time,
        });
        Self {
            final_tick,
            total_score: stats.total_score,
            statistics,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "T: {} | Simulation complete!", self.final_tick)?;
        writeln!(f, "Final Delivery time: {}", self.final_tick)?;
        write!(f, "Final Score: {:.2}", self.total_score)?;
        if let Some(s) = &self.statistics {
            writeln!(f)?;
            writeln!(f, "Number of packages delivered normally: {}", s.normal_packs)?;
            writeln!(f, "Number of packages delivered using caution: {}", s.caution_packs)?;
            writeln!(f, "Total weight of packages delivered normally: {}", s.normal_weight)?;
            writeln!(
                f,
                "Total weight of packages delivered using caution: {}",
                s.caution_weight
            )?;
            write!(f, "Total time spent wrapping and unwrapping: {}", s.wrapping_time)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
