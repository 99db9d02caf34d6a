//! Clock and per-step bookkeeping types.

use crate::fixed::Ticks;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic simulation clock. Only the simulation driver advances it, once
/// per step.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Clock {
    tick: Ticks,
}

impl Clock {
    /// Create a clock starting at tick 0.
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    /// The current tick.
    pub fn now(&self) -> Ticks {
        self.tick
    }

    /// Advance by exactly one tick and return the new time.
    pub(crate) fn advance(&mut self) -> Ticks {
        self.tick += 1;
        self.tick
    }
}

// ---------------------------------------------------------------------------
// Step outcome
// ---------------------------------------------------------------------------

/// What happened during one `Simulation::step()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// The tick that was simulated.
    pub tick: Ticks,
    /// Mail items that arrived at the pool this tick.
    pub arrived: usize,
    /// Mail items handed to the delivery sink this tick.
    pub delivered: usize,
    /// Whether every generated item has now been accounted for.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for reproducibility checks.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
