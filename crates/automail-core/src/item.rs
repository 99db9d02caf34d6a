//! Mail items and the fragile-item wrapping progression.
//!
//! A [`MailItem`] is immutable apart from its [`WrappingState`], which only
//! moves for fragile items: `Unwrapped -> HalfWrapped -> Wrapped` one step at
//! a time, then straight back to `Unwrapped` in a single unwrap step.

use crate::fixed::Ticks;
use crate::id::MailId;
use serde::{Deserialize, Serialize};

/// Ticks spent on a fragile item's wrapping lifecycle: two wrap steps and
/// one unwrap step.
pub const TOTAL_WRAPPING_TIME: Ticks = 3;

/// Protective packaging state of a mail item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WrappingState {
    #[default]
    Unwrapped,
    HalfWrapped,
    Wrapped,
}

impl WrappingState {
    fn advanced(self) -> Self {
        match self {
            WrappingState::Unwrapped => WrappingState::HalfWrapped,
            WrappingState::HalfWrapped | WrappingState::Wrapped => WrappingState::Wrapped,
        }
    }
}

/// A parcel travelling from the mailroom to its destination floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailItem {
    id: MailId,
    destination: u32,
    arrival: Ticks,
    /// Weight in grams.
    weight: u32,
    fragile: bool,
    wrapping: WrappingState,
}

impl MailItem {
    pub fn new(id: MailId, destination: u32, arrival: Ticks, weight: u32, fragile: bool) -> Self {
        Self {
            id,
            destination,
            arrival,
            weight,
            fragile,
            wrapping: WrappingState::Unwrapped,
        }
    }

    pub fn id(&self) -> MailId {
        self.id
    }

    pub fn destination(&self) -> u32 {
        self.destination
    }

    pub fn arrival(&self) -> Ticks {
        self.arrival
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn is_fragile(&self) -> bool {
        self.fragile
    }

    pub fn wrapping(&self) -> WrappingState {
        self.wrapping
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapping == WrappingState::Wrapped
    }

    /// Advance wrapping by one step. No-op for non-fragile or already wrapped
    /// items. Returns the state after the call.
    pub fn wrap(&mut self) -> WrappingState {
        if self.fragile {
            self.wrapping = self.wrapping.advanced();
        }
        self.wrapping
    }

    /// Remove the wrapping in one step. Only a fully wrapped fragile item can
    /// be unwrapped; returns whether anything changed.
    pub fn unwrap_packaging(&mut self) -> bool {
        if self.fragile && self.wrapping == WrappingState::Wrapped {
            self.wrapping = WrappingState::Unwrapped;
            true
        } else {
            false
        }
    }
}

impl std::fmt::Display for MailItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mail Item:: ID: {} | Arrival: {:4} | Destination: {:2} | Weight: {:4} | {:>7}",
            self.id,
            self.arrival,
            self.destination,
            self.weight,
            if self.fragile { "fragile" } else { "normal" }
        )
    }
}
