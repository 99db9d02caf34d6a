//! Error taxonomy for a simulation run.
//!
//! Load and delivery failures are local to the operation that raised them
//! ([`LoadError`](crate::robot::LoadError),
//! [`DeliveryError`](crate::delivery::DeliveryError)). Only [`SimError`]
//! crosses a step boundary, and only [`SimError::ExcessiveDelivery`] is
//! raised by a robot.

use crate::fixed::Ticks;

/// Classification shared by every failure the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An item was too heavy, or no slot was free for it.
    CapacityViolation,
    /// A fragile item was routed into a non-special slot, or the reverse.
    FragilityViolation,
    /// A robot delivered more items in one trip than it can carry.
    ExcessiveDelivery,
    /// The delivery sink saw the same item twice.
    DuplicateDelivery,
}

impl ErrorKind {
    /// Fatal kinds abort the whole run.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::ExcessiveDelivery)
    }
}

/// Errors that stop a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// A robot exceeded its per-trip delivery limit. Upstream scheduling has
    /// already broken an invariant; the run cannot continue.
    #[error("robot {robot} delivered {delivered} items in one trip (limit {limit})")]
    ExcessiveDelivery {
        robot: String,
        delivered: u32,
        limit: u32,
    },

    /// The simulation was stepped again after a fatal error.
    #[error("simulation already aborted")]
    Aborted,

    /// The run did not finish within the configured tick budget.
    #[error("simulation did not finish within {limit} ticks")]
    TickLimitExceeded { limit: Ticks },

    /// The simulation could not be assembled from its parts.
    #[error("invalid simulation setup: {0}")]
    Config(String),
}

impl SimError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SimError::ExcessiveDelivery { .. } => Some(ErrorKind::ExcessiveDelivery),
            SimError::Aborted | SimError::TickLimitExceeded { .. } | SimError::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_excessive_delivery_is_fatal() {
        assert!(ErrorKind::ExcessiveDelivery.is_fatal());
        assert!(!ErrorKind::CapacityViolation.is_fatal());
        assert!(!ErrorKind::FragilityViolation.is_fatal());
        assert!(!ErrorKind::DuplicateDelivery.is_fatal());
    }

    #[test]
    fn excessive_delivery_message() {
        let err = SimError::ExcessiveDelivery {
            robot: "R0".into(),
            delivered: 3,
            limit: 2,
        };
        assert_eq!(err.kind(), Some(ErrorKind::ExcessiveDelivery));
        assert_eq!(
            err.to_string(),
            "robot R0 delivered 3 items in one trip (limit 2)"
        );
    }
}
