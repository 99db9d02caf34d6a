//! Static building topology: how many floors there are and where the
//! mailroom sits.
//!
//! Floors are numbered from [`Building::LOWEST_FLOOR`] upwards. The building
//! is built once before a run and never changes afterwards.

use serde::{Deserialize, Serialize};

/// Building topology. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    floors: u32,
    mailroom: u32,
}

impl Building {
    /// The number of the ground floor.
    pub const LOWEST_FLOOR: u32 = 1;

    /// Create a building with `floors` floors and the mailroom on the lowest
    /// floor.
    pub fn new(floors: u32) -> Result<Self, BuildingError> {
        Self::with_mailroom(floors, Self::LOWEST_FLOOR)
    }

    /// Create a building with the mailroom on an explicit floor.
    pub fn with_mailroom(floors: u32, mailroom: u32) -> Result<Self, BuildingError> {
        if floors == 0 {
            return Err(BuildingError::NoFloors);
        }
        let building = Self { floors, mailroom };
        if !building.contains(mailroom) {
            return Err(BuildingError::MailroomOutside {
                mailroom,
                top: building.top_floor(),
            });
        }
        Ok(building)
    }

    pub fn floors(&self) -> u32 {
        self.floors
    }

    pub fn mailroom(&self) -> u32 {
        self.mailroom
    }

    pub fn top_floor(&self) -> u32 {
        self.floors - 1 + Self::LOWEST_FLOOR
    }

    /// Whether `floor` exists in this building.
    pub fn contains(&self, floor: u32) -> bool {
        (Self::LOWEST_FLOOR..=self.top_floor()).contains(&floor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildingError {
    #[error("a building needs at least one floor")]
    NoFloors,
    #[error("mailroom floor {mailroom} is outside floors 1..={top}")]
    MailroomOutside { mailroom: u32, top: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mailroom_is_ground_floor() {
        let b = Building::new(10).unwrap();
        assert_eq!(b.mailroom(), 1);
        assert_eq!(b.top_floor(), 10);
        assert!(b.contains(1));
        assert!(b.contains(10));
        assert!(!b.contains(0));
        assert!(!b.contains(11));
    }

    #[test]
    fn zero_floors_rejected() {
        assert_eq!(Building::new(0), Err(BuildingError::NoFloors));
    }

    #[test]
    fn mailroom_must_be_inside() {
        let err = Building::with_mailroom(5, 6).unwrap_err();
        assert_eq!(err, BuildingError::MailroomOutside { mailroom: 6, top: 5 });
        assert!(err.to_string().contains("outside"));
    }
}
