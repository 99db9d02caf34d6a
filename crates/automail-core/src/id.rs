use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a robot in the [`RobotRegistry`](crate::registry::RobotRegistry).
    pub struct RobotId;
}

/// Identifies a mail item. Assigned monotonically at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MailId(pub u64);

impl std::fmt::Display for MailId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:6}", self.0)
    }
}

/// Hands out [`MailId`]s in increasing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailIdAllocator {
    next: u64,
}

impl MailIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier.
    pub fn allocate(&mut self) -> MailId {
        let id = MailId(self.next);
        self.next += 1;
        id
    }

    /// Number of identifiers handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next
    }
}
