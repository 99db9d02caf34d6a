//! The delivery sink: where items go once a robot hands them over.

use std::collections::HashSet;

use crate::error::ErrorKind;
use crate::fixed::Ticks;
use crate::id::MailId;
use crate::item::MailItem;

/// Receives completed deliveries. Implementations must refuse an item that
/// was already delivered.
pub trait DeliverySink {
    /// Record `item` as delivered at `tick`.
    fn deliver(&mut self, item: MailItem, tick: Ticks) -> Result<(), DeliveryError>;

    /// Number of distinct items delivered so far.
    fn delivered_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("mail item {item} was already delivered")]
    MailAlreadyDelivered { item: MailId },
}

impl DeliveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeliveryError::MailAlreadyDelivered { .. } => ErrorKind::DuplicateDelivery,
        }
    }
}

/// One completed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub item: MailItem,
    pub delivered_at: Ticks,
}

impl DeliveryRecord {
    /// Ticks between arrival at the mailroom and delivery.
    pub fn latency(&self) -> Ticks {
        self.delivered_at.saturating_sub(self.item.arrival())
    }
}

/// In-memory sink keeping every delivery in order.
#[derive(Debug, Default)]
pub struct DeliveryLog {
    records: Vec<DeliveryRecord>,
    seen: HashSet<MailId>,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries in the order they happened.
    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    pub fn contains(&self, item: MailId) -> bool {
        self.seen.contains(&item)
    }

    /// The delivery record for `item`, if it was delivered.
    pub fn record(&self, item: MailId) -> Option<&DeliveryRecord> {
        self.records.iter().find(|r| r.item.id() == item)
    }
}

impl DeliverySink for DeliveryLog {
    fn deliver(&mut self, item: MailItem, tick: Ticks) -> Result<(), DeliveryError> {
        if !self.seen.insert(item.id()) {
            return Err(DeliveryError::MailAlreadyDelivered { item: item.id() });
        }
        self.records.push(DeliveryRecord {
            item,
            delivered_at: tick,
        });
        Ok(())
    }

    fn delivered_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64) -> MailItem {
        MailItem::new(MailId(id), 4, 2, 250, false)
    }

    #[test]
    fn records_delivery_with_tick() {
        let mut log = DeliveryLog::new();
        log.deliver(item(0), 9).unwrap();
        assert_eq!(log.delivered_count(), 1);
        let record = log.record(MailId(0)).unwrap();
        assert_eq!(record.delivered_at, 9);
        assert_eq!(record.latency(), 7);
    }

    #[test]
    fn duplicate_delivery_is_refused() {
        let mut log = DeliveryLog::new();
        log.deliver(item(3), 5).unwrap();
        let err = log.deliver(item(3), 6).unwrap_err();
        assert_eq!(err, DeliveryError::MailAlreadyDelivered { item: MailId(3) });
        assert_eq!(err.kind(), ErrorKind::DuplicateDelivery);
        assert_eq!(log.delivered_count(), 1);
        assert_eq!(log.record(MailId(3)).unwrap().delivered_at, 5);
    }
}
