//! First-fit assignment over a pool of interchangeable resources.

use tracing::debug;

use crate::error::EngineError;
use crate::ledger::ResourceLedger;
use crate::model::{Booking, Interval};

/// Walks a ledger's resources in registration order and commits the
/// requested interval to the first one that accepts it.
pub struct AutoAssignQueue<'a> {
    ledger: &'a ResourceLedger,
}

impl<'a> AutoAssignQueue<'a> {
    pub fn new(ledger: &'a ResourceLedger) -> Self {
        Self { ledger }
    }

    /// Candidate ids, in the order they will be tried.
    pub fn candidates(&self) -> Vec<String> {
        self.ledger.list_ids()
    }

    /// Try each candidate once. A candidate that conflicts, is full, or was
    /// removed while we were walking the queue is skipped. Any other error
    /// aborts the walk since it would fail the same way on every candidate.
    pub async fn assign(&self, interval: Interval, owner: &str) -> Result<Booking, EngineError> {
        interval.validate()?;
        for id in self.candidates() {
            match self.ledger.book(&id, interval, owner).await {
                Ok(booking) => return Ok(booking),
                Err(EngineError::Conflict { .. })
                | Err(EngineError::UnknownResource(..))
                | Err(EngineError::LimitExceeded(..)) => {
                    debug!(kind = %self.ledger.kind(), id = %id, %interval, "candidate skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Err(EngineError::NoResourceAvailable(self.ledger.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;
    use crate::limits::MAX_BOOKINGS_PER_RESOURCE;
    use crate::model::{HOUR, ResourceAttrs, ResourceKind};

    fn laptops(ids: &[&str]) -> ResourceLedger {
        let ledger = ResourceLedger::new(ResourceKind::Laptop);
        for id in ids {
            ledger.add_resource(id, ResourceAttrs::Laptop).unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn first_fit_then_exhausted() {
        let ledger = laptops(&["L001", "L002"]);
        let queue = AutoAssignQueue::new(&ledger);
        let iv = Interval::new(36_000, 39_600);

        assert_eq!(queue.assign(iv, "carol").await.unwrap().resource_id, "L001");
        assert_eq!(queue.assign(iv, "carol").await.unwrap().resource_id, "L002");
        let err = assert_err!(queue.assign(iv, "carol").await);
        assert!(matches!(err, EngineError::NoResourceAvailable(ResourceKind::Laptop)));
    }

    #[tokio::test]
    async fn registration_order_not_lexical() {
        let ledger = laptops(&["L9", "L1"]);
        let queue = AutoAssignQueue::new(&ledger);
        assert_eq!(queue.candidates(), vec!["L9", "L1"]);
        let b = queue.assign(Interval::new(0, HOUR), "dave").await.unwrap();
        assert_eq!(b.resource_id, "L9");
    }

    #[tokio::test]
    async fn deterministic_for_same_state() {
        let a = laptops(&["L001", "L002", "L003"]);
        let b = laptops(&["L001", "L002", "L003"]);
        for ledger in [&a, &b] {
            ledger.book("L001", Interval::new(0, 2 * HOUR), "x").await.unwrap();
        }
        let iv = Interval::new(HOUR, 3 * HOUR);
        let ra = AutoAssignQueue::new(&a).assign(iv, "erin").await.unwrap();
        let rb = AutoAssignQueue::new(&b).assign(iv, "erin").await.unwrap();
        assert_eq!(ra.resource_id, "L002");
        assert_eq!(ra.resource_id, rb.resource_id);
    }

    #[tokio::test]
    async fn full_candidate_skipped() {
        let ledger = laptops(&["L001", "L002"]);
        for i in 0..MAX_BOOKINGS_PER_RESOURCE as i64 {
            ledger.book("L001", Interval::new(i * 10, i * 10 + 5), "x").await.unwrap();
        }
        let iv = Interval::new(10_000_000, 10_000_005);
        let err = ledger.book("L001", iv, "carol").await.unwrap_err();
        assert!(matches!(err, EngineError::LimitExceeded(_)));

        let b = AutoAssignQueue::new(&ledger).assign(iv, "carol").await.unwrap();
        assert_eq!(b.resource_id, "L002");
    }

    #[tokio::test]
    async fn empty_pool() {
        let ledger = laptops(&[]);
        let err = AutoAssignQueue::new(&ledger)
            .assign(Interval::new(0, HOUR), "carol")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoResourceAvailable(_)));
    }

    #[tokio::test]
    async fn invalid_interval_not_masked() {
        let ledger = laptops(&["L001"]);
        let err = AutoAssignQueue::new(&ledger)
            .assign(Interval { start: 10, end: 10 }, "carol")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInterval { .. }));
    }
}
