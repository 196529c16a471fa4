use std::time::Instant;

use tracing::debug;

use crate::auto_assign::AutoAssignQueue;
use crate::error::EngineError;
use crate::ledger::ResourceLedger;
use crate::model::*;

use super::{LibrarySystem, record_booking, record_duration};

impl LibrarySystem {
    // ── Resource administration ──────────────────────────────

    pub fn add_resource(&self, id: &str, attrs: ResourceAttrs) -> Outcome {
        let kind = attrs.kind();
        match self.ledger(kind).add_resource(id, attrs) {
            Ok(()) => {
                self.update_resource_gauge(kind);
                Outcome::ok(format!("{} {id} added successfully.", kind.label()))
            }
            Err(e) => Outcome::failed(&e),
        }
    }

    pub fn add_room(&self, id: &str) -> Outcome {
        self.add_resource(id, ResourceAttrs::Room)
    }

    pub fn add_laptop(&self, id: &str) -> Outcome {
        self.add_resource(id, ResourceAttrs::Laptop)
    }

    pub fn add_book(&self, id: &str, title: &str, author: &str) -> Outcome {
        self.add_resource(
            id,
            ResourceAttrs::Book {
                title: title.to_string(),
                author: author.to_string(),
            },
        )
    }

    /// Remove a resource; its bookings are cancelled with it.
    pub async fn remove_resource(&self, kind: ResourceKind, id: &str) -> Outcome {
        match self.ledger(kind).remove_resource(id).await {
            Ok(cancelled) => {
                self.update_resource_gauge(kind);
                let message = match cancelled.len() {
                    0 => format!("{} {id} removed successfully.", kind.label()),
                    n => format!("{} {id} removed successfully ({n} booking(s) cancelled).", kind.label()),
                };
                Outcome::ok(message)
            }
            Err(e) => Outcome::failed(&e),
        }
    }

    pub async fn remove_room(&self, id: &str) -> Outcome {
        self.remove_resource(ResourceKind::Room, id).await
    }

    pub async fn remove_laptop(&self, id: &str) -> Outcome {
        self.remove_resource(ResourceKind::Laptop, id).await
    }

    pub async fn remove_book(&self, id: &str) -> Outcome {
        self.remove_resource(ResourceKind::Book, id).await
    }

    // ── Bookings ─────────────────────────────────────────────

    /// Book `interval` for `owner`, either on `id` or, when `id` is `None`,
    /// on the first resource of the pool that accepts it. Owner limits are
    /// checked and the booking committed under the owner's lock.
    pub async fn reserve(
        &self,
        kind: ResourceKind,
        id: Option<&str>,
        interval: Interval,
        owner: &str,
    ) -> Result<Booking, EngineError> {
        let ledger = self.ledger(kind);
        if let Some(id) = id
            && !ledger.contains(id)
        {
            return Err(EngineError::UnknownResource(kind, id.to_string()));
        }
        interval.validate()?;

        let Some(limit) = self.owner_limits.for_kind(kind) else {
            return commit(ledger, id, interval, owner).await;
        };
        let lock = self.owner_lock(owner);
        let result = {
            let _guard = lock.lock().await;
            let held = ledger.owner_overlaps(owner, &interval).await;
            if held >= limit as usize {
                debug!(%kind, owner, held, limit, "owner limit reached");
                Err(EngineError::OwnerLimitReached { kind, limit })
            } else {
                commit(ledger, id, interval, owner).await
            }
        };
        self.release_owner_lock(owner, lock);
        result
    }

    async fn reserve_outcome(
        &self,
        op: &'static str,
        kind: ResourceKind,
        id: Option<&str>,
        interval: Interval,
        owner: &str,
        success: impl FnOnce(&Booking) -> Outcome,
    ) -> Outcome {
        let started = Instant::now();
        let result = self.reserve(kind, id, interval, owner).await;
        record_booking(kind, &result);
        record_duration(op, started);
        match result {
            Ok(booking) => success(&booking),
            Err(e) => Outcome::failed(&e),
        }
    }

    pub async fn book_room(&self, id: &str, start: Secs, end: Secs, user: &str) -> Outcome {
        self.reserve_outcome(
            "book_room",
            ResourceKind::Room,
            Some(id),
            Interval { start, end },
            user,
            |_| Outcome::ok("Room booked successfully!"),
        )
        .await
    }

    /// Auto-assign the first free laptop. The chosen id is in
    /// `Outcome::resource_id`.
    pub async fn borrow_any_laptop(&self, start: Secs, end: Secs, user: &str) -> Outcome {
        self.reserve_outcome(
            "borrow_any_laptop",
            ResourceKind::Laptop,
            None,
            Interval { start, end },
            user,
            |b| {
                Outcome::ok(format!("Laptop {} assigned successfully!", b.resource_id)).with_resource(&b.resource_id)
            },
        )
        .await
    }

    pub async fn borrow_laptop(&self, id: &str, start: Secs, end: Secs, user: &str) -> Outcome {
        self.reserve_outcome(
            "borrow_laptop",
            ResourceKind::Laptop,
            Some(id),
            Interval { start, end },
            user,
            |b| Outcome::ok(format!("Laptop {} borrowed successfully!", b.resource_id)).with_resource(&b.resource_id),
        )
        .await
    }

    pub async fn borrow_book(&self, id: &str, start: Secs, end: Secs, user: &str) -> Outcome {
        self.reserve_outcome(
            "borrow_book",
            ResourceKind::Book,
            Some(id),
            Interval { start, end },
            user,
            |_| Outcome::ok("Book borrowed successfully!"),
        )
        .await
    }

    pub async fn cancel_booking(&self, kind: ResourceKind, id: &str, start: Secs, end: Secs, user: &str) -> Outcome {
        let started = Instant::now();
        let result = self.ledger(kind).cancel(id, Interval { start, end }, user).await;
        record_duration("cancel", started);
        match result {
            Ok(_) => Outcome::ok("Booking cancelled successfully."),
            Err(e) => Outcome::failed(&e),
        }
    }

    // ── Accounts ─────────────────────────────────────────────

    pub fn change_password(&self, user: &str, current: &str, new: &str) -> Outcome {
        match self.users.change_password(user, current, new) {
            Ok(()) => Outcome::ok("Password changed successfully."),
            Err(e) => Outcome::failed(&e),
        }
    }
}

async fn commit(ledger: &ResourceLedger, id: Option<&str>, interval: Interval, owner: &str) -> Result<Booking, EngineError> {
    match id {
        Some(id) => ledger.book(id, interval, owner).await,
        None => AutoAssignQueue::new(ledger).assign(interval, owner).await,
    }
}
