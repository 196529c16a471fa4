//! Per-kind booking ledgers.
//!
//! A [`ResourceLedger`] holds every resource of one kind. Each resource owns
//! an [`IntervalTree`] of its bookings behind its own `RwLock`, so a booking
//! holds the write lock of exactly one resource across the conflict check and
//! the insert, while readers of that resource wait for the commit and readers
//! of other resources proceed.

mod availability;
mod conflict;

pub use availability::{free_slots, merge_overlapping, subtract_intervals};
pub(crate) use conflict::validate_interval;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::interval_tree::IntervalTree;
use crate::limits::MAX_RESOURCES_PER_KIND;
use crate::model::*;
use crate::validate;

use conflict::check_no_conflict;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

/// Map entry: the registration sequence number lives outside the lock so
/// ordering never waits on a writer.
#[derive(Clone)]
struct Slot {
    seq: u64,
    state: SharedResourceState,
}

#[derive(Debug)]
pub struct ResourceState {
    pub id: String,
    /// Registration sequence number; orders `list_ids`.
    pub seq: u64,
    pub attrs: ResourceAttrs,
    /// Committed bookings keyed by interval, payload = owner.
    pub bookings: IntervalTree<String>,
    /// Set under the write lock when the resource is removed, so a booking
    /// that raced the removal cannot commit into a detached ledger.
    retired: bool,
}

impl ResourceState {
    pub fn new(id: String, seq: u64, attrs: ResourceAttrs) -> Self {
        Self {
            id,
            seq,
            attrs,
            bookings: IntervalTree::new(),
            retired: false,
        }
    }

    fn booking(&self, interval: Interval, owner: &str) -> Booking {
        Booking {
            kind: self.attrs.kind(),
            resource_id: self.id.clone(),
            interval,
            owner: owner.to_string(),
        }
    }

    /// All bookings in start order.
    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings
            .iter()
            .map(|(interval, owner)| self.booking(interval, owner))
            .collect()
    }

    fn user_booking(&self, interval: Interval, owner: &str) -> UserBooking {
        let (title, author) = match &self.attrs {
            ResourceAttrs::Book { title, author } => (Some(title.clone()), Some(author.clone())),
            ResourceAttrs::Room | ResourceAttrs::Laptop => (None, None),
        };
        UserBooking {
            booking: self.booking(interval, owner),
            title,
            author,
        }
    }
}

/// All resources of one kind, keyed by resource id.
pub struct ResourceLedger {
    kind: ResourceKind,
    resources: DashMap<String, Slot>,
    next_seq: AtomicU64,
}

impl ResourceLedger {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            resources: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<SharedResourceState, EngineError> {
        self.resources
            .get(id)
            .map(|e| e.value().state.clone())
            .ok_or_else(|| EngineError::UnknownResource(self.kind, id.to_string()))
    }

    /// Snapshot of the resource handles in registration order.
    fn ordered(&self) -> Vec<SharedResourceState> {
        let mut slots: Vec<Slot> = self.resources.iter().map(|e| e.value().clone()).collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.state).collect()
    }

    // ── Resource CRUD ────────────────────────────────────────

    pub fn add_resource(&self, id: &str, attrs: ResourceAttrs) -> Result<(), EngineError> {
        validate::resource_id(id)?;
        validate::attrs(&attrs)?;
        if attrs.kind() != self.kind {
            return Err(EngineError::InvalidField {
                field: "resource kind",
                reason: "does not match ledger",
            });
        }
        if self.resources.len() >= MAX_RESOURCES_PER_KIND {
            return Err(EngineError::LimitExceeded("too many resources"));
        }
        match self.resources.entry(id.to_string()) {
            Entry::Occupied(_) => Err(EngineError::DuplicateResource(self.kind, id.to_string())),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                let state = ResourceState::new(id.to_string(), seq, attrs);
                slot.insert(Slot {
                    seq,
                    state: Arc::new(RwLock::new(state)),
                });
                info!(kind = %self.kind, id, "resource added");
                Ok(())
            }
        }
    }

    /// Remove a resource and every booking on it. Returns the discarded
    /// bookings.
    pub async fn remove_resource(&self, id: &str) -> Result<Vec<Booking>, EngineError> {
        let (_, slot) = self
            .resources
            .remove(id)
            .ok_or_else(|| EngineError::UnknownResource(self.kind, id.to_string()))?;
        let mut guard = slot.state.write().await;
        let discarded = guard.bookings();
        guard.bookings.clear();
        guard.retired = true;
        info!(kind = %self.kind, id, cancelled = discarded.len(), "resource removed");
        Ok(discarded)
    }

    // ── Bookings ─────────────────────────────────────────────

    /// Conflict-checked booking. The check and the insert happen under one
    /// write lock; a rejected call leaves the resource untouched.
    pub async fn book(&self, id: &str, interval: Interval, owner: &str) -> Result<Booking, EngineError> {
        let rs = self.get(id)?;
        validate_interval(&interval)?;
        validate::username(owner)?;

        let mut guard = rs.write().await;
        if guard.retired {
            return Err(EngineError::UnknownResource(self.kind, id.to_string()));
        }
        if let Err(e) = check_no_conflict(&guard, &interval) {
            debug!(kind = %self.kind, id, %interval, owner, "booking rejected: {e}");
            return Err(e);
        }
        guard.bookings.insert(interval, owner.to_string());
        info!(kind = %self.kind, id, %interval, owner, "booking committed");
        Ok(guard.booking(interval, owner))
    }

    /// Remove exactly the booking `(interval, owner)` from resource `id`.
    pub async fn cancel(&self, id: &str, interval: Interval, owner: &str) -> Result<Booking, EngineError> {
        let rs = self.get(id)?;
        let mut guard = rs.write().await;
        if guard.retired {
            return Err(EngineError::UnknownResource(self.kind, id.to_string()));
        }
        let owner_key = owner.to_string();
        match guard.bookings.remove(&interval, &owner_key) {
            Some(_) => {
                info!(kind = %self.kind, id, %interval, owner, "booking cancelled");
                Ok(guard.booking(interval, owner))
            }
            None => Err(EngineError::UnknownBooking {
                kind: self.kind,
                resource_id: id.to_string(),
                interval,
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────

    pub async fn bookings_for(&self, id: &str) -> Result<Vec<Booking>, EngineError> {
        let rs = self.get(id)?;
        let guard = rs.read().await;
        Ok(guard.bookings())
    }

    /// Bookings on `id` that overlap `query`, in start order.
    pub async fn overlapping(&self, id: &str, query: &Interval) -> Result<Vec<Booking>, EngineError> {
        let rs = self.get(id)?;
        let guard = rs.read().await;
        Ok(guard
            .bookings
            .query_overlaps(query)
            .into_iter()
            .map(|(interval, owner)| guard.booking(interval, owner))
            .collect())
    }

    pub async fn free_slots(&self, id: &str, window: &Interval) -> Result<Vec<Interval>, EngineError> {
        validate_interval(window)?;
        let rs = self.get(id)?;
        let guard = rs.read().await;
        Ok(free_slots(&guard, window))
    }

    /// Resource ids in registration order.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<(u64, String)> = self
            .resources
            .iter()
            .map(|e| (e.value().seq, e.key().clone()))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub async fn resources(&self) -> Vec<ResourceInfo> {
        let mut out = Vec::with_capacity(self.resources.len());
        for rs in self.ordered() {
            let guard = rs.read().await;
            if guard.retired {
                continue;
            }
            out.push(ResourceInfo {
                id: guard.id.clone(),
                attrs: guard.attrs.clone(),
            });
        }
        out
    }

    pub async fn attrs(&self, id: &str) -> Result<ResourceAttrs, EngineError> {
        let rs = self.get(id)?;
        let guard = rs.read().await;
        Ok(guard.attrs.clone())
    }

    /// Every booking of every resource, resources in registration order.
    pub async fn all_bookings(&self) -> Vec<Booking> {
        let mut out = Vec::new();
        for rs in self.ordered() {
            let guard = rs.read().await;
            out.extend(guard.bookings());
        }
        out
    }

    /// Bookings owned by `owner` across this ledger, enriched for display.
    pub async fn bookings_owned_by(&self, owner: &str) -> Vec<UserBooking> {
        let mut out = Vec::new();
        for rs in self.ordered() {
            let guard = rs.read().await;
            for (interval, o) in guard.bookings.iter() {
                if o == owner {
                    out.push(guard.user_booking(interval, o));
                }
            }
        }
        out
    }

    /// How many of `owner`'s bookings in this ledger overlap `query`.
    pub async fn owner_overlaps(&self, owner: &str, query: &Interval) -> usize {
        let mut count = 0;
        for rs in self.ordered() {
            let guard = rs.read().await;
            count += guard
                .bookings
                .query_overlaps(query)
                .into_iter()
                .filter(|(_, o)| o.as_str() == owner)
                .count();
        }
        count
    }
}
