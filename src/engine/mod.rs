mod mutations;
mod queries;

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Config, OwnerLimits};
use crate::error::EngineError;
use crate::ledger::ResourceLedger;
use crate::model::*;
use crate::observability;
use crate::store::{self, PersistenceStore, Snapshot};
use crate::users::UserDirectory;

/// The reservation engine handle. Built once at startup and shared by
/// reference; every screen or command talks to the same instance.
pub struct LibrarySystem {
    rooms: ResourceLedger,
    laptops: ResourceLedger,
    books: ResourceLedger,
    users: UserDirectory,
    owner_limits: OwnerLimits,
    /// Serializes limit-checked bookings of one owner.
    owner_locks: DashMap<String, Arc<Mutex<()>>>,
    store: Option<PersistenceStore>,
}

impl LibrarySystem {
    fn empty(owner_limits: OwnerLimits, store: Option<PersistenceStore>) -> Self {
        Self {
            rooms: ResourceLedger::new(ResourceKind::Room),
            laptops: ResourceLedger::new(ResourceKind::Laptop),
            books: ResourceLedger::new(ResourceKind::Book),
            users: UserDirectory::new(),
            owner_limits,
            owner_locks: DashMap::new(),
            store,
        }
    }

    /// A system with no data directory, provisioned with the default users.
    /// `save` is a no-op.
    pub fn in_memory(owner_limits: OwnerLimits) -> Self {
        let system = Self::empty(owner_limits, None);
        system.users.seed_defaults();
        system
    }

    /// Load the snapshot in `config.data_dir` (missing files are empty) and
    /// return a system ready to accept operations.
    pub async fn open(config: &Config) -> Result<Self, EngineError> {
        let store = PersistenceStore::open(&config.data_dir)?;
        let snapshot = store.load()?;
        let system = Self::empty(config.owner_limits, Some(store));
        let skipped = system.restore(snapshot).await;
        if config.seed_users && system.users.is_empty() {
            system.users.seed_defaults();
        }
        info!(
            data_dir = %config.data_dir.display(),
            rooms = system.rooms.len(),
            laptops = system.laptops.len(),
            books = system.books.len(),
            users = system.users.len(),
            skipped,
            "library system loaded"
        );
        Ok(system)
    }

    /// Apply a loaded snapshot. Records that collide with what is already
    /// present (duplicate ids, unknown resources, overlapping bookings,
    /// duplicate users) are logged and skipped. Returns the skip count.
    pub async fn restore(&self, snapshot: Snapshot) -> usize {
        let mut skipped = 0;
        for info in snapshot.resources {
            let kind = info.attrs.kind();
            if let Err(e) = self.ledger(kind).add_resource(&info.id, info.attrs) {
                store::skip_record(&e, "resources");
                skipped += 1;
            }
        }
        for b in snapshot.bookings {
            if let Err(e) = self.ledger(b.kind).book(&b.resource_id, b.interval, &b.owner).await {
                store::skip_record(&e, "bookings");
                skipped += 1;
            }
        }
        for user in snapshot.users {
            if let Err(e) = self.users.insert(user) {
                store::skip_record(&e, "users");
                skipped += 1;
            }
        }
        for kind in ResourceKind::ALL {
            self.update_resource_gauge(kind);
        }
        skipped
    }

    pub fn ledger(&self, kind: ResourceKind) -> &ResourceLedger {
        match kind {
            ResourceKind::Room => &self.rooms,
            ResourceKind::Laptop => &self.laptops,
            ResourceKind::Book => &self.books,
        }
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn owner_limits(&self) -> OwnerLimits {
        self.owner_limits
    }

    fn owner_lock(&self, owner: &str) -> Arc<Mutex<()>> {
        self.owner_locks
            .entry(owner.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the owner's entry once `lock` is the last handle outside the map.
    fn release_owner_lock(&self, owner: &str, lock: Arc<Mutex<()>>) {
        self.owner_locks.remove_if(owner, |_, held| Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2);
    }

    fn update_resource_gauge(&self, kind: ResourceKind) {
        metrics::gauge!(observability::RESOURCES, "kind" => kind.as_str()).set(self.ledger(kind).len() as f64);
    }

    /// Full copy of the committed state, resources in registration order.
    pub async fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for kind in ResourceKind::ALL {
            let ledger = self.ledger(kind);
            snapshot.resources.extend(ledger.resources().await);
            snapshot.bookings.extend(ledger.all_bookings().await);
        }
        snapshot.users = self.users.users();
        snapshot
    }

    /// Rewrite the data directory from the current state. In-memory systems
    /// have nothing to write and succeed immediately.
    pub async fn try_save(&self) -> Result<(), EngineError> {
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let snapshot = self.snapshot().await;
        let started = Instant::now();
        let (resources, bookings, users) = (snapshot.resources.len(), snapshot.bookings.len(), snapshot.users.len());
        tokio::task::spawn_blocking(move || store.save(&snapshot))
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))??;
        metrics::histogram!(observability::SAVE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        info!(resources, bookings, users, "snapshot saved");
        Ok(())
    }

    pub async fn save(&self) -> Outcome {
        match self.try_save().await {
            Ok(()) if self.store.is_some() => Outcome::ok("Data saved successfully."),
            Ok(()) => Outcome::ok("No data directory configured; nothing to save."),
            Err(e) => {
                tracing::error!("save failed: {e}");
                Outcome::failed(&e)
            }
        }
    }
}

fn record_duration(op: &'static str, started: Instant) {
    metrics::histogram!(observability::OPERATION_DURATION_SECONDS, "op" => op).record(started.elapsed().as_secs_f64());
}

fn record_booking(kind: ResourceKind, result: &Result<Booking, EngineError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    metrics::counter!(observability::BOOKINGS_TOTAL, "kind" => kind.as_str(), "status" => status).increment(1);
}
