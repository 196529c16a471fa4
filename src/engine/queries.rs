use std::time::Instant;

use crate::error::EngineError;
use crate::model::*;
use crate::observability;

use super::{LibrarySystem, record_duration};

impl LibrarySystem {
    pub fn login(&self, username: &str, password: &str) -> LoginOutcome {
        match self.users.authenticate(username, password) {
            Ok(session) => LoginOutcome {
                success: true,
                message: "Login successful.".to_string(),
                username: Some(session.username),
                is_admin: session.is_admin,
                error: None,
            },
            Err(e) => {
                metrics::counter!(observability::LOGIN_FAILURES_TOTAL).increment(1);
                LoginOutcome {
                    success: false,
                    message: e.to_string(),
                    username: None,
                    is_admin: false,
                    error: Some(e.kind()),
                }
            }
        }
    }

    // ── Listings ─────────────────────────────────────────────

    pub fn get_rooms(&self) -> Vec<String> {
        self.rooms.list_ids()
    }

    pub fn get_laptops(&self) -> Vec<String> {
        self.laptops.list_ids()
    }

    pub fn get_books(&self) -> Vec<String> {
        self.books.list_ids()
    }

    /// Books whose title or author contains `query`, ignoring case. `None`
    /// (or a blank query) lists every book.
    pub async fn search_books(&self, query: Option<&str>) -> Vec<BookInfo> {
        let needle = query.map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase);
        self.books
            .resources()
            .await
            .into_iter()
            .filter_map(|info| match info.attrs {
                ResourceAttrs::Book { title, author } => Some(BookInfo {
                    id: info.id,
                    title,
                    author,
                }),
                ResourceAttrs::Room | ResourceAttrs::Laptop => None,
            })
            .filter(|book| match &needle {
                Some(q) => book.title.to_lowercase().contains(q) || book.author.to_lowercase().contains(q),
                None => true,
            })
            .collect()
    }

    // ── Bookings ─────────────────────────────────────────────

    pub async fn get_bookings(&self, kind: ResourceKind, id: &str) -> Result<Vec<Booking>, EngineError> {
        self.ledger(kind).bookings_for(id).await
    }

    /// Bookings of room `id` in start order; empty for an unknown room.
    pub async fn get_room_bookings(&self, id: &str) -> Vec<Booking> {
        self.get_bookings(ResourceKind::Room, id).await.unwrap_or_default()
    }

    /// Every booking owned by `user`, rooms first, then laptops, then books.
    pub async fn get_user_bookings(&self, user: &str) -> Vec<UserBooking> {
        let started = Instant::now();
        let bookings = self
            .users
            .bookings_for_user(user, [&self.rooms, &self.laptops, &self.books])
            .await;
        record_duration("user_bookings", started);
        bookings
    }

    /// Free gaps of resource `id` inside `window`.
    pub async fn availability(&self, kind: ResourceKind, id: &str, window: Interval) -> Result<Vec<Interval>, EngineError> {
        self.ledger(kind).free_slots(id, &window).await
    }

    pub async fn room_availability(&self, id: &str, open_start: Secs, open_end: Secs) -> Result<Vec<Interval>, EngineError> {
        self.availability(
            ResourceKind::Room,
            id,
            Interval {
                start: open_start,
                end: open_end,
            },
        )
        .await
    }
}
