use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::ledger::ResourceLedger;
use crate::model::{Session, User, UserBooking};
use crate::validate;

/// Accounts provisioned on a fresh install.
pub const DEFAULT_USERS: [(&str, &str, bool); 2] = [("admin", "admin123", true), ("user1", "pass1", false)];

/// Username → account. Read-only at runtime apart from passwords.
#[derive(Default)]
pub struct UserDirectory {
    users: DashMap<String, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let dir = Self::new();
        dir.seed_defaults();
        dir
    }

    /// Install [`DEFAULT_USERS`], skipping names that already exist.
    pub fn seed_defaults(&self) {
        for (name, password, is_admin) in DEFAULT_USERS {
            if self.insert(User::new(name, password, is_admin)).is_ok() {
                info!(username = name, "default user provisioned");
            }
        }
    }

    pub fn insert(&self, user: User) -> Result<(), EngineError> {
        validate::username(&user.username)?;
        validate::password(&user.password)?;
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(EngineError::InvalidField {
                field: "username",
                reason: "already exists",
            }),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, username: &str) -> Option<User> {
        self.users.get(username).map(|u| u.value().clone())
    }

    /// Exact, case-sensitive credential check.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session, EngineError> {
        match self.users.get(username) {
            Some(user) if user.password == password => Ok(Session {
                username: user.username.clone(),
                is_admin: user.is_admin,
            }),
            _ => {
                warn!(username, "authentication failed");
                Err(EngineError::InvalidCredentials)
            }
        }
    }

    pub fn change_password(&self, username: &str, current: &str, new: &str) -> Result<(), EngineError> {
        validate::password(new)?;
        let Some(mut user) = self.users.get_mut(username) else {
            return Err(EngineError::InvalidCredentials);
        };
        if user.password != current {
            return Err(EngineError::InvalidCredentials);
        }
        user.password = new.to_string();
        info!(username, "password changed");
        Ok(())
    }

    /// All accounts sorted by username.
    pub fn users(&self) -> Vec<User> {
        let mut all: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        all
    }

    /// Every booking owned by `username`, derived from the ledgers on each
    /// call. Ledgers are scanned in the order given.
    pub async fn bookings_for_user(&self, username: &str, ledgers: [&ResourceLedger; 3]) -> Vec<UserBooking> {
        let mut out = Vec::new();
        for ledger in ledgers {
            out.extend(ledger.bookings_owned_by(username).await);
        }
        out
    }
}
