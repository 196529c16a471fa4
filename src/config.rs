use std::path::PathBuf;

use crate::limits::CAMPUS_BOOK_LIMIT;
use crate::model::ResourceKind;

/// Maximum number of an owner's bookings of one kind that may overlap a
/// requested interval. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerLimits {
    pub room: Option<u32>,
    pub laptop: Option<u32>,
    pub book: Option<u32>,
}

impl OwnerLimits {
    pub const OFF: OwnerLimits = OwnerLimits {
        room: None,
        laptop: None,
        book: None,
    };

    /// One room, one laptop and three books at a time.
    pub const CAMPUS: OwnerLimits = OwnerLimits {
        room: Some(1),
        laptop: Some(1),
        book: Some(CAMPUS_BOOK_LIMIT),
    };

    pub fn for_kind(&self, kind: ResourceKind) -> Option<u32> {
        match kind {
            ResourceKind::Room => self.room,
            ResourceKind::Laptop => self.laptop,
            ResourceKind::Book => self.book,
        }
    }

    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }

    /// Parse `off`, `campus`, or a list like `room=1,book=3`. Kinds left out
    /// of the list are unlimited.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "off" => return Some(Self::OFF),
            "campus" => return Some(Self::CAMPUS),
            _ => {}
        }
        let mut limits = Self::OFF;
        for part in s.split(',') {
            let (kind, n) = part.split_once('=')?;
            let n: u32 = n.trim().parse().ok()?;
            match ResourceKind::parse(kind.trim())? {
                ResourceKind::Room => limits.room = Some(n),
                ResourceKind::Laptop => limits.laptop = Some(n),
                ResourceKind::Book => limits.book = Some(n),
            }
        }
        Some(limits)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub owner_limits: OwnerLimits,
    pub save_on_exit: bool,
    pub seed_users: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            owner_limits: OwnerLimits::OFF,
            save_on_exit: true,
            seed_users: true,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Values that fail to parse
    /// keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let owner_limits = match lookup("CAMPUS_OWNER_LIMITS") {
            Some(raw) => OwnerLimits::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("ignoring unparseable CAMPUS_OWNER_LIMITS={raw:?}");
                defaults.owner_limits
            }),
            None => defaults.owner_limits,
        };
        Self {
            data_dir: lookup("CAMPUS_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            metrics_port: lookup("CAMPUS_METRICS_PORT").and_then(|s| s.parse().ok()),
            owner_limits,
            save_on_exit: lookup("CAMPUS_SAVE_ON_EXIT")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.save_on_exit),
            seed_users: lookup("CAMPUS_SEED_USERS")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.seed_users),
        }
    }
}
