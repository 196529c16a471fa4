use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorKind};

/// Seconds since the start of the reference year. The only time type.
pub type Secs = i64;

pub const MINUTE: Secs = 60;
pub const HOUR: Secs = 3_600;
pub const DAY: Secs = 86_400;

/// Half-open interval `[start, end)`.
///
/// Field order matters: the derived `Ord` sorts by `start`, then `end`, which
/// is the key order of [`crate::interval_tree::IntervalTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: Secs,
    pub end: Secs,
}

impl Interval {
    pub fn new(start: Secs, end: Secs) -> Self {
        debug_assert!(start < end, "Interval start must be before end");
        Self { start, end }
    }

    /// Build an interval from untrusted bounds.
    pub fn try_new(start: Secs, end: Secs) -> Result<Self, EngineError> {
        let interval = Self { start, end };
        interval.validate()?;
        Ok(interval)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.start < 0 || self.end < 0 || self.start >= self.end {
            return Err(EngineError::InvalidInterval {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Secs {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The three resource categories the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Room,
    Laptop,
    Book,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Room, ResourceKind::Laptop, ResourceKind::Book];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Room => "room",
            ResourceKind::Laptop => "laptop",
            ResourceKind::Book => "book",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "room" => Some(ResourceKind::Room),
            "laptop" => Some(ResourceKind::Laptop),
            "book" => Some(ResourceKind::Book),
            _ => None,
        }
    }

    /// Capitalised label for user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Room => "Room",
            ResourceKind::Laptop => "Laptop",
            ResourceKind::Book => "Book",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific resource attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceAttrs {
    Room,
    Laptop,
    Book { title: String, author: String },
}

impl ResourceAttrs {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceAttrs::Room => ResourceKind::Room,
            ResourceAttrs::Laptop => ResourceKind::Laptop,
            ResourceAttrs::Book { .. } => ResourceKind::Book,
        }
    }
}

/// A committed reservation of one resource for one interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Booking {
    pub kind: ResourceKind,
    pub resource_id: String,
    pub interval: Interval,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            is_admin,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: String,
    #[serde(flatten)]
    pub attrs: ResourceAttrs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    pub id: String,
    pub title: String,
    pub author: String,
}

/// A booking as listed in a user's history. Book entries carry their title
/// and author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBooking {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub is_admin: bool,
}

/// Uniform result of a facade operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    /// Resource chosen by the engine (auto-assigned laptops).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            resource_id: None,
            error: None,
        }
    }

    pub fn with_resource(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn failed(err: &EngineError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            resource_id: None,
            error: Some(err.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_basics() {
        let i = Interval::new(100, 200);
        assert_eq!(i.duration(), 100);
    }

    #[test]
    fn interval_overlap() {
        let a = Interval::new(100, 200);
        let b = Interval::new(150, 250);
        let c = Interval::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn adjacent_hours_do_not_overlap() {
        let nine = Interval::new(9 * HOUR, 10 * HOUR);
        let ten = Interval::new(10 * HOUR, 11 * HOUR);
        assert!(!nine.overlaps(&ten));
    }

    #[test]
    fn try_new_rejects_bad_bounds() {
        assert!(matches!(
            Interval::try_new(36_000, 36_000),
            Err(EngineError::InvalidInterval { .. })
        ));
        assert!(matches!(
            Interval::try_new(500, 100),
            Err(EngineError::InvalidInterval { .. })
        ));
        assert!(matches!(
            Interval::try_new(-10, 100),
            Err(EngineError::InvalidInterval { .. })
        ));
        assert_eq!(Interval::try_new(0, 1).unwrap(), Interval::new(0, 1));
    }

    #[test]
    fn interval_order_is_start_then_end() {
        let mut v = vec![
            Interval::new(5, 9),
            Interval::new(1, 7),
            Interval::new(5, 6),
        ];
        v.sort();
        assert_eq!(v, vec![Interval::new(1, 7), Interval::new(5, 6), Interval::new(5, 9)]);
    }

    #[test]
    fn kind_parse_roundtrip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::parse("Room"), None);
    }

    #[test]
    fn attrs_report_kind() {
        assert_eq!(ResourceAttrs::Room.kind(), ResourceKind::Room);
        let book = ResourceAttrs::Book {
            title: "Intro".into(),
            author: "Cormen".into(),
        };
        assert_eq!(book.kind(), ResourceKind::Book);
    }

    #[test]
    fn outcome_serializes_without_empty_fields() {
        let json = serde_json::to_value(Outcome::ok("done")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "done"}));

        let err = EngineError::NoResourceAvailable(ResourceKind::Laptop);
        let json = serde_json::to_value(Outcome::failed(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "no_resource_available");
    }

    #[test]
    fn user_booking_flattens() {
        let ub = UserBooking {
            booking: Booking {
                kind: ResourceKind::Book,
                resource_id: "B0001".into(),
                interval: Interval::new(0, 10),
                owner: "alice".into(),
            },
            title: Some("Intro".into()),
            author: Some("Cormen".into()),
        };
        let json = serde_json::to_value(&ub).unwrap();
        assert_eq!(json["kind"], "book");
        assert_eq!(json["resource_id"], "B0001");
        assert_eq!(json["interval"]["start"], 0);
        assert_eq!(json["title"], "Intro");
    }
}
