use serde::Serialize;

use crate::model::{Interval, ResourceKind, Secs};

#[derive(Debug)]
pub enum EngineError {
    DuplicateResource(ResourceKind, String),
    UnknownResource(ResourceKind, String),
    InvalidInterval { start: Secs, end: Secs },
    Conflict {
        kind: ResourceKind,
        resource_id: String,
        existing: Interval,
    },
    NoResourceAvailable(ResourceKind),
    InvalidCredentials,
    MalformedRecord {
        store: &'static str,
        line: usize,
        reason: String,
    },
    UnknownBooking {
        kind: ResourceKind,
        resource_id: String,
        interval: Interval,
    },
    OwnerLimitReached { kind: ResourceKind, limit: u32 },
    InvalidField { field: &'static str, reason: &'static str },
    LimitExceeded(&'static str),
    Storage(String),
}

/// Machine-readable projection of [`EngineError`], carried in facade results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateResource,
    UnknownResource,
    InvalidInterval,
    Conflict,
    NoResourceAvailable,
    InvalidCredentials,
    MalformedRecord,
    UnknownBooking,
    OwnerLimitReached,
    InvalidField,
    LimitExceeded,
    Storage,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::DuplicateResource(..) => ErrorKind::DuplicateResource,
            EngineError::UnknownResource(..) => ErrorKind::UnknownResource,
            EngineError::InvalidInterval { .. } => ErrorKind::InvalidInterval,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::NoResourceAvailable(_) => ErrorKind::NoResourceAvailable,
            EngineError::InvalidCredentials => ErrorKind::InvalidCredentials,
            EngineError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            EngineError::UnknownBooking { .. } => ErrorKind::UnknownBooking,
            EngineError::OwnerLimitReached { .. } => ErrorKind::OwnerLimitReached,
            EngineError::InvalidField { .. } => ErrorKind::InvalidField,
            EngineError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateResource => "duplicate_resource",
            ErrorKind::UnknownResource => "unknown_resource",
            ErrorKind::InvalidInterval => "invalid_interval",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NoResourceAvailable => "no_resource_available",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::MalformedRecord => "malformed_record",
            ErrorKind::UnknownBooking => "unknown_booking",
            ErrorKind::OwnerLimitReached => "owner_limit_reached",
            ErrorKind::InvalidField => "invalid_field",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::DuplicateResource(kind, id) => {
                write!(f, "{} {id} already exists", kind.label())
            }
            EngineError::UnknownResource(kind, id) => write!(f, "no {kind} with id {id}"),
            EngineError::InvalidInterval { start, end } => {
                write!(f, "invalid interval [{start}, {end}): start must be before end and both must be non-negative")
            }
            EngineError::Conflict {
                kind,
                resource_id,
                existing,
            } => write!(
                f,
                "conflict: {} {resource_id} is already booked for {existing}",
                kind.label()
            ),
            EngineError::NoResourceAvailable(kind) => {
                write!(f, "no {kind}s available for the selected time")
            }
            EngineError::InvalidCredentials => write!(f, "incorrect username or password"),
            EngineError::MalformedRecord { store, line, reason } => {
                write!(f, "malformed {store} record at line {line}: {reason}")
            }
            EngineError::UnknownBooking {
                kind,
                resource_id,
                interval,
            } => write!(f, "no booking of {kind} {resource_id} for {interval}"),
            EngineError::OwnerLimitReached { kind, limit } => write!(
                f,
                "limit reached: at most {limit} overlapping {kind} booking(s) per user"
            ),
            EngineError::InvalidField { field, reason } => write!(f, "invalid {field}: {reason}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}
