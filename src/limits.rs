//! Hard input limits. Anything past these is rejected before it reaches a ledger.

use crate::model::Secs;

pub const MAX_RESOURCES_PER_KIND: usize = 10_000;
pub const MAX_BOOKINGS_PER_RESOURCE: usize = 100_000;

pub const MAX_ID_LEN: usize = 64;
pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_AUTHOR_LEN: usize = 128;
pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Length of the (non-leap) reference year that second `0` starts.
pub const REFERENCE_YEAR_SECS: Secs = 365 * crate::model::DAY;

/// Concurrent books a user may hold under the `campus` owner-limit preset.
pub const CAMPUS_BOOK_LIMIT: u32 = 3;
