//! Domain model for task history and generated recommendations.
//!
//! # Responsibility
//! - Define the read-only task shape consumed by analytics and ranking.
//! - Define the persisted recommendation record and its category set.
//!
//! # Invariants
//! - Every timestamp is Unix epoch milliseconds in UTC.
//! - Tasks and recommendations are identified by stable UUIDs.

pub mod recommendation;
pub mod task;

use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque user identifier resolved by the identity layer.
pub type UserId = String;

/// Milliseconds in one UTC calendar day.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Returns current wall-clock time as epoch milliseconds.
///
/// Falls back to `0` if the system clock is before the Unix epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Returns the UTC calendar day index (days since epoch) for a timestamp.
pub fn epoch_day(epoch_ms: i64) -> i64 {
    epoch_ms.div_euclid(DAY_MS)
}
