//! Wall-clock adapter.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the UNIX epoch, with sub-second precision.
///
/// A clock set before 1970 reads as `0.0`.
pub fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}
