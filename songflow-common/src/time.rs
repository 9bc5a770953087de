//! Timestamp utilities
//!
//! Flow timestamps are stored as Unix seconds.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix seconds
pub fn unix_now() -> i64 {
    now().timestamp()
}
