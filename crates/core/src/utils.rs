//! Utils for chordring-core
use chrono::Utc;

/// Get local utc timestamp (millisecond)
pub fn get_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}
