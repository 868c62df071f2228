use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as epoch milliseconds, the unit every
/// deadline and timestamp in the data model is expressed in.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_millis() as i64
}
