//! Wall-clock milliseconds relative to a configured epoch

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch; 0 if the system clock reads earlier
#[inline(always)]
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds elapsed since `epoch`, clamped at 0 for epochs in the future
#[inline(always)]
pub fn time_since_epoch(epoch: u64) -> u64 {
    unix_time_ms().saturating_sub(epoch)
}
