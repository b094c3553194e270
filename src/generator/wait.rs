//! Waiting out a full millisecond
//!
//! Used only by the blocking `generate`; `next_id` reports exhaustion instead.

use std::thread;
use std::time::Duration;

use crate::config::SnowflakeConfig;

/// Maximum sleep between clock checks in milliseconds
pub const MAX_BACKOFF_MS: u64 = 100;

/// Spin until the clock passes `from_timestamp` or the spin budget runs out
#[inline]
pub fn spin_wait<F>(from_timestamp: u64, config: &SnowflakeConfig, now: F) -> Option<u64>
where
    F: Fn() -> u64,
{
    if !config.spin_enabled() || config.spin_loops() == 0 {
        return None;
    }

    let yield_every = config.spin_yield_every();
    for i in 0..config.spin_loops() {
        let ts = now();
        if ts > from_timestamp {
            return Some(ts);
        }
        std::hint::spin_loop();
        if yield_every != 0 && i % yield_every == yield_every - 1 {
            thread::yield_now();
        }
    }
    None
}

/// Sleep with doubling intervals until the clock passes `from_timestamp`
#[inline]
pub fn sleep_until_next_ms<F>(from_timestamp: u64, mut backoff_ms: u64, now: F) -> u64
where
    F: Fn() -> u64,
{
    loop {
        thread::sleep(Duration::from_millis(backoff_ms));
        let ts = now();
        if ts > from_timestamp {
            return ts;
        }
        backoff_ms = next_backoff(backoff_ms);
    }
}

#[inline(always)]
pub const fn next_backoff(current: u64) -> u64 {
    let next = current.saturating_mul(2);
    if next > MAX_BACKOFF_MS {
        MAX_BACKOFF_MS
    } else {
        next
    }
}
