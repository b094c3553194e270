//! Delay between allocation attempts

use std::time::Duration;

use rand::Rng;

/// Largest multiplier applied to the base delay
pub const MAX_BACKOFF_FACTOR: u32 = 64;

/// Un-jittered delay before retry number `attempt` (0-based)
#[inline]
pub fn backoff_ceiling(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32
        .checked_shl(attempt)
        .unwrap_or(MAX_BACKOFF_FACTOR)
        .min(MAX_BACKOFF_FACTOR);
    base.saturating_mul(factor)
}

/// Ceiling scaled by a random factor in [0.5, 1.5] so contending replicas
/// spread their retries
pub fn jittered_delay(base: Duration, attempt: u32) -> Duration {
    let scale: f64 = rand::rng().random_range(0.5..=1.5);
    backoff_ceiling(base, attempt).mul_f64(scale)
}
