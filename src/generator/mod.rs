//! Snowflake id generator
//!
//! Layout of a generated id, most significant bit first:
//!
//! ```text
//! | 0 | 41-bit ms since epoch | node bits (instance id) | sequence bits |
//! ```
//!
//! Node and sequence share a fixed 22-bit discriminator, so the timestamp is
//! always recoverable with a 22-bit right shift whatever the node width.
//!
//! - `state` - Packed (timestamp, sequence) for lock-free CAS
//! - `time` - Wall-clock time utilities
//! - `wait` - Spin and backoff used by the blocking path
//! - `generate` - `next_id` and `generate`

mod generate;
mod state;
mod time;
mod wait;

use std::sync::atomic::AtomicU64;

use chrono::{DateTime, Utc};

use crate::config::SnowflakeConfig;
use crate::error::SnowflakeError;
use crate::extractor::SnowflakeExtractor;

use state::State;
use time::{time_since_epoch, unix_time_ms};
use wait::{sleep_until_next_ms, spin_wait};

/// Snowflake generator seeded with an allocated instance id
#[derive(Debug)]
#[repr(align(64))]
pub struct SnowflakeGenerator {
    // === Hot path fields ===
    pub(crate) state: AtomicU64,
    node_prefix: u64,
    pub(crate) max_seq: u16,
    ts_shift: u8,
    ts_mask: u64,
    epoch: u64,

    // === Cold path fields ===
    pub instance_id: u16,
    pub config: SnowflakeConfig,
    pub extract: SnowflakeExtractor,
}

impl SnowflakeGenerator {
    pub const TIMESTAMP_BITS: u32 = 41;
    pub const DISCRIMINATOR_BITS: u8 = 22;

    /// Epoch-relative millisecond range that survives the 22-bit shift
    const MAX_FLOOR_DELTA: i64 = (1 << Self::TIMESTAMP_BITS) - 1;
    const MIN_FLOOR_DELTA: i64 = -(1 << Self::TIMESTAMP_BITS);

    /// Create with default configuration
    pub fn new(instance_id: i64) -> Result<Self, SnowflakeError> {
        Self::with_config(instance_id, SnowflakeConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(instance_id: i64, config: SnowflakeConfig) -> Result<Self, SnowflakeError> {
        let instance_id = Self::validate_instance_id(instance_id, &config)?;
        Self::validate_epoch(&config)?;
        Ok(Self::build(instance_id, config))
    }

    /// The epoch must lie strictly before the current millisecond, otherwise
    /// the clock would read 0 and never advance
    fn validate_epoch(config: &SnowflakeConfig) -> Result<(), SnowflakeError> {
        let now = unix_time_ms();
        if config.epoch() >= now {
            return Err(SnowflakeError::EpochInFuture {
                epoch: config.epoch(),
                now,
            });
        }
        Ok(())
    }

    fn validate_instance_id(instance_id: i64, config: &SnowflakeConfig) -> Result<u16, SnowflakeError> {
        let max = config.max_node_id();
        if instance_id < 0 || instance_id > i64::from(max) {
            return Err(SnowflakeError::InvalidInstanceId { instance_id, max });
        }
        Ok(instance_id as u16)
    }

    fn build(instance_id: u16, config: SnowflakeConfig) -> Self {
        Self {
            state: AtomicU64::new(State::EMPTY.raw()),
            node_prefix: (instance_id as u64) << config.node_shift(),
            max_seq: config.max_sequence_id(),
            ts_shift: config.timestamp_shift(),
            ts_mask: config.timestamp_mask(),
            epoch: config.epoch(),
            instance_id,
            config,
            extract: SnowflakeExtractor::new(config),
        }
    }

    /// Generation time of `id` in milliseconds since the Unix epoch
    #[inline]
    pub fn timestamp_of(&self, id: i64) -> i64 {
        (self.epoch as i64).saturating_add(id >> Self::DISCRIMINATOR_BITS)
    }

    /// Generation time of `id` as a calendar instant
    pub fn datetime_of(&self, id: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_of(id))
    }

    /// Smallest id any generator sharing this epoch could produce at
    /// `stamp` (ms since the Unix epoch). A range boundary, never issued.
    ///
    /// Stamps beyond the 41-bit timestamp range clamp to the nearest
    /// representable floor, so the result never decreases as `stamp` grows.
    #[inline]
    pub fn id_floor_for_timestamp(&self, stamp: i64) -> i64 {
        let delta = stamp
            .saturating_sub(self.epoch as i64)
            .clamp(Self::MIN_FLOOR_DELTA, Self::MAX_FLOOR_DELTA);
        delta << Self::DISCRIMINATOR_BITS
    }

    #[inline(always)]
    pub(crate) fn now_ms(&self) -> u64 {
        time_since_epoch(self.epoch)
    }

    pub(crate) fn wait_next_millis(&self, from_ts: u64, backoff_ms: u64) -> u64 {
        if let Some(new_ts) = spin_wait(from_ts, &self.config, || self.now_ms()) {
            return new_ts;
        }
        sleep_until_next_ms(from_ts, backoff_ms, || self.now_ms())
    }

    #[inline(always)]
    pub(crate) fn assemble_id(&self, timestamp: u64, sequence: u16) -> i64 {
        (((timestamp & self.ts_mask) << self.ts_shift) | self.node_prefix | (sequence as u64)) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EPOCH_MS;

    #[test]
    fn test_negative_instance_id_rejected() {
        assert_eq!(
            SnowflakeGenerator::new(-1).unwrap_err(),
            SnowflakeError::InvalidInstanceId {
                instance_id: -1,
                max: 1023
            }
        );
    }

    #[test]
    fn test_instance_id_upper_bound() {
        assert!(SnowflakeGenerator::new(1023).is_ok());
        assert!(matches!(
            SnowflakeGenerator::new(1024),
            Err(SnowflakeError::InvalidInstanceId { instance_id: 1024, .. })
        ));
    }

    #[test]
    fn test_future_epoch_rejected() {
        let epoch = unix_time_ms() + 3_600_000;
        let cfg = SnowflakeConfig::builder().epoch(epoch).build();
        match SnowflakeGenerator::with_config(1, cfg) {
            Err(SnowflakeError::EpochInFuture { epoch: e, now }) => {
                assert_eq!(e, epoch);
                assert!(now < epoch);
            }
            other => panic!("expected EpochInFuture, got {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_of_saturates() {
        let g = SnowflakeGenerator::new(0).unwrap();
        assert_eq!(g.timestamp_of(i64::MAX), DEFAULT_EPOCH_MS as i64 + (i64::MAX >> 22));
        assert!(g.timestamp_of(i64::MIN) < DEFAULT_EPOCH_MS as i64);
    }

    #[test]
    fn test_timestamp_of_uses_fixed_shift() {
        let g = SnowflakeGenerator::new(3).unwrap();
        let id = (1000i64 << 22) | (3 << 12) | 7;
        assert_eq!(g.timestamp_of(id), DEFAULT_EPOCH_MS as i64 + 1000);
    }

    #[test]
    fn test_floor_round_trips_timestamp() {
        let g = SnowflakeGenerator::new(0).unwrap();
        let stamp = DEFAULT_EPOCH_MS as i64 + 123_456;
        let floor = g.id_floor_for_timestamp(stamp);
        assert_eq!(floor & ((1 << 22) - 1), 0);
        assert_eq!(g.timestamp_of(floor), stamp);
    }

    #[test]
    fn test_floor_at_epoch_is_zero() {
        let g = SnowflakeGenerator::new(0).unwrap();
        assert_eq!(g.id_floor_for_timestamp(DEFAULT_EPOCH_MS as i64), 0);
    }

    #[test]
    fn test_datetime_of() {
        let g = SnowflakeGenerator::new(0).unwrap();
        let dt = g.datetime_of(0).unwrap();
        assert_eq!(dt, *crate::config::DEFAULT_EPOCH);
    }

    #[test]
    fn test_assemble_places_instance_id() {
        let g = SnowflakeGenerator::new(5).unwrap();
        let id = g.assemble_id(10, 2);
        assert_eq!(id, (10 << 22) | (5 << 12) | 2);
    }
}
