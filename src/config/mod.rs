//! Configuration for the Snowflake generator

mod builder;

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use thiserror::Error;

pub use builder::SnowflakeConfigBuilder;
use builder::{DEFAULT_NODE_BITS, DEFAULT_SPIN_ENABLED, DEFAULT_SPIN_LOOPS, DEFAULT_SPIN_YIELD_EVERY};

use crate::SnowflakeGenerator;

/// Default epoch, 2014-11-01T00:00:00Z, in milliseconds since the Unix epoch
pub const DEFAULT_EPOCH_MS: u64 = 1_414_800_000_000;

/// Default epoch as a calendar instant
pub static DEFAULT_EPOCH: Lazy<DateTime<Utc>> = Lazy::new(|| {
    Utc.with_ymd_and_hms(2014, 11, 1, 0, 0, 0)
        .single()
        .expect("default epoch is a valid UTC instant")
});

/// Errors related to `SnowflakeConfig` builder validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnowflakeConfigError {
    /// Provided node bits are out of the supported range [6, 16]
    #[error("Node bits {bits} must be between 6 and 16")]
    InvalidNodeBits { bits: u8 },
    /// Epoch lies before 1970-01-01
    #[error("Epoch {millis}ms lies before the Unix epoch")]
    EpochBeforeUnix { millis: i64 },
}

/// Configuration for the Snowflake generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnowflakeConfig {
    node_bits: u8,
    epoch: u64,
    timestamp_shift: u8,
    node_shift: u8,
    timestamp_mask: u64,
    node_mask: u16,
    sequence_mask: u16,
    spin_enabled: bool,
    spin_loops: u32,
    spin_yield_every: u32,
}

impl SnowflakeConfig {
    /// Calculate mask for given number of bits
    #[inline]
    pub(crate) const fn calculate_mask(bits: u8) -> u16 {
        ((1u32 << bits) - 1) as u16
    }

    fn new(node_bits: u8, epoch: u64) -> Self {
        let sequence_bits = SnowflakeGenerator::DISCRIMINATOR_BITS - node_bits;
        Self {
            node_bits,
            epoch,
            timestamp_shift: SnowflakeGenerator::DISCRIMINATOR_BITS,
            node_shift: sequence_bits,
            timestamp_mask: (1u64 << SnowflakeGenerator::TIMESTAMP_BITS) - 1,
            node_mask: Self::calculate_mask(node_bits),
            sequence_mask: Self::calculate_mask(sequence_bits),
            spin_enabled: DEFAULT_SPIN_ENABLED,
            spin_loops: DEFAULT_SPIN_LOOPS,
            spin_yield_every: DEFAULT_SPIN_YIELD_EVERY,
        }
    }

    pub(crate) fn from_builder(b: SnowflakeConfigBuilder) -> Self {
        let mut cfg = Self::new(b.node_bits, b.epoch);
        cfg.spin_enabled = b.spin_enabled;
        cfg.spin_loops = b.spin_loops;
        cfg.spin_yield_every = b.spin_yield_every;
        cfg
    }

    /// Create a new configuration builder
    pub fn builder() -> SnowflakeConfigBuilder {
        SnowflakeConfigBuilder::new()
    }

    /// Epoch in milliseconds since the Unix epoch
    #[inline(always)]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn epoch_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.epoch as i64)
    }

    #[inline(always)]
    pub const fn node_bits(&self) -> u8 {
        self.node_bits
    }

    #[inline(always)]
    pub const fn sequence_bits(&self) -> u8 {
        SnowflakeGenerator::DISCRIMINATOR_BITS - self.node_bits
    }

    #[inline(always)]
    pub const fn max_node_id(&self) -> u16 {
        self.node_mask
    }

    #[inline(always)]
    pub const fn max_sequence_id(&self) -> u16 {
        self.sequence_mask
    }

    #[inline(always)]
    pub const fn spin_enabled(&self) -> bool {
        self.spin_enabled
    }

    #[inline(always)]
    pub const fn spin_loops(&self) -> u32 {
        self.spin_loops
    }

    #[inline(always)]
    pub const fn spin_yield_every(&self) -> u32 {
        self.spin_yield_every
    }

    #[inline(always)]
    pub(crate) const fn timestamp_shift(&self) -> u8 {
        self.timestamp_shift
    }

    #[inline(always)]
    pub(crate) const fn node_shift(&self) -> u8 {
        self.node_shift
    }

    #[inline(always)]
    pub(crate) const fn timestamp_mask(&self) -> u64 {
        self.timestamp_mask
    }

    #[inline(always)]
    pub(crate) const fn node_mask(&self) -> u16 {
        self.node_mask
    }

    #[inline(always)]
    pub(crate) const fn sequence_mask(&self) -> u16 {
        self.sequence_mask
    }
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_BITS, DEFAULT_EPOCH_MS)
    }
}
