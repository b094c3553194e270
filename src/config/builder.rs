//! SnowflakeConfig builder for constructing configuration

use chrono::{DateTime, Utc};

use super::{SnowflakeConfig, SnowflakeConfigError};

/// Default configuration values
pub(super) const DEFAULT_NODE_BITS: u8 = 10;
pub(super) const DEFAULT_SPIN_ENABLED: bool = true;
pub(super) const DEFAULT_SPIN_LOOPS: u32 = 64;
pub(super) const DEFAULT_SPIN_YIELD_EVERY: u32 = 16;

/// Builder for SnowflakeConfig
#[derive(Debug)]
pub struct SnowflakeConfigBuilder {
    pub(super) node_bits: u8,
    pub(super) epoch: u64,
    pub(super) spin_enabled: bool,
    pub(super) spin_loops: u32,
    pub(super) spin_yield_every: u32,
}

impl SnowflakeConfigBuilder {
    /// Create a new SnowflakeConfigBuilder with default values
    pub fn new() -> Self {
        Self {
            node_bits: DEFAULT_NODE_BITS,
            epoch: super::DEFAULT_EPOCH_MS,
            spin_enabled: DEFAULT_SPIN_ENABLED,
            spin_loops: DEFAULT_SPIN_LOOPS,
            spin_yield_every: DEFAULT_SPIN_YIELD_EVERY,
        }
    }

    /// Set the number of bits for the instance id (6-16).
    /// Sequence bits will be automatically set to (22 - node_bits)
    pub fn node_bits(mut self, bits: u8) -> Result<Self, SnowflakeConfigError> {
        if !(6..=16).contains(&bits) {
            return Err(SnowflakeConfigError::InvalidNodeBits { bits });
        }
        self.node_bits = bits;
        Ok(self)
    }

    /// Set the epoch in milliseconds since the Unix epoch.
    /// Must lie in the past, or generator construction fails, and must
    /// never change once ids generated against it are persisted.
    pub const fn epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Set the epoch from a calendar instant
    pub fn epoch_at(mut self, at: DateTime<Utc>) -> Result<Self, SnowflakeConfigError> {
        let millis = at.timestamp_millis();
        if millis < 0 {
            return Err(SnowflakeConfigError::EpochBeforeUnix { millis });
        }
        self.epoch = millis as u64;
        Ok(self)
    }

    /// Enable or disable micro spin before sleep when a millisecond is full
    pub const fn enable_spin(mut self, enable: bool) -> Self {
        self.spin_enabled = enable;
        self
    }

    /// Set number of spin loops attempted before falling back to sleep
    pub const fn spin_loops(mut self, loops: u32) -> Self {
        self.spin_loops = loops;
        self
    }

    /// Set spin yield cadence. Yield every N spin iterations; 0 disables yielding
    pub const fn spin_yield_every(mut self, n: u32) -> Self {
        self.spin_yield_every = n;
        self
    }

    /// Build the final SnowflakeConfig
    pub fn build(self) -> SnowflakeConfig {
        SnowflakeConfig::from_builder(self)
    }
}

impl Default for SnowflakeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
