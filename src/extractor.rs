use crate::config::SnowflakeConfig;

/// Splits a Snowflake id into its raw fields
#[derive(Debug, Copy, Clone)]
pub struct SnowflakeExtractor {
    config: SnowflakeConfig,
}

impl SnowflakeExtractor {
    pub(crate) fn new(config: SnowflakeConfig) -> Self {
        Self { config }
    }

    /// Milliseconds since the configured epoch
    #[inline(always)]
    pub fn timestamp(&self, id: i64) -> u64 {
        ((id as u64) >> self.config.timestamp_shift()) & self.config.timestamp_mask()
    }

    /// Instance id the generator was seeded with
    #[inline(always)]
    pub fn node(&self, id: i64) -> u16 {
        (((id as u64) >> self.config.node_shift()) & self.config.node_mask() as u64) as u16
    }

    #[inline(always)]
    pub fn sequence(&self, id: i64) -> u16 {
        ((id as u64) & self.config.sequence_mask() as u64) as u16
    }

    /// (timestamp, instance id, sequence)
    #[inline]
    pub fn decompose(&self, id: i64) -> (u64, u16, u16) {
        (self.timestamp(id), self.node(id), self.sequence(id))
    }
}
