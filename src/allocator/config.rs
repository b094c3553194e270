//! Allocator configuration and builder

use std::time::Duration;

use thiserror::Error;

/// Default configuration values
pub(super) const DEFAULT_MAX_RETRIES: u32 = 3;
pub(super) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors related to `AllocatorConfig` builder validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocatorConfigError {
    #[error("Retry budget must allow at least one attempt")]
    ZeroRetries,
}

/// Configuration for the instance id allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    max_retries: u32,
    request_timeout: Option<Duration>,
    retry_backoff: Option<Duration>,
    create_missing_path: bool,
}

impl AllocatorConfig {
    /// Create a new configuration builder
    pub fn builder() -> AllocatorConfigBuilder {
        AllocatorConfigBuilder::new()
    }

    /// Total scan-and-create attempts before giving up
    #[inline(always)]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[inline(always)]
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Base delay between attempts; `None` retries immediately
    #[inline(always)]
    pub const fn retry_backoff(&self) -> Option<Duration> {
        self.retry_backoff
    }

    #[inline(always)]
    pub const fn create_missing_path(&self) -> bool {
        self.create_missing_path
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        AllocatorConfigBuilder::new().build()
    }
}

/// Builder for AllocatorConfig
#[derive(Debug)]
pub struct AllocatorConfigBuilder {
    max_retries: u32,
    request_timeout: Option<Duration>,
    retry_backoff: Option<Duration>,
    create_missing_path: bool,
}

impl AllocatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            retry_backoff: None,
            create_missing_path: false,
        }
    }

    /// Set the retry budget (at least 1)
    pub fn max_retries(mut self, retries: u32) -> Result<Self, AllocatorConfigError> {
        if retries == 0 {
            return Err(AllocatorConfigError::ZeroRetries);
        }
        self.max_retries = retries;
        Ok(self)
    }

    /// Deadline for each store round-trip
    pub const fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sleep between attempts, doubling per attempt with jitter
    pub const fn retry_backoff(mut self, base: Option<Duration>) -> Self {
        self.retry_backoff = base;
        self
    }

    /// Create the registration directory when it does not exist yet
    pub const fn create_missing_path(mut self, create: bool) -> Self {
        self.create_missing_path = create;
        self
    }

    pub fn build(self) -> AllocatorConfig {
        AllocatorConfig {
            max_retries: self.max_retries,
            request_timeout: self.request_timeout,
            retry_backoff: self.retry_backoff,
            create_missing_path: self.create_missing_path,
        }
    }
}

impl Default for AllocatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
