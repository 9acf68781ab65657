//! Resilience configuration with builder pattern
//!
//! Groups the retry policy and the batch concurrency bounds. The defaults
//! fully serialize lookups.

use super::retry::RetryConfig;
use std::time::Duration;

/// Resilience configuration for Intercom lookups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub concurrency: ConcurrencyConfig,
}

/// Batch concurrency configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConcurrencyConfig {
    /// Records looked up together as one group
    pub group_size: usize,
    /// Groups allowed in flight at the same time
    pub max_in_flight_groups: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            group_size: 1,
            max_in_flight_groups: 1,
        }
    }
}

impl ResilienceConfig {
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::default()
    }
}

/// Builder for ResilienceConfig, starting from the defaults
#[derive(Debug, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    /// Total attempts per request, including the first
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.config.retry.backoff_unit = unit;
        self
    }

    pub fn group_size(mut self, size: usize) -> Self {
        self.config.concurrency.group_size = size;
        self
    }

    pub fn max_in_flight_groups(mut self, max: usize) -> Self {
        self.config.concurrency.max_in_flight_groups = max;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}
