//! Resilience features for Intercom lookups
//!
//! Provides the rate-limit retry policy and the concurrency limiter used by
//! batch enrichment.

pub mod concurrency;
pub mod config;
pub mod retry;

pub use concurrency::ConcurrencyLimiter;
pub use config::{ConcurrencyConfig, ResilienceConfig, ResilienceConfigBuilder};
pub use retry::{RetryConfig, RetryPolicy};
