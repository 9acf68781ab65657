//! Intercom API module
//!
//! Thin client over the two Intercom search endpoints the enrichment needs,
//! with rate-limit aware retries and the concurrency limiter used by batches.

pub mod client;
pub mod error;
pub mod models;
pub mod resilience;

pub use client::{ContactLookup, DEFAULT_BASE_URL, IntercomClient};
pub use error::LookupError;
pub use models::{Contact, SearchRequest, SearchResponse};
pub use resilience::{
    ConcurrencyConfig, ConcurrencyLimiter, ResilienceConfig, ResilienceConfigBuilder, RetryConfig,
    RetryPolicy,
};
