//! Errors surfaced by the Intercom lookup client

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// HTTP 429. `reset_at` comes from the `X-RateLimit-Reset` header when present.
    #[error("Intercom rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("Intercom API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Intercom request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode Intercom response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The envelope counted matches but carried no entries
    #[error("Intercom reported {total_count} match(es) but returned no data")]
    EmptyResult { total_count: u64 },

    #[error("Intercom token is not configured")]
    MissingToken,
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" (resets at {})", at.to_rfc3339()),
        None => String::new(),
    }
}

impl LookupError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LookupError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rate_limited_display() {
        let plain = LookupError::RateLimited { reset_at: None };
        assert_eq!(plain.to_string(), "Intercom rate limit exceeded");
        assert!(plain.is_rate_limited());

        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let with_reset = LookupError::RateLimited { reset_at: Some(at) };
        assert!(with_reset.to_string().contains("resets at 2024-01-01T12:00:00"));
    }

    #[test]
    fn test_status_is_not_rate_limited() {
        let err = LookupError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "Intercom API error 500: boom");
    }
}
