//! Subcommand handlers

pub mod enrich;
pub mod lookup;
pub mod preview;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::api::{ContactLookup, IntercomClient, RetryConfig};
use crate::config::{self, Config, TOKEN_ENV};

/// Intercom client from the resolved configuration
pub(crate) fn intercom_client(config: &Config, retry: RetryConfig) -> Result<Arc<dyn ContactLookup>> {
    let token = config.token().with_context(|| {
        let location = config::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "the config file".to_string());
        format!(
            "No Intercom token configured. Set {} or add [intercom] token to {}",
            TOKEN_ENV, location
        )
    })?;

    log::debug!("Using Intercom API at {}", config.base_url());
    Ok(Arc::new(IntercomClient::new(config.base_url(), token, retry)))
}
