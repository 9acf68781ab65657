//! Bounds how many record groups have Intercom lookups in flight

use super::config::ConcurrencyConfig;
use log::debug;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Upper bound on the configured width (Tokio's Semaphore max is 2^61-1)
const MAX_WIDTH: usize = 1_000_000;

/// One permit per in-flight group
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    width: usize,
    group_size: usize,
}

impl ConcurrencyLimiter {
    pub fn new(config: &ConcurrencyConfig) -> Self {
        let width = config.max_in_flight_groups.clamp(1, MAX_WIDTH);
        Self {
            semaphore: Arc::new(Semaphore::new(width)),
            width,
            group_size: config.group_size.max(1),
        }
    }

    /// Wait for a free slot; it frees again when the permit drops.
    /// Returns `None` once the limiter is closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        if self.semaphore.available_permits() == 0 {
            debug!("Concurrency limiter: waiting for a slot ({} groups in flight)", self.width);
        }

        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        debug!(
            "Concurrency limiter: acquired slot ({}/{} in flight)",
            self.width - self.semaphore.available_permits(),
            self.width
        );
        Some(permit)
    }

    /// Wake every pending `acquire` with `None`; held permits stay valid
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Configured width, at least 1
    pub fn max_in_flight_groups(&self) -> usize {
        self.width
    }

    /// Records per group, at least 1
    pub fn group_size(&self) -> usize {
        self.group_size
    }
}
