//! Batch progress published to observers

use tokio::sync::watch;

pub const STATUS_STARTING: &str = "Starting batch fetch...";
pub const STATUS_COMPLETED: &str = "All Intercom fetches completed.";
pub const STATUS_STOPPED: &str = "Fetch operation stopped by user.";

/// Snapshot of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchProgress {
    /// Records finished so far (matched, unmatched or failed)
    pub completed: usize,
    pub total: usize,
    pub failed: usize,
    pub status: String,
    pub running: bool,
    /// Store revision after the last finished group
    pub revision: u64,
}

impl BatchProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Owns the sending half of the progress channel
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<BatchProgress>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BatchProgress::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> BatchProgress {
        self.tx.borrow().clone()
    }

    pub(crate) fn begin(&self, total: usize) {
        self.tx.send_modify(|p| {
            *p = BatchProgress {
                completed: 0,
                total,
                failed: 0,
                status: STATUS_STARTING.to_string(),
                running: true,
                revision: p.revision,
            };
        });
    }

    /// One record finished; the status line is left alone once a stop was requested
    pub(crate) fn record_done(&self, failed: bool, cancelled: bool) {
        self.tx.send_modify(|p| {
            p.completed += 1;
            if failed {
                p.failed += 1;
            }
            if !cancelled {
                p.status = format!("Fetched {} of {} rows", p.completed, p.total);
            }
        });
    }

    pub(crate) fn group_done(&self, revision: u64) {
        self.tx.send_modify(|p| p.revision = p.revision.max(revision));
    }

    pub(crate) fn stopping(&self) {
        self.tx.send_modify(|p| p.status = STATUS_STOPPED.to_string());
    }

    pub(crate) fn finish(&self, cancelled: bool) {
        self.tx.send_modify(|p| {
            p.running = false;
            p.status = if cancelled {
                STATUS_STOPPED.to_string()
            } else {
                STATUS_COMPLETED.to_string()
            };
        });
    }
}
