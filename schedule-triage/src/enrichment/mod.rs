//! Batch enrichment pipeline
//!
//! Walks the record store in fixed-size groups, looks every record of a group
//! up in Intercom concurrently and writes the result back into the store.
//! A semaphore bounds how many groups are in flight. Cancellation is
//! cooperative and checked before each group is dispatched, so lookups that
//! already started always run to completion.
//!
//! Single-record re-fetches use the same per-record algorithm but bypass both
//! the limiter and the cancellation flag.

pub mod progress;

pub use progress::{BatchProgress, ProgressReporter, STATUS_COMPLETED, STATUS_STARTING, STATUS_STOPPED};

use futures::future::join_all;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::api::{ConcurrencyConfig, ConcurrencyLimiter, ContactLookup, LookupError};
use crate::records::{RecordId, RecordStore};

/// What happened to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Matched { contact_id: String, conversations: u64 },
    NoMatch,
    Failed(String),
    /// Not looked up: cancelled before it started, no email, or unknown id
    Skipped,
}

impl RecordOutcome {
    fn counts_as_completed(&self) -> bool {
        !matches!(self, RecordOutcome::Skipped)
    }
}

/// Look one record up and write the result into the store.
///
/// Failures are confined to the record: it is marked `Error`, whatever was
/// already written stays, and the error is logged rather than returned.
pub async fn enrich_record(
    lookup: &dyn ContactLookup,
    store: &RecordStore,
    id: RecordId,
    cancel: Option<&AtomicBool>,
) -> RecordOutcome {
    if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
        return RecordOutcome::Skipped;
    }

    let email = match store.email(id) {
        Some(email) if !email.is_empty() => email,
        _ => return RecordOutcome::Skipped,
    };

    match lookup_and_store(lookup, store, id, &email).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if err.is_rate_limited() {
                warn!(
                    "Rate limit exceeded for {} after retries. Consider reducing concurrency.",
                    email
                );
            }
            error!("Intercom error for email {}: {}", email, err);
            store.update_enrichment(id, |e| e.failed());
            RecordOutcome::Failed(err.to_string())
        }
    }
}

async fn lookup_and_store(
    lookup: &dyn ContactLookup,
    store: &RecordStore,
    id: RecordId,
    email: &str,
) -> Result<RecordOutcome, LookupError> {
    let Some(contact) = lookup.find_contact_by_email(email).await? else {
        store.update_enrichment(id, |e| e.unmatched());
        return Ok(RecordOutcome::NoMatch);
    };

    store.update_enrichment(id, |e| {
        e.contacted = crate::records::ContactStatus::Yes;
        e.remote_contact_id = contact.id.clone();
    });

    let conversations = lookup
        .count_conversations_for_contact(&contact.id)
        .await?
        .unwrap_or(0);
    store.update_enrichment(id, |e| e.matched(contact.id.clone(), Some(conversations)));

    Ok(RecordOutcome::Matched {
        contact_id: contact.id,
        conversations,
    })
}

/// Totals for a finished batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub failed: usize,
    pub groups_dispatched: usize,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct RunCounters {
    completed: AtomicUsize,
    matched: AtomicUsize,
    unmatched: AtomicUsize,
    failed: AtomicUsize,
}

impl RunCounters {
    fn record(&self, outcome: &RecordOutcome) {
        let counter = match outcome {
            RecordOutcome::Matched { .. } => &self.matched,
            RecordOutcome::NoMatch => &self.unmatched,
            RecordOutcome::Failed(_) => &self.failed,
            RecordOutcome::Skipped => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared run state: at most one active run, plus its cancellation flag
#[derive(Debug, Default)]
struct RunState {
    active: AtomicBool,
    cancel: AtomicBool,
    /// Limiter of the active run, closed on stop so a pending dispatch wakes up
    limiter: Mutex<Option<ConcurrencyLimiter>>,
    progress: ProgressReporter,
}

impl RunState {
    fn set_limiter(&self, limiter: Option<ConcurrencyLimiter>) {
        *self.limiter.lock().unwrap_or_else(|e| e.into_inner()) = limiter;
    }

    fn close_limiter(&self) {
        if let Some(limiter) = self.limiter.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            limiter.close();
        }
    }
}

/// Clears the active flag when the run task ends, however it ends
struct ActiveRun(Arc<RunState>);

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.active.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates batch runs over a record store
#[derive(Clone)]
pub struct EnrichmentPipeline {
    lookup: Arc<dyn ContactLookup>,
    state: Arc<RunState>,
}

impl EnrichmentPipeline {
    pub fn new(lookup: Arc<dyn ContactLookup>) -> Self {
        Self {
            lookup,
            state: Arc::new(RunState::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    pub fn cancel_requested(&self) -> bool {
        self.state.cancel.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> BatchProgress {
        self.state.progress.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.state.progress.subscribe()
    }

    /// Start a batch run over every record in `store`.
    ///
    /// Returns `None` without doing anything when the store is empty or a run
    /// is already active.
    pub fn start(
        &self,
        store: Arc<RecordStore>,
        concurrency: ConcurrencyConfig,
    ) -> Option<JoinHandle<BatchSummary>> {
        if store.is_empty() {
            debug!("Batch enrichment not started: store is empty");
            return None;
        }

        if self
            .state
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Batch enrichment not started: a run is already active");
            return None;
        }

        self.state.cancel.store(false, Ordering::SeqCst);
        self.state.progress.begin(store.len());

        let limiter = ConcurrencyLimiter::new(&concurrency);
        self.state.set_limiter(Some(limiter.clone()));

        let guard = ActiveRun(self.state.clone());
        let lookup = self.lookup.clone();
        let state = self.state.clone();

        Some(tokio::spawn(async move {
            let summary = run_batch(lookup, store, state.clone(), limiter).await;
            state.progress.finish(summary.cancelled);
            state.set_limiter(None);
            drop(guard);
            summary
        }))
    }

    /// Request cooperative cancellation of the active run.
    ///
    /// Groups already dispatched finish; no further group is dispatched.
    pub fn stop(&self) {
        if !self.is_running() {
            return;
        }
        info!("Stop requested for batch enrichment");
        self.state.cancel.store(true, Ordering::SeqCst);
        self.state.close_limiter();
        self.state.progress.stopping();
    }

    /// Re-fetch one record, regardless of any active run or stop request
    pub async fn refetch_one(&self, store: &RecordStore, id: RecordId) -> RecordOutcome {
        let outcome = enrich_record(self.lookup.as_ref(), store, id, None).await;
        if outcome.counts_as_completed() {
            store.invalidate();
        }
        outcome
    }
}

async fn run_batch(
    lookup: Arc<dyn ContactLookup>,
    store: Arc<RecordStore>,
    state: Arc<RunState>,
    limiter: ConcurrencyLimiter,
) -> BatchSummary {
    let total = store.len();
    let ids: Vec<RecordId> = (0..total).collect();
    let counters = Arc::new(RunCounters::default());
    let mut groups = JoinSet::new();
    let mut groups_dispatched = 0;

    info!(
        "Starting batch enrichment of {} record(s) (group size {}, {} group(s) in flight)",
        total,
        limiter.group_size(),
        limiter.max_in_flight_groups()
    );

    for group in ids.chunks(limiter.group_size()) {
        if state.cancel.load(Ordering::SeqCst) {
            break;
        }

        // None once a stop closed the limiter
        let Some(permit) = limiter.acquire().await else {
            break;
        };

        // A stop may have arrived while waiting for a slot
        if state.cancel.load(Ordering::SeqCst) {
            break;
        }

        groups_dispatched += 1;
        debug!("Dispatching group {} ({} record(s))", groups_dispatched, group.len());

        let group = group.to_vec();
        let lookup = lookup.clone();
        let store = store.clone();
        let state = state.clone();
        let counters = counters.clone();

        groups.spawn(async move {
            join_all(group.into_iter().map(|id| {
                let lookup = lookup.clone();
                let store = store.clone();
                let state = state.clone();
                let counters = counters.clone();
                async move {
                    let outcome = enrich_record(lookup.as_ref(), &store, id, Some(&state.cancel)).await;
                    if outcome.counts_as_completed() {
                        counters.record(&outcome);
                        state.progress.record_done(
                            matches!(outcome, RecordOutcome::Failed(_)),
                            state.cancel.load(Ordering::SeqCst),
                        );
                    }
                }
            }))
            .await;

            let revision = store.invalidate();
            state.progress.group_done(revision);
            // The slot frees only after the group has fully settled
            drop(permit);
        });

        while let Some(result) = groups.try_join_next() {
            log_group_result(result);
        }
    }

    while let Some(result) = groups.join_next().await {
        log_group_result(result);
    }

    let cancelled = state.cancel.load(Ordering::SeqCst);
    let summary = BatchSummary {
        total,
        completed: counters.completed.load(Ordering::Relaxed),
        matched: counters.matched.load(Ordering::Relaxed),
        unmatched: counters.unmatched.load(Ordering::Relaxed),
        failed: counters.failed.load(Ordering::Relaxed),
        groups_dispatched,
        cancelled,
    };

    if cancelled {
        info!(
            "Batch enrichment stopped after {} of {} record(s)",
            summary.completed, total
        );
    } else {
        info!(
            "Batch enrichment finished: {} matched, {} unmatched, {} failed",
            summary.matched, summary.unmatched, summary.failed
        );
    }

    summary
}

fn log_group_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Enrichment group task failed: {}", e);
    }
}
