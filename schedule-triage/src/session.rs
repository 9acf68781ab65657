//! Core facade driven by a presentation layer
//!
//! Owns the current record store, the enrichment pipeline and the active
//! filter. Every operation a front end needs goes through here.

use anyhow::Result;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{ConcurrencyConfig, ContactLookup};
use crate::enrichment::{BatchProgress, BatchSummary, EnrichmentPipeline, RecordOutcome};
use crate::export::{self, ExportError, ExportFormat, ExportedFile};
use crate::records::{self, RawRow, RecordId, RecordStore};
use crate::view::{self, CategoricalOptions, FilterSpec, Page, SortDirection, SortField};

pub struct Session {
    store: Arc<RecordStore>,
    pipeline: EnrichmentPipeline,
    filter: FilterSpec,
    reference_date: NaiveDate,
}

impl Session {
    /// `reference_date` is the "now" priorities are derived against
    pub fn new(lookup: Arc<dyn ContactLookup>, reference_date: NaiveDate) -> Self {
        Self {
            store: Arc::new(RecordStore::default()),
            pipeline: EnrichmentPipeline::new(lookup),
            filter: FilterSpec::default(),
            reference_date,
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn store(&self) -> Arc<RecordStore> {
        self.store.clone()
    }

    /// Replace the working set wholesale. An active run is asked to stop;
    /// it keeps writing to the store it started on, never to the new one.
    pub fn load(&mut self, rows: &[RawRow]) -> usize {
        self.pipeline.stop();
        self.store = Arc::new(RecordStore::load(rows, self.reference_date));
        self.store.len()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let rows = records::read_rows(path)?;
        Ok(self.load(&rows))
    }

    /// Returns `None` when the store is empty or a run is already active
    pub fn start_batch(&self, concurrency: ConcurrencyConfig) -> Option<JoinHandle<BatchSummary>> {
        self.pipeline.start(self.store.clone(), concurrency)
    }

    pub fn stop_batch(&self) {
        self.pipeline.stop();
    }

    pub fn is_batch_running(&self) -> bool {
        self.pipeline.is_running()
    }

    pub fn progress(&self) -> BatchProgress {
        self.pipeline.progress()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<BatchProgress> {
        self.pipeline.subscribe()
    }

    pub async fn refetch_one(&self, id: RecordId) -> RecordOutcome {
        self.pipeline.refetch_one(&self.store, id).await
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.filter = spec;
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
    }

    pub fn get_page(
        &self,
        page_index: usize,
        page_size: usize,
        sort_field: SortField,
        direction: SortDirection,
    ) -> Page {
        view::get_page(
            &self.store.snapshot(),
            &self.filter,
            page_index,
            page_size,
            sort_field,
            direction,
        )
    }

    pub fn get_categorical_options(&self) -> CategoricalOptions {
        view::categorical_options(&self.store.snapshot())
    }

    pub fn export_as(&self, format: ExportFormat) -> Result<ExportedFile, ExportError> {
        export::export_records(&self.store.snapshot(), &self.filter, format)
    }
}
