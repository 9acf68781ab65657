//! Record Store
//!
//! In-memory, insertion-ordered collection of schedule-change records. The
//! store is rebuilt wholesale on every load; afterwards only the enrichment
//! fields of a record change, each behind its own lock.

pub mod derive;
pub mod reader;

pub use derive::{DateChangeMagnitude, Priority, derive_magnitude, derive_priority, parse_loose_date};
pub use reader::read_rows;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source column names
pub mod columns {
    pub const EMAIL: &str = "Email";
    pub const NAME: &str = "Name";
    pub const PHONE: &str = "Phone Number";
    pub const PHONE_ALT: &str = "Phone";
    pub const ORIGINAL_SCHEDULE_DATE: &str = "Original Schedule Date";
    pub const NEW_SCHEDULE_DATE: &str = "New Schedule Date";
    pub const TICKET_STATUS: &str = "Ticket Status";
    pub const TICKET_STATUS_ALT: &str = "TicketStatus";

    /// Columns mapped onto record fields (everything else is passthrough)
    pub const KNOWN: &[&str] = &[
        EMAIL,
        NAME,
        PHONE,
        PHONE_ALT,
        ORIGINAL_SCHEDULE_DATE,
        NEW_SCHEDULE_DATE,
        TICKET_STATUS,
        TICKET_STATUS_ALT,
    ];
}

/// Position of a record in load order
pub type RecordId = usize;

/// Whether the support contact was found in Intercom
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ContactStatus {
    #[default]
    Unknown,
    Yes,
    No,
    Error,
}

impl ContactStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ContactStatus::Unknown => "Unknown",
            ContactStatus::Yes => "Yes",
            ContactStatus::No => "No",
            ContactStatus::Error => "Error",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "unknown" => Some(ContactStatus::Unknown),
            "yes" => Some(ContactStatus::Yes),
            "no" => Some(ContactStatus::No),
            "error" => Some(ContactStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Fields written by the enrichment pipeline
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Enrichment {
    pub contacted: ContactStatus,
    /// Intercom contact id, empty when there is none
    pub remote_contact_id: String,
    /// Only meaningful when `contacted` is `Yes`
    pub conversation_count: u64,
}

impl Enrichment {
    /// Contact found: store its id and conversation count
    pub fn matched(&mut self, contact_id: impl Into<String>, conversations: Option<u64>) {
        self.contacted = ContactStatus::Yes;
        self.remote_contact_id = contact_id.into();
        self.conversation_count = conversations.unwrap_or(0);
    }

    /// No contact for the email
    pub fn unmatched(&mut self) {
        self.contacted = ContactStatus::No;
        self.remote_contact_id.clear();
        self.conversation_count = 0;
    }

    /// Lookup failed; other fields keep their previous values
    pub fn failed(&mut self) {
        self.contacted = ContactStatus::Error;
    }
}

/// One row of the working set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub original_schedule_date: String,
    pub new_schedule_date: String,
    pub ticket_status: String,
    pub priority: Priority,
    pub magnitude: DateChangeMagnitude,
    pub enrichment: Enrichment,
    /// Source columns that have no dedicated field, in source order
    pub passthrough: Vec<(String, String)>,
}

impl Record {
    /// Build a record from a raw row. Rows without an email yield `None`.
    pub fn from_raw(id: RecordId, row: &RawRow, reference: NaiveDate) -> Option<Self> {
        let email = row.get(columns::EMAIL).trim();
        if email.is_empty() {
            return None;
        }

        let original = row.get(columns::ORIGINAL_SCHEDULE_DATE).to_string();
        let new = row.get(columns::NEW_SCHEDULE_DATE).to_string();

        Some(Self {
            id,
            email: email.to_string(),
            name: row.get(columns::NAME).to_string(),
            phone: row.first_of(&[columns::PHONE, columns::PHONE_ALT]).to_string(),
            ticket_status: row
                .first_of(&[columns::TICKET_STATUS, columns::TICKET_STATUS_ALT])
                .to_string(),
            priority: derive_priority(&original, reference),
            magnitude: derive_magnitude(&original, &new),
            original_schedule_date: original,
            new_schedule_date: new,
            enrichment: Enrichment::default(),
            passthrough: row
                .fields
                .iter()
                .filter(|(k, _)| !columns::KNOWN.contains(&k.as_str()))
                .cloned()
                .collect(),
        })
    }

    pub fn contacted(&self) -> ContactStatus {
        self.enrichment.contacted
    }

    pub fn conversation_count(&self) -> u64 {
        self.enrichment.conversation_count
    }

    pub fn original_date(&self) -> Option<NaiveDate> {
        parse_loose_date(&self.original_schedule_date)
    }

    pub fn new_date(&self) -> Option<NaiveDate> {
        parse_loose_date(&self.new_schedule_date)
    }
}

/// A source row: header -> cell text, in column order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a cell, replacing an existing value for the same header
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Cell text for a header, empty when the column is missing
    pub fn get(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// First non-empty cell among several header aliases
    fn first_of(&self, keys: &[&str]) -> &str {
        keys.iter()
            .map(|k| self.get(k))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// The single source of truth for the loaded working set
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<RwLock<Record>>,
    revision: AtomicU64,
    reference_date: Option<NaiveDate>,
}

impl RecordStore {
    /// Build a fresh store from raw rows; emailless rows are dropped
    pub fn load(rows: &[RawRow], reference: NaiveDate) -> Self {
        let records: Vec<RwLock<Record>> = rows
            .iter()
            .filter_map({
                let mut next_id = 0;
                move |row| {
                    let record = Record::from_raw(next_id, row, reference)?;
                    next_id += 1;
                    Some(RwLock::new(record))
                }
            })
            .collect();

        let dropped = rows.len() - records.len();
        if dropped > 0 {
            log::debug!("Dropped {} row(s) without an email", dropped);
        }
        log::info!("Loaded {} record(s)", records.len());

        Self {
            records,
            revision: AtomicU64::new(0),
            reference_date: Some(reference),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reference date the derived labels were computed against
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }

    /// Copy of one record
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.records
            .get(id)
            .map(|lock| lock.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    /// Email of a record without cloning the rest of it
    pub fn email(&self, id: RecordId) -> Option<String> {
        self.records
            .get(id)
            .map(|lock| lock.read().unwrap_or_else(|e| e.into_inner()).email.clone())
    }

    /// Copy of every record in load order
    pub fn snapshot(&self) -> Vec<Record> {
        self.records
            .iter()
            .map(|lock| lock.read().unwrap_or_else(|e| e.into_inner()).clone())
            .collect()
    }

    /// Mutate the enrichment fields of one record. Returns false for unknown ids.
    pub fn update_enrichment(&self, id: RecordId, update: impl FnOnce(&mut Enrichment)) -> bool {
        match self.records.get(id) {
            Some(lock) => {
                let mut record = lock.write().unwrap_or_else(|e| e.into_inner());
                update(&mut record.enrichment);
                true
            }
            None => false,
        }
    }

    /// Monotonic counter bumped whenever observers should recompute views
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Mark derived projections stale
    pub fn invalidate(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }
}
