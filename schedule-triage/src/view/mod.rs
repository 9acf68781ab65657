//! Filter/View projection
//!
//! Pure functions over a store snapshot: filter, stable sort, paginate. No
//! state is kept between calls, so callers recompute whenever the store
//! revision or the filter changes.

pub mod filter;

pub use filter::FilterSpec;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::records::{ContactStatus, DateChangeMagnitude, Priority, Record};

/// Page sizes offered to the operator; 0 means all rows
pub const PAGE_SIZES: &[usize] = &[20, 50, 100, 0];
pub const DEFAULT_PAGE_SIZE: usize = 20;

pub fn is_offered_page_size(size: usize) -> bool {
    PAGE_SIZES.contains(&size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    Name,
    Email,
    Phone,
    #[default]
    OriginalScheduleDate,
    NewScheduleDate,
    Contacted,
    ConversationCount,
    Priority,
    Magnitude,
    TicketStatus,
}

impl SortField {
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "name" => Some(SortField::Name),
            "email" => Some(SortField::Email),
            "phone" | "phonenumber" => Some(SortField::Phone),
            "original" | "originalscheduledate" => Some(SortField::OriginalScheduleDate),
            "new" | "newscheduledate" => Some(SortField::NewScheduleDate),
            "contacted" | "contactedinintercom" => Some(SortField::Contacted),
            "conversations" | "conversationcount" => Some(SortField::ConversationCount),
            "priority" => Some(SortField::Priority),
            "magnitude" | "datechangemagnitude" => Some(SortField::Magnitude),
            "status" | "ticketstatus" => Some(SortField::TicketStatus),
            _ => None,
        }
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Email => a.email.cmp(&b.email),
            SortField::Phone => a.phone.cmp(&b.phone),
            SortField::OriginalScheduleDate => compare_dates(a.original_date(), b.original_date()),
            SortField::NewScheduleDate => compare_dates(a.new_date(), b.new_date()),
            SortField::Contacted => a.contacted().cmp(&b.contacted()),
            SortField::ConversationCount => a.conversation_count().cmp(&b.conversation_count()),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Magnitude => a.magnitude.cmp(&b.magnitude),
            SortField::TicketStatus => a.ticket_status.cmp(&b.ticket_status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Parsed dates first, unparsable dates last
fn compare_dates(a: Option<chrono::NaiveDate>, b: Option<chrono::NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Records satisfying `spec`, in store order
pub fn project(records: &[Record], spec: &FilterSpec) -> Vec<Record> {
    records.iter().filter(|r| spec.matches(r)).cloned().collect()
}

/// Stable sort; ties keep their incoming order in both directions
pub fn sort_records(records: &mut [Record], field: SortField, direction: SortDirection) {
    records.sort_by(|a, b| {
        let ordering = field.compare(a, b);
        match direction {
            SortDirection::Asc => ordering,
            // Unparsable dates stay last when descending
            SortDirection::Desc => match field {
                SortField::OriginalScheduleDate => desc_dates(a.original_date(), b.original_date()),
                SortField::NewScheduleDate => desc_dates(a.new_date(), b.new_date()),
                _ => ordering.reverse(),
            },
        }
    });
}

fn desc_dates(a: Option<chrono::NaiveDate>, b: Option<chrono::NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => compare_dates(a, b),
    }
}

/// One slice of the sorted projection
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub page_index: usize,
    pub page_size: usize,
    pub total_filtered: usize,
    pub total_pages: usize,
}

/// Filter, sort and slice. A page size of 0 returns every filtered record
/// as a single page; a page past the end is empty.
pub fn get_page(
    records: &[Record],
    spec: &FilterSpec,
    page_index: usize,
    page_size: usize,
    sort_field: SortField,
    direction: SortDirection,
) -> Page {
    let mut filtered = project(records, spec);
    sort_records(&mut filtered, sort_field, direction);

    let total_filtered = filtered.len();
    let (items, total_pages) = if page_size == 0 {
        let pages = usize::from(total_filtered > 0);
        let items = if page_index == 0 { filtered } else { Vec::new() };
        (items, pages)
    } else {
        let pages = total_filtered.div_ceil(page_size);
        let items = filtered
            .into_iter()
            .skip(page_index.saturating_mul(page_size))
            .take(page_size)
            .collect();
        (items, pages)
    };

    Page {
        items,
        page_index,
        page_size,
        total_filtered,
        total_pages,
    }
}

/// Distinct non-empty values present for each categorical field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoricalOptions {
    pub contacted: Vec<ContactStatus>,
    pub priority: Vec<Priority>,
    pub magnitude: Vec<DateChangeMagnitude>,
    pub ticket_status: Vec<String>,
}

/// Values in first-seen store order
pub fn categorical_options(records: &[Record]) -> CategoricalOptions {
    let mut options = CategoricalOptions::default();
    for record in records {
        push_distinct(&mut options.contacted, record.contacted());
        push_distinct(&mut options.priority, record.priority);
        push_distinct(&mut options.magnitude, record.magnitude);
        if !record.ticket_status.is_empty() {
            push_distinct(&mut options.ticket_status, record.ticket_status.clone());
        }
    }
    options
}

fn push_distinct<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}
