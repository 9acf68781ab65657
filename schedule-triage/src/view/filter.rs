//! Filter specification for the record view

use serde::{Deserialize, Serialize};

use crate::records::{ContactStatus, DateChangeMagnitude, Priority, Record};

/// Five optional predicates, ANDed. `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub contacted: Option<ContactStatus>,
    /// Minimum conversation count, applied whatever the contacted status
    pub min_conversations: Option<u64>,
    pub priority: Option<Priority>,
    pub magnitude: Option<DateChangeMagnitude>,
    pub ticket_status: Option<String>,
}

impl FilterSpec {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_contacted(mut self, status: ContactStatus) -> Self {
        self.contacted = Some(status);
        self
    }

    pub fn with_min_conversations(mut self, min: u64) -> Self {
        self.min_conversations = Some(min);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_magnitude(mut self, magnitude: DateChangeMagnitude) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    pub fn with_ticket_status(mut self, status: impl Into<String>) -> Self {
        let status = status.into();
        self.ticket_status = (!status.is_empty()).then_some(status);
        self
    }

    /// Reset every predicate
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.contacted.is_none()
            && self.min_conversations.is_none()
            && self.priority.is_none()
            && self.magnitude.is_none()
            && self.ticket_status.as_deref().is_none_or(str::is_empty)
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(status) = self.contacted {
            if record.contacted() != status {
                return false;
            }
        }

        if let Some(min) = self.min_conversations {
            if record.conversation_count() < min {
                return false;
            }
        }

        if let Some(priority) = self.priority {
            if record.priority != priority {
                return false;
            }
        }

        if let Some(magnitude) = self.magnitude {
            if record.magnitude != magnitude {
                return false;
            }
        }

        match self.ticket_status.as_deref() {
            Some(status) if !status.is_empty() => record.ticket_status == status,
            _ => true,
        }
    }

    /// Tokens naming the active predicates, `all` when none is active
    pub fn filename_token(&self) -> String {
        let mut tokens = Vec::new();

        if let Some(status) = self.contacted {
            tokens.push(format!("cont_{}", status.label()));
        }
        if let Some(min) = self.min_conversations {
            tokens.push(format!("conv_{}", min));
        }
        if let Some(priority) = self.priority {
            tokens.push(format!("pr_{}", priority.label()));
        }
        if let Some(magnitude) = self.magnitude {
            tokens.push(format!("magn_{}", magnitude.label()));
        }
        if let Some(status) = self.ticket_status.as_deref().filter(|s| !s.is_empty()) {
            tokens.push(format!("stat_{}", status));
        }

        if tokens.is_empty() {
            "all".to_string()
        } else {
            tokens.join("_")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RawRow;
    use chrono::NaiveDate;

    fn record(status: ContactStatus, conversations: u64, ticket: &str) -> Record {
        let row = RawRow::new()
            .with("Email", "a@x.com")
            .with("Original Schedule Date", "2024-01-05")
            .with("New Schedule Date", "2024-01-30")
            .with("Ticket Status", ticket);
        let mut record = Record::from_raw(0, &row, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        record.enrichment.contacted = status;
        record.enrichment.conversation_count = conversations;
        record
    }

    #[test]
    fn test_empty_spec_matches_everything() {
        let spec = FilterSpec::all();
        assert!(spec.is_empty());
        assert!(spec.matches(&record(ContactStatus::Unknown, 0, "")));
        assert_eq!(spec.filename_token(), "all");
    }

    #[test]
    fn test_predicates_are_anded() {
        let spec = FilterSpec::all()
            .with_contacted(ContactStatus::Yes)
            .with_min_conversations(2)
            .with_priority(Priority::Immediate)
            .with_magnitude(DateChangeMagnitude::Major)
            .with_ticket_status("Open");

        assert!(spec.matches(&record(ContactStatus::Yes, 3, "Open")));
        assert!(!spec.matches(&record(ContactStatus::No, 3, "Open")));
        assert!(!spec.matches(&record(ContactStatus::Yes, 1, "Open")));
        assert!(!spec.matches(&record(ContactStatus::Yes, 3, "Closed")));
    }

    #[test]
    fn test_min_conversations_ignores_contacted_status() {
        let spec = FilterSpec::all().with_min_conversations(0);
        assert!(spec.matches(&record(ContactStatus::Error, 0, "")));

        let spec = FilterSpec::all().with_min_conversations(1);
        assert!(!spec.matches(&record(ContactStatus::No, 0, "")));
    }

    #[test]
    fn test_filename_tokens() {
        let spec = FilterSpec::all().with_priority(Priority::Immediate);
        assert_eq!(spec.filename_token(), "pr_Immediate");

        let spec = FilterSpec::all()
            .with_contacted(ContactStatus::Yes)
            .with_min_conversations(3)
            .with_magnitude(DateChangeMagnitude::Minor)
            .with_ticket_status("Open");
        assert_eq!(spec.filename_token(), "cont_Yes_conv_3_magn_Minor_stat_Open");
    }

    #[test]
    fn test_clear_and_blank_ticket_status() {
        let mut spec = FilterSpec::all().with_priority(Priority::Low).with_ticket_status("");
        assert_eq!(spec.ticket_status, None);
        spec.clear();
        assert!(spec.is_empty());
    }
}
