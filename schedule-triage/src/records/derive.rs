//! Priority and date-change labels derived from the schedule dates
//!
//! Both derivations are pure: they only look at the date strings and an
//! explicit reference date supplied by the caller.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How urgently a record needs attention, based on the original schedule date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Immediate,
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Medium,
    Low,
    Unknown,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Immediate => "Immediate",
            Priority::VeryHigh => "Very High",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Unknown => "Unknown",
        }
    }

    /// Parse a display label back into a priority (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "immediate" => Some(Priority::Immediate),
            "very high" | "very-high" | "veryhigh" => Some(Priority::VeryHigh),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            "unknown" => Some(Priority::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Size of the move between the original and the new schedule date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DateChangeMagnitude {
    Minor,
    Moderate,
    Major,
    Unknown,
}

impl DateChangeMagnitude {
    pub fn label(&self) -> &'static str {
        match self {
            DateChangeMagnitude::Minor => "Minor",
            DateChangeMagnitude::Moderate => "Moderate",
            DateChangeMagnitude::Major => "Major",
            DateChangeMagnitude::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "minor" => Some(DateChangeMagnitude::Minor),
            "moderate" => Some(DateChangeMagnitude::Moderate),
            "major" => Some(DateChangeMagnitude::Major),
            "unknown" => Some(DateChangeMagnitude::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for DateChangeMagnitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Date-only formats tried in order. Two-digit years go before `%Y`, which
/// would otherwise accept "24" as the year 24.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Date-time formats; the time part is dropped
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Ordinal suffixes ("5th") and commas get in the way of chrono's parser
static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

/// Parse a free-text date. Returns `None` for anything unrecognised.
pub fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Offset timestamps are dated in UTC
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }

    let normalized = ORDINAL_SUFFIX.replace_all(trimmed, "$1").replace(',', " ");
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
}

/// Priority from the whole-day distance between the original date and `reference`.
///
/// Dates in the past give a negative distance and therefore `Immediate`.
pub fn derive_priority(original_date: &str, reference: NaiveDate) -> Priority {
    let Some(original) = parse_loose_date(original_date) else {
        return Priority::Unknown;
    };

    let days = (original - reference).num_days();
    match days {
        d if d <= 10 => Priority::Immediate,
        d if d <= 30 => Priority::VeryHigh,
        d if d <= 60 => Priority::High,
        d if d <= 90 => Priority::Medium,
        _ => Priority::Low,
    }
}

/// Magnitude from the absolute whole-day distance between the two dates
pub fn derive_magnitude(original_date: &str, new_date: &str) -> DateChangeMagnitude {
    let (Some(original), Some(new)) = (parse_loose_date(original_date), parse_loose_date(new_date))
    else {
        return DateChangeMagnitude::Unknown;
    };

    match (new - original).num_days().abs() {
        d if d <= 7 => DateChangeMagnitude::Minor,
        d if d <= 14 => DateChangeMagnitude::Moderate,
        _ => DateChangeMagnitude::Major,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_parse_loose_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        for raw in [
            "2024-01-05",
            "2024/01/05",
            "01/05/2024",
            "1/5/24",
            "Jan 5, 2024",
            "January 5th 2024",
            "5 January 2024",
            "2024-01-05T09:30:00Z",
            "2024-01-05 14:00",
            "  2024-01-05  ",
        ] {
            assert_eq!(parse_loose_date(raw), Some(expected), "failed on {:?}", raw);
        }
    }

    #[test]
    fn test_offset_timestamps_use_utc_date() {
        assert_eq!(
            parse_loose_date("2024-01-05T23:30:00-05:00"),
            NaiveDate::from_ymd_opt(2024, 1, 6)
        );
        assert_eq!(
            parse_loose_date("2024-01-06T01:00:00+03:00"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
    }

    #[test]
    fn test_parse_loose_date_rejects_garbage() {
        assert_eq!(parse_loose_date(""), None);
        assert_eq!(parse_loose_date("TBD"), None);
        assert_eq!(parse_loose_date("2024-13-45"), None);
    }

    #[test]
    fn test_priority_thresholds() {
        let now = jan_first();
        assert_eq!(derive_priority("2024-01-05", now), Priority::Immediate);
        assert_eq!(derive_priority("2024-01-11", now), Priority::Immediate); // 10 days
        assert_eq!(derive_priority("2024-01-12", now), Priority::VeryHigh);
        assert_eq!(derive_priority("2024-01-31", now), Priority::VeryHigh); // 30 days
        assert_eq!(derive_priority("2024-03-01", now), Priority::High); // 60 days
        assert_eq!(derive_priority("2024-03-02", now), Priority::Medium);
        // 2024 is a leap year: March 31st is 90 days out, April 1st is 91
        assert_eq!(derive_priority("2024-03-31", now), Priority::Medium);
        assert_eq!(derive_priority("2024-04-01", now), Priority::Low);
    }

    #[test]
    fn test_priority_past_and_unknown() {
        let now = jan_first();
        assert_eq!(derive_priority("2023-12-01", now), Priority::Immediate);
        assert_eq!(derive_priority("", now), Priority::Unknown);
        assert_eq!(derive_priority("next week", now), Priority::Unknown);
    }

    #[test]
    fn test_magnitude_thresholds() {
        assert_eq!(derive_magnitude("2024-01-05", "2024-01-08"), DateChangeMagnitude::Minor);
        assert_eq!(derive_magnitude("2024-01-01", "2024-01-08"), DateChangeMagnitude::Minor);
        assert_eq!(derive_magnitude("2024-01-01", "2024-01-09"), DateChangeMagnitude::Moderate);
        assert_eq!(derive_magnitude("2024-01-01", "2024-01-15"), DateChangeMagnitude::Moderate);
        assert_eq!(derive_magnitude("2024-01-01", "2024-01-16"), DateChangeMagnitude::Major);
    }

    #[test]
    fn test_magnitude_is_symmetric() {
        let pairs = [
            ("2024-01-01", "2024-01-03"),
            ("2024-02-10", "2024-01-30"),
            ("2024-05-01", "2023-11-20"),
        ];
        for (a, b) in pairs {
            assert_eq!(derive_magnitude(a, b), derive_magnitude(b, a));
        }
    }

    #[test]
    fn test_magnitude_unknown_when_either_missing() {
        assert_eq!(derive_magnitude("", "2024-01-08"), DateChangeMagnitude::Unknown);
        assert_eq!(derive_magnitude("2024-01-08", "soon"), DateChangeMagnitude::Unknown);
    }

    #[test]
    fn test_label_round_trip_parsing() {
        assert_eq!(Priority::from_label("very high"), Some(Priority::VeryHigh));
        assert_eq!(Priority::from_label("Immediate"), Some(Priority::Immediate));
        assert_eq!(Priority::from_label("urgent"), None);
        assert_eq!(DateChangeMagnitude::from_label("MAJOR"), Some(DateChangeMagnitude::Major));
    }
}
