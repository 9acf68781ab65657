//! Export Formatter
//!
//! Turns the filtered (unpaginated) projection into a downloadable file.
//! All three formats share one table: fixed columns first, passthrough
//! columns after, rows ordered by original schedule date.

pub mod csv_exporter;
pub mod excel;
pub mod json;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::records::Record;
use crate::view::{self, FilterSpec, SortDirection, SortField};

pub const FILENAME_PREFIX: &str = "schedule_change_filtered_";

pub const SHEET_NAME: &str = "ScheduleChangeData";

/// Fixed export columns. The remote contact id is internal and never exported.
pub const COLUMNS: &[&str] = &[
    "Name",
    "Email",
    "Phone",
    "Original Schedule Date",
    "New Schedule Date",
    "ContactedInIntercom",
    "ConversationCount",
    "Priority",
    "DateChangeMagnitude",
    "TicketStatus",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to export")]
    NothingToExport,

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished export, ready to be written or handed to a downloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Write into `dir`, creating it when missing
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        log::info!("Exported {} bytes to {}", self.bytes.len(), path.display());
        Ok(path)
    }
}

/// One exported cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(u64),
}

impl Cell {
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

/// Header plus rows shared by every writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ExportTable {
    /// Build from records already filtered; sorts by original date ascending
    pub fn from_records(records: &[Record]) -> Self {
        // Passthrough columns follow store order, not export row order
        let mut passthrough: Vec<String> = Vec::new();
        for record in records {
            for (key, _) in &record.passthrough {
                if !COLUMNS.contains(&key.as_str()) && !passthrough.contains(key) {
                    passthrough.push(key.clone());
                }
            }
        }

        let mut records = records.to_vec();
        view::sort_records(&mut records, SortField::OriginalScheduleDate, SortDirection::Asc);

        let headers = COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(passthrough.iter().cloned())
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                let mut row = vec![
                    Cell::Text(record.name.clone()),
                    Cell::Text(record.email.clone()),
                    Cell::Text(record.phone.clone()),
                    Cell::Text(record.original_schedule_date.clone()),
                    Cell::Text(record.new_schedule_date.clone()),
                    Cell::Text(record.contacted().label().to_string()),
                    Cell::Number(record.conversation_count()),
                    Cell::Text(record.priority.label().to_string()),
                    Cell::Text(record.magnitude.label().to_string()),
                    Cell::Text(record.ticket_status.clone()),
                ];
                for key in &passthrough {
                    let value = record
                        .passthrough
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default();
                    row.push(Cell::Text(value));
                }
                row
            })
            .collect();

        Self { headers, rows }
    }
}

/// `schedule_change_filtered_<tokens>.<ext>`
pub fn export_filename(spec: &FilterSpec, format: ExportFormat) -> String {
    format!("{}{}.{}", FILENAME_PREFIX, spec.filename_token(), format.extension())
}

/// Filter `records` with `spec` and serialize the result
pub fn export_records(
    records: &[Record],
    spec: &FilterSpec,
    format: ExportFormat,
) -> Result<ExportedFile, ExportError> {
    let filtered = view::project(records, spec);
    if filtered.is_empty() {
        log::warn!("No data to export for filter {}", spec.filename_token());
        return Err(ExportError::NothingToExport);
    }

    let table = ExportTable::from_records(&filtered);
    let bytes = match format {
        ExportFormat::Csv => csv_exporter::to_csv_bytes(&table)?,
        ExportFormat::Xlsx => excel::to_xlsx_bytes(&table)?,
        ExportFormat::Json => json::to_json_bytes(&table)?,
    };

    Ok(ExportedFile {
        filename: export_filename(spec, format),
        format,
        bytes,
    })
}
