//! Read source rows from CSV or Excel files

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};
use std::io::Read;
use std::path::Path;

use super::RawRow;

/// Read every data row of a `.csv`, `.xlsx` or `.xls` file
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
            read_csv(file).with_context(|| format!("Failed to parse CSV file: {}", path.display()))
        }
        "xlsx" | "xlsm" | "xls" => read_excel(path),
        other => bail!("Unsupported input file type '{}': {}", other, path.display()),
    }
}

/// Parse CSV with a header row. Short rows are padded with empty cells.
pub fn read_csv<R: Read>(input: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", line + 2))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Read the first worksheet of an Excel workbook
fn read_excel(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        bail!("Workbook has no sheets: {}", path.display());
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    let rows = rows_iter
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, h)| !h.is_empty())
                .map(|(i, h)| (h.clone(), cells.get(i).map(cell_to_string).unwrap_or_default()))
                .collect::<RawRow>()
        })
        .collect();

    Ok(rows)
}

/// Render an Excel cell as the text a CSV export of it would contain
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Serial of 9999-12-31, the last date Excel can display
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Excel stores dates as days since 1899-12-30 (1900 date system)
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}
