//! CSV export

use csv::Writer;

use super::{ExportError, ExportTable};

pub fn to_csv_bytes(table: &ExportTable) -> Result<Vec<u8>, ExportError> {
    let mut wtr = Writer::from_writer(Vec::new());

    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|cell| cell.as_text()))?;
    }

    wtr.flush()?;
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}
