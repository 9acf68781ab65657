//! JSON export: a pretty-printed array of objects keyed by column header

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use super::{Cell, ExportError, ExportTable};

struct JsonRow<'a> {
    headers: &'a [String],
    cells: &'a [Cell],
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Entries in column order
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (header, cell) in self.headers.iter().zip(self.cells) {
            match cell {
                Cell::Text(s) => map.serialize_entry(header, s)?,
                Cell::Number(n) => map.serialize_entry(header, n)?,
            }
        }
        map.end()
    }
}

pub fn to_json_bytes(table: &ExportTable) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<JsonRow<'_>> = table
        .rows
        .iter()
        .map(|cells| JsonRow {
            headers: &table.headers,
            cells,
        })
        .collect();

    Ok(serde_json::to_vec_pretty(&rows)?)
}
