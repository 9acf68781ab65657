//! Spreadsheet export

use rust_xlsxwriter::{Format, Workbook};

use super::{Cell, ExportError, ExportTable, SHEET_NAME};

pub fn to_xlsx_bytes(table: &ExportTable) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold();
    for (col, name) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(s) if s.is_empty() => { /* Leave cell empty */ }
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col as u16, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_num, col as u16, *n as f64)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_records;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    #[test]
    fn test_xlsx_sheet_and_cells() {
        let table = ExportTable::from_records(&sample_records());
        let bytes = to_xlsx_bytes(&table).unwrap();

        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);

        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        assert_eq!(range.get((0, 0)), Some(&Data::String("Name".to_string())));
        assert_eq!(range.get((1, 1)), Some(&Data::String("soon@x.com".to_string())));
        assert_eq!(range.get((1, 6)), Some(&Data::Float(2.0)));
        assert_eq!(range.height(), 3);
    }
}
