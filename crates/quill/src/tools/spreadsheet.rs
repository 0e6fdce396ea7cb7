use rust_xlsxwriter::{Workbook, XlsxError};
use serde_json::Value;
use std::path::Path;

use crate::database::QueryRows;

/// Keep only `[A-Za-z0-9_-]`; fall back to `export` when nothing is left
pub fn sanitize_table_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if safe.is_empty() {
        "export".to_string()
    } else {
        safe
    }
}

/// Write rows to a single-sheet workbook: a header row of column names, then one row
/// per record. Nulls are left as blank cells.
pub fn write_rows(path: &Path, rows: &QueryRows) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in rows.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }

    for (r, record) in rows.rows.iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, value) in record.iter().enumerate() {
            let col = c as u16;
            match value {
                Value::Null => {}
                Value::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(row, col, f)?;
                    }
                    None => {
                        worksheet.write_string(row, col, n.to_string())?;
                    }
                },
                Value::String(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                other => {
                    worksheet.write_string(row, col, other.to_string())?;
                }
            }
        }
    }

    workbook.save(path)
}
