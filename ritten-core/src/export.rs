//! Spreadsheet export
//!
//! One worksheet, one header row with the Dutch column labels, one row per
//! trip in column order. Blank values are left as empty cells.

use rust_xlsxwriter::{ColNum, RowNum, Workbook};

use crate::error::{Result, RittenError};
use crate::models::{TripField, TripRecord};

pub const SHEET_NAME: &str = "Ritadministratie";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Render `records` as an in-memory `.xlsx` file.
pub fn render_workbook(records: &[TripRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, field) in TripField::ALL.iter().enumerate() {
        worksheet.write_string(0, col_num(col)?, field.header())?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = row_num(idx + 1)?;
        for (col, field) in TripField::ALL.iter().enumerate() {
            let value = record.get(*field);
            if !value.is_empty() {
                worksheet.write_string(row, col_num(col)?, value)?;
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(rows = records.len(), bytes = bytes.len(), "Rendered workbook");
    Ok(bytes)
}

/// Download name for an uploaded file: `.xml` becomes `_output.xlsx`.
/// Names without `.xml` are returned unchanged.
pub fn output_filename(uploaded: &str) -> String {
    uploaded.replace(".xml", "_output.xlsx")
}

fn row_num(value: usize) -> Result<RowNum> {
    RowNum::try_from(value).map_err(|_| RittenError::Export(format!("row index overflow: {value}")))
}

fn col_num(value: usize) -> Result<ColNum> {
    ColNum::try_from(value)
        .map_err(|_| RittenError::Export(format!("column index overflow: {value}")))
}
