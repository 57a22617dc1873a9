use crate::cell::CellValue;
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::record::{field, Record};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::io::Cursor;

/// Convert calamine Data to CellValue
fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::String(b.to_string()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::DateTime(dt) => {
            // Excel stores dates as days since 1899-12-30
            CellValue::number(dt.as_f64())
        }
        Data::DateTimeIso(s) => CellValue::String(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(format!("#ERROR: {e:?}")),
    }
}

/// Read the first worksheet of an in-memory workbook into a grid.
pub(crate) fn read_first_sheet(bytes: &[u8]) -> DecodeResult<Vec<Vec<CellValue>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| DecodeError::Format(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let Some(first) = sheet_names.first() else {
        return Err(DecodeError::EmptyFile);
    };

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| DecodeError::Format(e.to_string()))?;

    tracing::debug!(sheet = %first, "reading first worksheet");

    Ok(range
        .rows()
        .map(|row| row.iter().map(data_to_cell_value).collect())
        .collect())
}

/// Write records to a single-sheet xlsx workbook held in memory.
pub(crate) fn write_xlsx(
    dataset: &[Record],
    headers: &[String],
    sheet_name: &str,
    batch_size: usize,
) -> EncodeResult<Vec<u8>> {
    let mut workbook = Workbook::new();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col_idx, header) in headers.iter().enumerate() {
            worksheet.write_string(0, col_num(col_idx)?, header)?;
        }

        let total_batches = dataset.len().div_ceil(batch_size);
        for (batch_idx, batch) in dataset.chunks(batch_size).enumerate() {
            let first_row = batch_idx * batch_size + 1;
            for (offset, row) in batch.iter().enumerate() {
                let row_num = u32::try_from(first_row + offset)
                    .map_err(|_| EncodeError::WriteFailure("Row index overflow".to_string()))?;
                write_row(worksheet, row_num, row, headers)?;
            }
            tracing::debug!(batch = batch_idx + 1, total_batches, rows = batch.len(), "xlsx batch written");
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_row(worksheet: &mut Worksheet, row_num: u32, row: &Record, headers: &[String]) -> EncodeResult<()> {
    for (col_idx, header) in headers.iter().enumerate() {
        let col = col_num(col_idx)?;
        match field(row, header) {
            CellValue::Null => {} // Leave empty
            CellValue::Int(i) => {
                // Note: Excel stores all numbers as f64, so integers > 2^53
                // may lose precision
                worksheet.write_number(row_num, col, *i as f64)?;
            }
            CellValue::Float(f) => {
                worksheet.write_number(row_num, col, *f)?;
            }
            CellValue::String(s) => {
                worksheet.write_string(row_num, col, s)?;
            }
        }
    }
    Ok(())
}

fn col_num(col_idx: usize) -> EncodeResult<u16> {
    u16::try_from(col_idx).map_err(|_| EncodeError::WriteFailure("Column index overflow".to_string()))
}
