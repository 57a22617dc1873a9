//! Spreadsheet bytes to records.

use crate::cell::CellValue;
use crate::error::{DecodeError, DecodeResult};
use crate::record::{Dataset, Record};
use indexmap::IndexSet;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Name given to header cells that are blank.
const EMPTY_HEADER: &str = "__EMPTY";

/// Container detected from the leading bytes of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Zip-based workbook (xlsx, xlsm, xlsb, ods)
    Zip,
    /// OLE compound file (legacy xls)
    Ole,
    /// Plain UTF-8 delimited text
    Text,
}

impl SourceKind {
    /// Sniff the container from magic bytes
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) {
            SourceKind::Zip
        } else if bytes.starts_with(OLE_MAGIC) {
            SourceKind::Ole
        } else {
            SourceKind::Text
        }
    }
}

/// Decode the first sheet of a spreadsheet into a dataset.
///
/// The first non-empty row supplies the column names. Every record carries
/// the full column set, with missing cells as [`CellValue::Null`]; rows with
/// no values at all are dropped.
///
/// # Errors
///
/// [`DecodeError::EmptyFile`] if there are no data rows,
/// [`DecodeError::Format`] if the bytes are not a readable spreadsheet.
///
/// # Example
/// ```
/// use costmerge_sheet::{decode, CellValue};
///
/// let rows = decode(b"code,cost\r\nA1,5\r\n").unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0]["cost"], CellValue::from("5"));
/// ```
pub fn decode(bytes: &[u8]) -> DecodeResult<Dataset> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyFile);
    }

    let kind = SourceKind::detect(bytes);
    let rows = match kind {
        SourceKind::Zip | SourceKind::Ole => crate::xlsx::read_first_sheet(bytes)?,
        SourceKind::Text => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            let text = std::str::from_utf8(body)
                .map_err(|_| DecodeError::Format("content is neither a workbook nor UTF-8 text".to_string()))?;
            if text.contains('\0') {
                return Err(DecodeError::Format("binary content is not a spreadsheet".to_string()));
            }
            crate::csv::read_rows(text)?
        }
    };

    let dataset = rows_to_records(rows)?;
    tracing::debug!(?kind, rows = dataset.len(), "decoded dataset");
    Ok(dataset)
}

/// Turn a grid into records keyed by the header row.
pub(crate) fn rows_to_records(rows: Vec<Vec<CellValue>>) -> DecodeResult<Dataset> {
    let mut rows = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.is_null()));

    let Some(header_row) = rows.next() else {
        return Err(DecodeError::EmptyFile);
    };
    let body: Vec<Vec<CellValue>> = rows.collect();
    if body.is_empty() {
        return Err(DecodeError::EmptyFile);
    }

    let width = body
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header_row.len()))
        .max()
        .unwrap_or(0);
    let headers = header_names(&header_row, width);

    let dataset = body
        .into_iter()
        .map(|row| {
            let mut cells = row.into_iter();
            headers
                .iter()
                .map(|name| (name.clone(), cells.next().unwrap_or(CellValue::Null)))
                .collect::<Record>()
        })
        .collect();

    Ok(dataset)
}

/// Unique column names for a header row padded to `width`.
///
/// Blank cells become `__EMPTY`; repeats get `_1`, `_2`, ... suffixes.
fn header_names(header_row: &[CellValue], width: usize) -> Vec<String> {
    let mut used: IndexSet<String> = IndexSet::with_capacity(width);

    for idx in 0..width {
        let raw = header_row
            .get(idx)
            .filter(|cell| !cell.is_blank())
            .map_or_else(|| EMPTY_HEADER.to_string(), CellValue::as_str);

        let mut name = raw.clone();
        let mut suffix = 1;
        while used.contains(&name) {
            name = format!("{raw}_{suffix}");
            suffix += 1;
        }
        used.insert(name);
    }

    used.into_iter().collect()
}
