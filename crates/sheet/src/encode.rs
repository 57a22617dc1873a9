//! Records to xlsx or CSV bytes, processed in fixed-size batches.

use crate::error::{EncodeError, EncodeResult};
use crate::record::{collect_headers, Record};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of rows handled per batch
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Default worksheet name for xlsx output
pub const DEFAULT_SHEET_NAME: &str = "数据结果";

/// Output format for an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Office Open XML workbook
    Xlsx,
    /// UTF-8 CSV with byte-order mark
    #[default]
    Csv,
}

impl ExportFormat {
    /// File extension without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unknown export format: '{other}' (expected xlsx or csv)")),
        }
    }
}

/// Encoder options
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Rows per batch; zero is treated as one
    pub batch_size: usize,
    /// Worksheet name used for xlsx output
    pub sheet_name: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

impl EncodeOptions {
    /// Set the batch size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the worksheet name
    #[must_use]
    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }
}

/// Encode a dataset with default options.
///
/// # Example
/// ```
/// use costmerge_sheet::{encode, record, CellValue, ExportFormat};
///
/// let rows = vec![record([("code", CellValue::from("A1")), ("cost", CellValue::Int(9))])];
/// let bytes = encode(&rows, ExportFormat::Csv).unwrap();
/// assert_eq!(bytes, "\u{FEFF}code,cost\r\nA1,9\r\n".as_bytes());
/// ```
pub fn encode(dataset: &[Record], format: ExportFormat) -> EncodeResult<Vec<u8>> {
    encode_with_options(dataset, format, &EncodeOptions::default())
}

/// Encode a dataset.
///
/// The header is the union of keys over all records in first-seen order.
/// Batch size never changes the encoded content.
pub fn encode_with_options(
    dataset: &[Record],
    format: ExportFormat,
    options: &EncodeOptions,
) -> EncodeResult<Vec<u8>> {
    if dataset.is_empty() {
        return Err(EncodeError::EmptyDataset);
    }

    let headers = collect_headers(dataset);
    let batch_size = options.batch_size.max(1);

    let bytes = match format {
        ExportFormat::Csv => crate::csv::write_csv(dataset, &headers, batch_size)?,
        ExportFormat::Xlsx => crate::xlsx::write_xlsx(dataset, &headers, &options.sheet_name, batch_size)?,
    };

    tracing::info!(
        %format,
        rows = dataset.len(),
        columns = headers.len(),
        bytes = bytes.len(),
        "encoded dataset"
    );
    Ok(bytes)
}
