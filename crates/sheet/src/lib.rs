//! Record model and spreadsheet codecs for costmerge
//!
//! Turns uploaded workbook bytes into ordered records and serializes merged
//! records back to xlsx or CSV.
//!
//! # Examples
//!
//! ## Decoding an upload
//!
//! ```
//! use costmerge_sheet::{decode, CellValue};
//!
//! let rows = decode("code,amount\r\nA1,100\r\n".as_bytes()).unwrap();
//! assert_eq!(rows[0]["code"], CellValue::from("A1"));
//! ```
//!
//! ## Exporting
//!
//! ```
//! use costmerge_sheet::{encode_with_options, record, CellValue, EncodeOptions, ExportFormat};
//!
//! let rows = vec![record([("code", CellValue::from("A1")), ("cost", CellValue::Null)])];
//! let options = EncodeOptions::default().with_batch_size(500);
//! let bytes = encode_with_options(&rows, ExportFormat::Xlsx, &options).unwrap();
//! assert!(bytes.starts_with(b"PK"));
//! ```

mod cell;
mod csv;
mod decode;
mod encode;
mod error;
mod record;
mod xlsx;

/// Re-export cell value type.
pub use cell::CellValue;
/// Re-export the decoder.
pub use decode::{decode, SourceKind};
/// Re-export the encoder and its options.
pub use encode::{encode, encode_with_options, EncodeOptions, ExportFormat, DEFAULT_BATCH_SIZE, DEFAULT_SHEET_NAME};
/// Re-export error types.
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
/// Re-export record helpers.
pub use record::{collect_headers, field, record, Dataset, Record};
