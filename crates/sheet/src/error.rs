use thiserror::Error;

/// Errors that can occur while decoding spreadsheet bytes
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("File contains no data rows")]
    EmptyFile,

    #[error("Unrecognized or corrupt spreadsheet: {0}")]
    Format(String),
}

/// Errors that can occur while encoding a dataset
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("No data to export")]
    EmptyDataset,

    #[error("Failed to write output: {0}")]
    WriteFailure(String),
}

impl From<csv::Error> for EncodeError {
    fn from(e: csv::Error) -> Self {
        EncodeError::WriteFailure(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for EncodeError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        EncodeError::WriteFailure(e.to_string())
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        EncodeError::WriteFailure(e.to_string())
    }
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
