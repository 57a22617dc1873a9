use crate::cell::CellValue;
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::record::{field, Record};

const BOM: &str = "\u{FEFF}";

/// Read CSV text into a grid.
///
/// CSV carries no types, so non-empty fields stay strings and empty fields
/// become null.
pub(crate) fn read_rows(text: &str) -> DecodeResult<Vec<Vec<CellValue>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false) // Header row is handled by the decoder
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut data: Vec<Vec<CellValue>> = Vec::new();

    for result in csv_reader.records() {
        let record = result.map_err(|e| DecodeError::Format(e.to_string()))?;
        let row: Vec<CellValue> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Null
                } else {
                    CellValue::String(field.to_string())
                }
            })
            .collect();
        data.push(row);
    }

    Ok(data)
}

/// Write records as UTF-8 CSV with a BOM and CRLF line endings.
///
/// Rows go through the writer `batch_size` at a time; the buffer is flushed
/// between batches, which has no effect on the bytes produced.
///
/// Null and missing cells are empty fields. A row whose only field is empty
/// comes out as `""`, since a bare empty line is not a record to CSV readers.
pub(crate) fn write_csv(dataset: &[Record], headers: &[String], batch_size: usize) -> EncodeResult<Vec<u8>> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(BOM.as_bytes().to_vec());

    csv_writer.write_record(headers)?;

    let total_batches = dataset.len().div_ceil(batch_size);
    for (batch_idx, batch) in dataset.chunks(batch_size).enumerate() {
        for row in batch {
            csv_writer.write_record(headers.iter().map(|h| field(row, h).as_str()))?;
        }
        csv_writer.flush()?;
        tracing::debug!(batch = batch_idx + 1, total_batches, rows = batch.len(), "csv batch written");
    }

    csv_writer
        .into_inner()
        .map_err(|e| EncodeError::WriteFailure(e.to_string()))
}
