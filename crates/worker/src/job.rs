//! Synchronous execution of a single job.

use crate::protocol::{DecodedSheet, ExportOutput, JobRequest, JobResponse, ProcessOutput};
use costmerge_core::{default_export_name, merge, with_extension};
use costmerge_sheet::{decode, encode_with_options, EncodeOptions};

/// Run `request` to completion on the current thread.
///
/// Never fails: decode and merge errors become `process_error`, encode
/// errors become `error`.
pub fn run_job(request: JobRequest) -> JobResponse {
    match request {
        JobRequest::Decode { id, data } => match decode(&data) {
            Ok(dataset) => {
                tracing::debug!(%id, rows = dataset.len(), "decoded file");
                JobResponse::ProcessComplete {
                    id,
                    result: ProcessOutput::Decoded(DecodedSheet {
                        count: dataset.len(),
                        data: dataset,
                    }),
                }
            }
            Err(e) => JobResponse::ProcessError { id, error: e.to_string() },
        },

        JobRequest::Merge {
            id,
            cost_data,
            order_data,
            cost_merchant_code_field,
            order_merchant_code_field,
            cost_value_field,
        } => match merge(
            &cost_data,
            &order_data,
            &cost_merchant_code_field,
            &order_merchant_code_field,
            &cost_value_field,
        ) {
            Ok(result) => JobResponse::ProcessComplete {
                id,
                result: ProcessOutput::Merged(result),
            },
            Err(e) => JobResponse::ProcessError { id, error: e.to_string() },
        },

        JobRequest::Export {
            id,
            export_data,
            file_name,
            export_format,
            batch_size,
        } => {
            let options = batch_size.map_or_else(EncodeOptions::default, |n| EncodeOptions::default().with_batch_size(n));
            match encode_with_options(&export_data, export_format, &options) {
                Ok(data) => {
                    let file_name = file_name
                        .filter(|name| !name.trim().is_empty())
                        .map(|name| with_extension(&name, export_format))
                        .unwrap_or_else(|| default_export_name(export_format));
                    JobResponse::ExportComplete {
                        id,
                        result: ExportOutput {
                            data,
                            row_count: export_data.len(),
                        },
                        file_name,
                        export_format,
                    }
                }
                Err(e) => JobResponse::Error { id, error: e.to_string() },
            }
        }
    }
}
