//! Output file naming.

use chrono::{Local, NaiveDateTime};
use costmerge_sheet::ExportFormat;

/// Prefix of every export file name ("merged data")
pub const EXPORT_PREFIX: &str = "合并数据";

/// File name without extension, e.g. `合并数据_20250301_0930`.
#[must_use]
pub fn export_file_stem(at: NaiveDateTime) -> String {
    format!("{EXPORT_PREFIX}_{}", at.format("%Y%m%d_%H%M"))
}

/// File name for an export created at `at`.
#[must_use]
pub fn export_file_name(at: NaiveDateTime, format: ExportFormat) -> String {
    format!("{}.{}", export_file_stem(at), format.extension())
}

/// File name for an export created now, in local time.
#[must_use]
pub fn default_export_name(format: ExportFormat) -> String {
    export_file_name(Local::now().naive_local(), format)
}

/// Give `name` the format's extension.
///
/// A name already ending in the right extension is kept as is; one ending in
/// the other export extension has it swapped. Anything else gets the
/// extension appended.
#[must_use]
pub fn with_extension(name: &str, format: ExportFormat) -> String {
    let lower = name.to_ascii_lowercase();
    let suffix = format!(".{}", format.extension());
    if lower.ends_with(&suffix) {
        return name.to_string();
    }

    let stem = [ExportFormat::Xlsx, ExportFormat::Csv]
        .iter()
        .map(|other| format!(".{}", other.extension()))
        .find(|other| lower.ends_with(other.as_str()))
        .map_or(name, |other| &name[..name.len() - other.len()]);
    format!("{stem}{suffix}")
}
