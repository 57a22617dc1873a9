//! Cost/order join with deterministic column placement.

use crate::detect::detect_anchor_column;
use crate::error::JoinError;
use costmerge_sheet::{field, CellValue, Dataset, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column selection for a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeColumns {
    /// Join key column in the cost dataset
    pub cost_key: String,
    /// Join key column in the order dataset
    pub order_key: String,
    /// Cost column carried into the output
    pub value: String,
}

impl MergeColumns {
    pub fn new(cost_key: impl Into<String>, order_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            cost_key: cost_key.into(),
            order_key: order_key.into(),
            value: value.into(),
        }
    }
}

/// Output of [`merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    /// One record per order record, in order
    pub data: Dataset,
    /// Records whose value column is neither null nor empty
    pub matched: usize,
    pub total: usize,
    pub unmatched_count: usize,
    pub cost_count: usize,
    pub order_count: usize,
    /// Name of the joined value column
    pub value_column: String,
    /// Column the value was placed after, if one was detected
    pub anchor_column: Option<String>,
}

/// Join `order` against `cost` and carry the cost value into every order record.
///
/// Keys on both sides are compared after stringifying, lowercasing and
/// trimming; null or blank keys never match. When the cost dataset holds the
/// same key more than once, the later record wins.
///
/// The value column is placed after the anchor column detected from the
/// first order record, or appended when there is none. An order record that
/// already has a column with the value column's name keeps it in place and
/// gets the joined value.
///
/// # Errors
///
/// [`JoinError::InvalidParameters`] when either dataset is empty or a column
/// name is blank.
///
/// # Example
/// ```
/// use costmerge_core::merge;
/// use costmerge_sheet::{record, CellValue};
///
/// let cost = vec![record([("code", CellValue::from("A1")), ("cost", CellValue::Int(9))])];
/// let order = vec![record([("code", CellValue::from(" a1 ")), ("amount", CellValue::Int(100))])];
///
/// let result = merge(&cost, &order, "code", "code", "cost").unwrap();
/// assert_eq!(result.matched, 1);
/// assert_eq!(result.data[0]["cost"], CellValue::Int(9));
/// ```
pub fn merge(
    cost: &[Record],
    order: &[Record],
    cost_key: &str,
    order_key: &str,
    value_col: &str,
) -> Result<JoinResult, JoinError> {
    if cost.is_empty() {
        return Err(JoinError::invalid("cost dataset is empty"));
    }
    if order.is_empty() {
        return Err(JoinError::invalid("order dataset is empty"));
    }
    for (label, column) in [("cost key", cost_key), ("order key", order_key), ("value", value_col)] {
        if column.trim().is_empty() {
            return Err(JoinError::invalid(format!("{label} column not specified")));
        }
    }

    let index = build_index(cost, cost_key, value_col);
    let anchor = order
        .first()
        .and_then(|first| detect_anchor_column(first.keys().map(String::as_str)))
        .map(str::to_string);

    let data: Dataset = order
        .iter()
        .map(|row| {
            let value = field(row, order_key)
                .join_key()
                .and_then(|key| index.get(&key).cloned())
                .unwrap_or(CellValue::Null);
            place_value(row, anchor.as_deref(), value_col, value)
        })
        .collect();

    let total = data.len();
    let matched = data.iter().filter(|row| !field(row, value_col).is_blank()).count();

    tracing::info!(
        index_size = index.len(),
        anchor = anchor.as_deref().unwrap_or("<append>"),
        matched,
        total,
        "merged datasets"
    );

    Ok(JoinResult {
        data,
        matched,
        total,
        unmatched_count: total - matched,
        cost_count: cost.len(),
        order_count: order.len(),
        value_column: value_col.to_string(),
        anchor_column: anchor,
    })
}

/// Normalized key -> value lookup; later records overwrite earlier ones.
fn build_index(cost: &[Record], key_col: &str, value_col: &str) -> HashMap<String, CellValue> {
    let mut index = HashMap::with_capacity(cost.len());
    for row in cost {
        if let Some(key) = field(row, key_col).join_key() {
            index.insert(key, field(row, value_col).clone());
        }
    }
    index
}

/// Copy `row` with `value` stored under `value_col`.
///
/// Position: an existing `value_col` key keeps its slot; otherwise the key
/// goes right after `anchor` when the row has it, else at the end.
fn place_value(row: &Record, anchor: Option<&str>, value_col: &str, value: CellValue) -> Record {
    if row.contains_key(value_col) {
        let mut out = row.clone();
        out.insert(value_col.to_string(), value);
        return out;
    }

    let mut out = Record::with_capacity(row.len() + 1);
    let mut pending = Some(value);
    for (key, cell) in row {
        out.insert(key.clone(), cell.clone());
        if anchor == Some(key.as_str()) {
            if let Some(value) = pending.take() {
                out.insert(value_col.to_string(), value);
            }
        }
    }
    if let Some(value) = pending {
        out.insert(value_col.to_string(), value);
    }
    out
}
