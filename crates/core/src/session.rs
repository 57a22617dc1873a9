//! Interactive-side merge state.
//!
//! A [`MergeSession`] owns the uploaded datasets, the selected columns and the
//! latest merge result. Heavy work (decode, merge, encode) happens elsewhere;
//! the session only hands out copies of what a job needs and takes results
//! back. Cell edits adjust the match counters by delta instead of re-running
//! the join.

use crate::detect::{suggest_key_column, suggest_value_column};
use crate::error::SessionError;
use crate::join::{JoinResult, MergeColumns};
use crate::view::{project, Page, RowId, ViewQuery};
use costmerge_sheet::{collect_headers, field, CellValue, Dataset, Record};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which upload a dataset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Cost,
    Order,
}

impl Slot {
    fn label(self) -> &'static str {
        match self {
            Slot::Cost => "cost",
            Slot::Order => "order",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub cost_count: usize,
    pub order_count: usize,
    pub total: usize,
    pub matched_count: usize,
    pub unmatched_count: usize,
}

/// Everything a merge job needs, copied out of the session.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub cost: Dataset,
    pub order: Dataset,
    pub columns: MergeColumns,
}

#[derive(Debug, Clone)]
struct Merged {
    data: Dataset,
    value_column: String,
    anchor_column: Option<String>,
}

/// State of one cost/order merge session
#[derive(Debug, Clone, Default)]
pub struct MergeSession {
    cost: Option<Dataset>,
    order: Option<Dataset>,
    columns: MergeColumns,
    merged: Option<Merged>,
    stats: MergeStats,
}

impl MergeSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly decoded dataset.
    ///
    /// Drops any previous merge result, since it no longer reflects the
    /// inputs. The slot's columns are re-suggested from the new headers; a
    /// selection with no suggestion survives only if the new dataset still
    /// has that column.
    pub fn load(&mut self, slot: Slot, dataset: Dataset) {
        let headers = collect_headers(&dataset);
        let names = || headers.iter().map(String::as_str);

        match slot {
            Slot::Cost => {
                reselect(&mut self.columns.cost_key, suggest_key_column(names()), &headers);
                reselect(&mut self.columns.value, suggest_value_column(names()), &headers);
                self.stats.cost_count = dataset.len();
                self.cost = Some(dataset);
            }
            Slot::Order => {
                reselect(&mut self.columns.order_key, suggest_key_column(names()), &headers);
                self.stats.order_count = dataset.len();
                self.order = Some(dataset);
            }
        }

        self.clear_result();
        tracing::debug!(%slot, rows = self.stats_for(slot), "dataset loaded");
    }

    fn stats_for(&self, slot: Slot) -> usize {
        match slot {
            Slot::Cost => self.stats.cost_count,
            Slot::Order => self.stats.order_count,
        }
    }

    #[must_use]
    pub fn dataset(&self, slot: Slot) -> Option<&Dataset> {
        match slot {
            Slot::Cost => self.cost.as_ref(),
            Slot::Order => self.order.as_ref(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &MergeColumns {
        &self.columns
    }

    pub fn set_cost_key(&mut self, column: impl Into<String>) {
        self.columns.cost_key = column.into();
    }

    pub fn set_order_key(&mut self, column: impl Into<String>) {
        self.columns.order_key = column.into();
    }

    pub fn set_value_column(&mut self, column: impl Into<String>) {
        self.columns.value = column.into();
    }

    /// Both datasets are loaded and non-empty and every column is selected.
    #[must_use]
    pub fn can_merge(&self) -> bool {
        self.merge_request().is_ok()
    }

    /// Copy out the inputs of a merge job.
    pub fn merge_request(&self) -> Result<MergeRequest, SessionError> {
        let cost = self
            .cost
            .as_ref()
            .filter(|d| !d.is_empty())
            .ok_or(SessionError::MissingDataset("cost"))?;
        let order = self
            .order
            .as_ref()
            .filter(|d| !d.is_empty())
            .ok_or(SessionError::MissingDataset("order"))?;

        if self.columns.cost_key.trim().is_empty() {
            return Err(SessionError::MissingColumn("cost key"));
        }
        if self.columns.order_key.trim().is_empty() {
            return Err(SessionError::MissingColumn("order key"));
        }
        if self.columns.value.trim().is_empty() {
            return Err(SessionError::MissingColumn("value"));
        }

        Ok(MergeRequest {
            cost: cost.clone(),
            order: order.clone(),
            columns: self.columns.clone(),
        })
    }

    /// Adopt a finished merge.
    pub fn apply_result(&mut self, result: JoinResult) {
        self.stats = MergeStats {
            cost_count: result.cost_count,
            order_count: result.order_count,
            total: result.total,
            matched_count: result.matched,
            unmatched_count: result.unmatched_count,
        };
        self.merged = Some(Merged {
            data: result.data,
            value_column: result.value_column,
            anchor_column: result.anchor_column,
        });
    }

    #[must_use]
    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Merged records, if a result has been applied.
    #[must_use]
    pub fn result(&self) -> Option<&[Record]> {
        self.merged.as_ref().map(|m| m.data.as_slice())
    }

    #[must_use]
    pub fn anchor_column(&self) -> Option<&str> {
        self.merged.as_ref().and_then(|m| m.anchor_column.as_deref())
    }

    #[must_use]
    pub fn value_column(&self) -> Option<&str> {
        self.merged.as_ref().map(|m| m.value_column.as_str())
    }

    /// Set the joined value of one row.
    ///
    /// Moving a row between blank and non-blank shifts one count between
    /// matched and unmatched; the join is not re-run.
    pub fn update_value(&mut self, row: RowId, value: CellValue) -> Result<(), SessionError> {
        let merged = self.merged.as_mut().ok_or(SessionError::NoResult)?;
        let count = merged.data.len();
        let record = merged
            .data
            .get_mut(row.index())
            .ok_or(SessionError::UnknownRow { row: row.index(), count })?;

        let was_matched = !field(record, &merged.value_column).is_blank();
        let now_matched = !value.is_blank();
        record.insert(merged.value_column.clone(), value);

        match (was_matched, now_matched) {
            (false, true) => {
                self.stats.matched_count += 1;
                self.stats.unmatched_count -= 1;
            }
            (true, false) => {
                self.stats.matched_count -= 1;
                self.stats.unmatched_count += 1;
            }
            _ => {}
        }

        tracing::debug!(%row, was_matched, now_matched, "value updated");
        Ok(())
    }

    /// Filtered, searched page of the merge result.
    pub fn view(&self, query: &ViewQuery) -> Result<Page<'_>, SessionError> {
        let merged = self.merged.as_ref().ok_or(SessionError::NoResult)?;
        Ok(project(&merged.data, &merged.value_column, query))
    }

    fn clear_result(&mut self) {
        self.merged = None;
        self.stats.total = 0;
        self.stats.matched_count = 0;
        self.stats.unmatched_count = 0;
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn reselect(selected: &mut String, suggestion: Option<&str>, headers: &[String]) {
    match suggestion {
        Some(column) => *selected = column.to_string(),
        None if !headers.contains(&*selected) => selected.clear(),
        None => {}
    }
}
