//! Read-side projection over a merged dataset: match filter, search, paging.
//!
//! Nothing here mutates records. Every row in a [`Page`] carries the
//! [`RowId`] it has in the full dataset, so edits made from a filtered page
//! land on the right record.

use costmerge_sheet::{field, Record};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rows per page when none is given
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Stable identity of a row in a merge result: its position in the merged
/// dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub usize);

impl RowId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Match-status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchFilter {
    #[default]
    All,
    Matched,
    Unmatched,
}

impl FromStr for MatchFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(MatchFilter::All),
            "matched" => Ok(MatchFilter::Matched),
            "unmatched" => Ok(MatchFilter::Unmatched),
            other => Err(format!("Unknown filter: '{other}'")),
        }
    }
}

/// Field group a search is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchField {
    /// Every column
    #[default]
    All,
    ProductName,
    MerchantCode,
    SubOrderId,
}

impl SearchField {
    /// Column-name fragments that identify the group. `All` has none.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            SearchField::All => &[],
            SearchField::ProductName => &[
                "productName",
                "product",
                "product_name",
                "name",
                "goodsName",
                "goods_name",
                "商品名称",
                "名称",
                "商品",
                "品名",
            ],
            SearchField::MerchantCode => &[
                "merchantCode",
                "merchant_code",
                "merchantId",
                "merchant_id",
                "商家编码",
                "商家代码",
                "商户编码",
                "商户代码",
            ],
            SearchField::SubOrderId => &[
                "subOrderId",
                "sub_order_id",
                "orderItemId",
                "order_item_id",
                "子订单编号",
                "子订单号",
                "订单项编号",
            ],
        }
    }

    fn covers(self, column: &str) -> bool {
        let column = column.to_lowercase();
        self.aliases()
            .iter()
            .any(|alias| column.contains(&alias.to_lowercase()))
    }
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "all" => Ok(SearchField::All),
            "productname" | "product" => Ok(SearchField::ProductName),
            "merchantcode" | "merchant" => Ok(SearchField::MerchantCode),
            "suborderid" | "suborder" => Ok(SearchField::SubOrderId),
            other => Err(format!("Unknown search field: '{other}'")),
        }
    }
}

/// What to show of a merged dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewQuery {
    pub filter: MatchFilter,
    /// Case-insensitive substring; empty means no search
    pub search: String,
    pub search_field: SearchField,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        ViewQuery {
            filter: MatchFilter::All,
            search: String::new(),
            search_field: SearchField::All,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewQuery {
    #[must_use]
    pub fn with_filter(mut self, filter: MatchFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>, field: SearchField) -> Self {
        self.search = search.into();
        self.search_field = field;
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// One page of a projected dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub rows: Vec<(RowId, &'a Record)>,
    /// Page actually shown, after clamping
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    /// Rows passing the filter and search, over all pages
    pub filtered_total: usize,
}

/// Apply `query` to `data`, judging match status by `value_col`.
pub fn project<'a>(data: &'a [Record], value_col: &str, query: &ViewQuery) -> Page<'a> {
    let needle = query.search.trim().to_lowercase();

    let filtered: Vec<(RowId, &Record)> = data
        .iter()
        .enumerate()
        .filter(|(_, row)| passes_filter(row, value_col, query.filter))
        .filter(|(_, row)| needle.is_empty() || matches_search(row, &needle, query.search_field))
        .map(|(idx, row)| (RowId(idx), row))
        .collect();

    let page_size = query.page_size.max(1);
    let filtered_total = filtered.len();
    let page_count = filtered_total.div_ceil(page_size);
    let page = query.page.clamp(1, page_count.max(1));

    let rows = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        rows,
        page,
        page_size,
        page_count,
        filtered_total,
    }
}

fn passes_filter(row: &Record, value_col: &str, filter: MatchFilter) -> bool {
    let matched = !field(row, value_col).is_blank();
    match filter {
        MatchFilter::All => true,
        MatchFilter::Matched => matched,
        MatchFilter::Unmatched => !matched,
    }
}

fn matches_search(row: &Record, needle: &str, search_field: SearchField) -> bool {
    row.iter()
        .filter(|(column, _)| search_field == SearchField::All || search_field.covers(column))
        .any(|(_, value)| !value.is_null() && value.as_str().to_lowercase().contains(needle))
}
