//! Keyword heuristics over column names.
//!
//! All functions are pure: a list of column names in, at most one column name
//! out. Matching is a case-insensitive substring test and the first column (in
//! the order given) that contains any keyword wins.

/// Keywords marking a price/amount column in the order dataset.
pub const ANCHOR_KEYWORDS: &[&str] = &["price", "amount", "金额", "价格", "价值", "总价", "商品金额", "total"];

/// Keywords marking a merchant code column, used for both join keys.
pub const KEY_KEYWORDS: &[&str] = &["merchant", "商家", "商户", "code"];

/// Keywords marking the cost column of the cost dataset.
pub const VALUE_KEYWORDS: &[&str] = &["cost", "成本", "价格", "price"];

/// First column whose lowercased name contains one of `keywords`.
pub fn find_column<'a, I>(columns: I, keywords: &[&str]) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    columns.into_iter().find(|column| {
        let lower = column.to_lowercase();
        keywords.iter().any(|keyword| lower.contains(keyword))
    })
}

/// Column after which the joined value is placed.
///
/// # Example
/// ```
/// use costmerge_core::detect_anchor_column;
///
/// let columns = ["订单号", "商品金额", "Total"];
/// assert_eq!(detect_anchor_column(columns), Some("商品金额"));
/// assert_eq!(detect_anchor_column(["code", "qty"]), None);
/// ```
pub fn detect_anchor_column<'a, I>(columns: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    find_column(columns, ANCHOR_KEYWORDS)
}

/// Likely merchant-code column of either dataset.
pub fn suggest_key_column<'a, I>(columns: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    find_column(columns, KEY_KEYWORDS)
}

/// Likely cost column of the cost dataset.
pub fn suggest_value_column<'a, I>(columns: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    find_column(columns, VALUE_KEYWORDS)
}
