use crate::cell::CellValue;
use indexmap::{IndexMap, IndexSet};

/// One row as an insertion-ordered mapping from column name to value.
///
/// Key order is export column order.
pub type Record = IndexMap<String, CellValue>;

/// An ordered collection of records from one source.
pub type Dataset = Vec<Record>;

static NULL: CellValue = CellValue::Null;

/// Build a record from `(column, value)` pairs, keeping their order.
///
/// # Example
/// ```
/// use costmerge_sheet::{record, CellValue};
///
/// let row = record([("code", CellValue::from("A1")), ("amount", CellValue::Int(100))]);
/// assert_eq!(row.keys().collect::<Vec<_>>(), vec!["code", "amount"]);
/// ```
pub fn record<K, I>(pairs: I) -> Record
where
    K: Into<String>,
    I: IntoIterator<Item = (K, CellValue)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Value of `column` in `record`; an absent key reads as null.
#[must_use]
pub fn field<'a>(record: &'a Record, column: &str) -> &'a CellValue {
    record.get(column).unwrap_or(&NULL)
}

/// Union of the keys of every record, in first-seen order.
///
/// The whole dataset is scanned, not just the first row, so sparse rows
/// still contribute their columns.
#[must_use]
pub fn collect_headers(dataset: &[Record]) -> Vec<String> {
    let mut headers: IndexSet<&str> = IndexSet::new();
    for row in dataset {
        for key in row.keys() {
            headers.insert(key.as_str());
        }
    }
    headers.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_absent_is_null() {
        let row = record([("a", CellValue::Int(1))]);
        assert_eq!(field(&row, "a"), &CellValue::Int(1));
        assert_eq!(field(&row, "missing"), &CellValue::Null);
    }

    #[test]
    fn test_collect_headers_first_seen_order() {
        let rows = vec![
            record([("b", CellValue::Int(1)), ("a", CellValue::Int(2))]),
            record([("a", CellValue::Int(3)), ("c", CellValue::Int(4))]),
            record([("d", CellValue::Null), ("b", CellValue::Null)]),
        ];
        assert_eq!(collect_headers(&rows), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_collect_headers_empty() {
        assert!(collect_headers(&[]).is_empty());
    }
}
