use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest integer a spreadsheet number can hold without losing precision.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A scalar cell value: null, a number, or a string.
///
/// Numbers keep two representations so integral values survive a round trip
/// through CSV without growing a fractional part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    String(String),
}

impl CellValue {
    /// Build a number, folding integral floats into `Int`.
    #[must_use]
    pub fn number(f: f64) -> Self {
        if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
            CellValue::Int(f as i64)
        } else {
            CellValue::Float(f)
        }
    }

    /// Check if the value is null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Null or the empty string.
    ///
    /// This is the "no value" test used for match statistics.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Get the value as a string. Null renders as the empty string.
    #[must_use]
    pub fn as_str(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::String(s) => s.clone(),
        }
    }

    /// Normalized join key: stringified, lowercased and trimmed.
    ///
    /// Returns `None` for null cells and for keys that are empty after
    /// trimming.
    #[must_use]
    pub fn join_key(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        let key = self.as_str().to_lowercase().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    /// Parse user input into a value.
    /// Tries: empty -> null, int -> float -> string
    #[must_use]
    pub fn parse(s: &str) -> CellValue {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Null;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Int(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }

        CellValue::String(s.to_string())
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(fl) => write!(f, "{fl}"),
            CellValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i64::from(i))
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_folds_integral_floats() {
        assert_eq!(CellValue::number(100.0), CellValue::Int(100));
        assert_eq!(CellValue::number(-3.0), CellValue::Int(-3));
        assert_eq!(CellValue::number(2.5), CellValue::Float(2.5));
        assert_eq!(CellValue::number(1e300), CellValue::Float(1e300));
    }

    #[test]
    fn test_is_blank() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::String(String::new()).is_blank());
        assert!(!CellValue::String(" ".to_string()).is_blank());
        assert!(!CellValue::Int(0).is_blank());
    }

    #[test]
    fn test_as_str_renders_numbers_plainly() {
        assert_eq!(CellValue::Int(42).as_str(), "42");
        assert_eq!(CellValue::Float(0.5).as_str(), "0.5");
        assert_eq!(CellValue::Float(100.0).as_str(), "100");
        assert_eq!(CellValue::Null.as_str(), "");
    }

    #[test]
    fn test_join_key() {
        assert_eq!(
            CellValue::from(" ABC ").join_key(),
            Some("abc".to_string())
        );
        assert_eq!(CellValue::Int(7).join_key(), Some("7".to_string()));
        assert_eq!(CellValue::from("   ").join_key(), None);
        assert_eq!(CellValue::Null.join_key(), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse("42"), CellValue::Int(42));
        assert_eq!(CellValue::parse("-2.5"), CellValue::Float(-2.5));
        assert_eq!(CellValue::parse("n/a"), CellValue::String("n/a".to_string()));
        assert_eq!(CellValue::parse("inf"), CellValue::String("inf".to_string()));
    }

    #[test]
    fn test_json_shape() {
        let values = vec![
            CellValue::Null,
            CellValue::Int(5),
            CellValue::Float(1.5),
            CellValue::from("x"),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,5,1.5,"x"]"#);

        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
