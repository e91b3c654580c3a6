use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque cell value.
///
/// The sync engine never interprets cell content: it only compares values
/// for structural equality and serializes them as JSON (`null`, bool,
/// number, string, array, object). Every JSON value deserializes into some
/// variant, so an unexpected cell never fails a whole fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value (`null`).
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Nested structure, compared element by element.
    Nested(Vec<CellValue>),
    /// JSON object, kept verbatim.
    Object(Map<String, Value>),
}

impl CellValue {
    /// Convert user-typed text into a value.
    ///
    /// - Empty (after trimming) → [`CellValue::Empty`]
    /// - "true"/"false" (case-insensitive) → [`CellValue::Bool`]
    /// - Parseable as f64 → [`CellValue::Number`]
    /// - Otherwise → [`CellValue::Text`] (untrimmed)
    #[must_use]
    pub fn parse_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Self::Number(n);
            }
        }
        Self::Text(input.to_string())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<CellValue>> for CellValue {
    fn from(values: Vec<CellValue>) -> Self {
        Self::Nested(values)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_detects_types() {
        let cases = [
            ("", CellValue::Empty),
            ("   ", CellValue::Empty),
            ("TRUE", CellValue::Bool(true)),
            ("false", CellValue::Bool(false)),
            ("42.5", CellValue::Number(42.5)),
            ("-3", CellValue::Number(-3.0)),
            ("hello", CellValue::Text("hello".into())),
            ("inf", CellValue::Text("inf".into())),
        ];

        for (input, expected) in cases {
            assert_eq!(CellValue::parse_input(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_json_shape() {
        let value = CellValue::Nested(vec![
            CellValue::Empty,
            CellValue::Bool(true),
            CellValue::Number(1.5),
            CellValue::from("x"),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[null,true,1.5,"x"]"#);
    }

    #[test]
    fn test_integers_deserialize_as_numbers() {
        let value: CellValue = serde_json::from_str("7").unwrap();
        assert_eq!(value, CellValue::Number(7.0));
    }

    #[test]
    fn test_object_cell_is_kept_verbatim() {
        let value: CellValue = serde_json::from_str(r#"{"k": 1}"#).unwrap();
        let CellValue::Object(map) = &value else {
            panic!("expected an object cell, got {value:?}");
        };
        assert_eq!(map.get("k"), Some(&Value::from(1)));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"k":1}"#);
    }

    #[test]
    fn test_nested_equality_is_structural() {
        let a = CellValue::Nested(vec!["a".into(), CellValue::Nested(vec![1.into()])]);
        let b = CellValue::Nested(vec!["a".into(), CellValue::Nested(vec![1.into()])]);
        let c = CellValue::Nested(vec!["a".into(), CellValue::Nested(vec![2.into()])]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
