use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Declared value type of a column, used to pick the sort comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
}

/// A single cell value read from a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Null,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Numeric view of the value. Strings are parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DataValue::Integer(i) => Some(*i as f64),
            DataValue::Float(f) if f.is_finite() => Some(*f),
            DataValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Boolean(b) => Some(*b),
            DataValue::Integer(0) => Some(false),
            DataValue::Integer(1) => Some(true),
            DataValue::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("no") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            DataValue::DateTime(dt) => Some(*dt),
            DataValue::String(s) => parse_datetime(s.trim()),
            _ => None,
        }
    }

    /// Coerce this value into the declared column type, if possible
    pub fn coerce(&self, value_type: ValueType) -> Option<DataValue> {
        match value_type {
            ValueType::Text => match self {
                DataValue::Null => None,
                other => Some(DataValue::String(other.to_string())),
            },
            ValueType::Number => self.as_number().map(DataValue::Float),
            ValueType::Boolean => self.as_bool().map(DataValue::Boolean),
            ValueType::Date => self.as_datetime().map(DataValue::DateTime),
        }
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::String(s) => write!(f, "{}", s),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Boolean(b) => write!(f, "{}", if *b { "Yes" } else { "No" }),
            DataValue::DateTime(dt) => {
                // Midnight timestamps are plain dates
                if dt.num_seconds_from_midnight() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M"))
                }
            }
            DataValue::Null => write!(f, ""),
        }
    }
}

impl From<&JsonValue> for DataValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => DataValue::Null,
            JsonValue::Bool(b) => DataValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DataValue::Integer(i)
                } else {
                    n.as_f64().map(DataValue::Float).unwrap_or(DataValue::Null)
                }
            }
            JsonValue::String(s) => DataValue::String(s.clone()),
            other => DataValue::String(other.to_string()),
        }
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Integer(i)
    }
}

impl From<f64> for DataValue {
    fn from(f: f64) -> Self {
        DataValue::Float(f)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Boolean(b)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DataValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_displays_as_empty() {
        assert_eq!(DataValue::Null.to_string(), "");
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(DataValue::from(&json!(42)), DataValue::Integer(42));
        assert_eq!(DataValue::from(&json!(1.5)), DataValue::Float(1.5));
        assert_eq!(DataValue::from(&json!(null)), DataValue::Null);
        assert_eq!(DataValue::from(&json!("x")), DataValue::String("x".into()));
    }

    #[test]
    fn test_numeric_strings_coerce() {
        assert_eq!(DataValue::from(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(DataValue::from("twelve").as_number(), None);
    }

    #[test]
    fn test_date_parsing_and_display() {
        let v = DataValue::from("2024-03-01");
        let dt = v.as_datetime().unwrap();
        assert_eq!(DataValue::DateTime(dt).to_string(), "2024-03-01");

        let v = DataValue::from("2024-03-01T09:30:00Z");
        assert_eq!(
            DataValue::DateTime(v.as_datetime().unwrap()).to_string(),
            "2024-03-01 09:30"
        );
    }

    #[test]
    fn test_boolean_display() {
        assert_eq!(DataValue::Boolean(true).to_string(), "Yes");
        assert_eq!(DataValue::Boolean(false).to_string(), "No");
    }
}
