use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated row, columns in table order.
pub type Row = IndexMap<String, Value>;

/// A generated value for a database column.
///
/// Emitters match on this exhaustively; `UseDefault` asks the target
/// database to apply the column's declared default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    UseDefault,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Fixed-point number; `scale` digits are kept when rendering.
    Decimal {
        value: f64,
        scale: u32,
    },
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    /// String representation for uniqueness tracking.
    pub fn to_unique_key(&self) -> String {
        match self {
            Value::Null => "__NULL__".to_string(),
            Value::UseDefault => "__DEFAULT__".to_string(),
            Value::Float(f) => format!("{:.10}", f),
            other => other.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or a deferred-to-database default: no concrete value yet.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Null | Value::UseDefault)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used by bound checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// JSON representation for the JSON emitter.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::UseDefault => J::String("DEFAULT".to_string()),
            Value::Bool(b) => J::Bool(*b),
            Value::Int(i) => J::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(J::Number)
                .unwrap_or(J::Null),
            Value::Decimal { .. } => J::String(self.to_string()),
            Value::Json(j) => j.clone(),
            other => J::String(other.to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::UseDefault => write!(f, "DEFAULT"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Decimal { value, scale } => write!(f, "{:.*}", *scale as usize, value),
            Value::Text(s) => write!(f, "{}", s),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Json(j) => write!(f, "{}", j),
            Value::Bytes(b) => write!(f, "{}", hex_encode(b)),
        }
    }
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_display_keeps_scale() {
        let v = Value::Decimal {
            value: 12.5,
            scale: 2,
        };
        assert_eq!(v.to_string(), "12.50");
        assert_eq!(v.as_f64(), Some(12.5));
    }

    #[test]
    fn test_absent_values() {
        assert!(Value::Null.is_absent());
        assert!(Value::UseDefault.is_absent());
        assert!(!Value::Int(0).is_absent());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Int(3).to_json(), serde_json::json!(3));
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
        assert_eq!(
            Value::Text("x".to_string()).to_json(),
            serde_json::json!("x")
        );
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).to_json(), serde_json::json!("ab01"));
    }
}
