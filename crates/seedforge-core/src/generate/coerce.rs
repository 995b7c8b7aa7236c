use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::generate::value::Value;
use crate::schema::types::{Column, SqlType};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Interpret a textual literal as a value of `column`'s type.
///
/// Returns `None` when the literal does not parse for that type.
pub fn coerce_literal(column: &Column, literal: &str) -> Option<Value> {
    let raw = literal.trim();

    if column.holds_uuid() {
        return Uuid::parse_str(raw).ok().map(Value::Uuid);
    }

    match &column.sql_type {
        SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => parse_integer(raw).map(Value::Int),
        SqlType::Decimal { scale, .. } => raw.parse::<f64>().ok().map(|v| Value::Decimal {
            value: v,
            scale: scale.unwrap_or(0),
        }),
        SqlType::Real | SqlType::Double => raw.parse::<f64>().ok().map(Value::Float),
        SqlType::Boolean => parse_bool(raw).map(Value::Bool),
        SqlType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Value::Date),
        SqlType::Time => NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
            .map(Value::Time),
        SqlType::Timestamp | SqlType::TimestampTz => parse_timestamp(raw).map(Value::Timestamp),
        SqlType::Json => serde_json::from_str(raw).ok().map(Value::Json),
        SqlType::Uuid => Uuid::parse_str(raw).ok().map(Value::Uuid),
        SqlType::Char { .. }
        | SqlType::VarChar { .. }
        | SqlType::Text
        | SqlType::Binary
        | SqlType::Other { .. } => Some(Value::Text(literal.to_string())),
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e18)
            .map(|f| f as i64)
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_and_booleans_parse_from_strings() {
        let col = Column::new("flag", SqlType::Integer);
        assert_eq!(coerce_literal(&col, "42"), Some(Value::Int(42)));
        assert_eq!(coerce_literal(&col, "3.0"), Some(Value::Int(3)));
        assert_eq!(coerce_literal(&col, "yes"), None);

        let col = Column::new("deleted", SqlType::Boolean);
        assert_eq!(coerce_literal(&col, "TRUE"), Some(Value::Bool(true)));
        assert_eq!(coerce_literal(&col, "0"), Some(Value::Bool(false)));
        assert_eq!(coerce_literal(&col, "maybe"), None);
    }

    #[test]
    fn test_temporal_literals() {
        let col = Column::new("deleted_at", SqlType::Timestamp);
        assert!(matches!(
            coerce_literal(&col, "2024-01-02 03:04:05"),
            Some(Value::Timestamp(_))
        ));
        assert!(matches!(
            coerce_literal(&col, "2024-01-02"),
            Some(Value::Timestamp(_))
        ));
        let col = Column::new("d", SqlType::Date);
        assert_eq!(coerce_literal(&col, "nope"), None);
    }

    #[test]
    fn test_uuid_override_parses_text_column() {
        let col = Column::new("ref", SqlType::Char { length: Some(36) }).with_uuid_override(true);
        let v = coerce_literal(&col, "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert!(matches!(v, Some(Value::Uuid(_))));
        assert_eq!(coerce_literal(&col, "not-a-uuid"), None);
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let col = Column::new(
            "price",
            SqlType::Decimal {
                precision: Some(8),
                scale: Some(2),
            },
        );
        assert_eq!(
            coerce_literal(&col, "9.5"),
            Some(Value::Decimal {
                value: 9.5,
                scale: 2
            })
        );
    }
}
