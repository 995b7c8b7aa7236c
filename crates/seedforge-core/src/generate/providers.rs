//! # Value Generator
//!
//! Produces one typed value for a column from its declared type, its
//! inferred `ParsedConstraint` and the row index. Resolution order:
//!
//! 1. soft-delete columns resolve to the schema default or a configured literal
//! 2. nullable columns are null with the configured probability
//! 3. a non-empty allowed-value set is sampled uniformly
//! 4. UUID columns get a fresh UUID, unique across the whole run
//! 5. everything else dispatches on the SQL type
//!
//! `base_time` on the context anchors all temporal values so a seeded run
//! is reproducible regardless of when it executes.

use chrono::Duration as ChronoDuration;
use rand::Rng;
use uuid::Uuid;

use crate::constraint::ParsedConstraint;
use crate::generate::coerce::coerce_literal;
use crate::generate::context::GenerationContext;
use crate::generate::value::Value;
use crate::schema::types::{Column, SqlType, TypeCategory};

const DEFAULT_INT_MIN: f64 = 1.0;
const DEFAULT_INT_MAX: f64 = 10_000.0;
const DEFAULT_FLOAT_MIN: f64 = 0.0;
const DEFAULT_FLOAT_SPAN: f64 = 1_000.0;
const PAST_WINDOW_DAYS: i64 = 730;
const FUTURE_WINDOW_DAYS: i64 = 30;
const UUID_RETRIES: usize = 16;
/// Largest scale honoured exactly; f64 loses digits beyond it.
const MAX_DECIMAL_SCALE: u32 = 12;

/// Generate a value for `column`. `distinct` requests values that differ by
/// row index (primary and unique keys).
pub fn generate_column_value(
    column: &Column,
    constraint: &ParsedConstraint,
    row_index: usize,
    distinct: bool,
    ctx: &mut GenerationContext,
) -> Value {
    let soft_delete = &ctx.options.soft_delete;
    if soft_delete.matches(&column.name) {
        return soft_delete_value(column, soft_delete.value.as_deref());
    }

    if column.nullable && !column.primary_key {
        let p = ctx.null_probability();
        if ctx.rng.random_bool(p) {
            return Value::Null;
        }
    }

    if !constraint.allowed_values.is_empty() {
        return pick_allowed(column, constraint, ctx);
    }

    if column.holds_uuid() {
        return fresh_uuid(ctx);
    }

    generate_typed(column, constraint, row_index, distinct, ctx)
}

/// The value a soft-delete column takes: the schema default when no literal
/// is configured, otherwise the literal coerced to the column type (null if
/// it does not parse).
pub fn soft_delete_value(column: &Column, literal: Option<&str>) -> Value {
    match literal {
        None => Value::UseDefault,
        Some(lit) => coerce_literal(column, lit).unwrap_or_else(|| {
            tracing::debug!(
                column = %column.name,
                literal = lit,
                "Soft-delete literal does not fit column type, using NULL"
            );
            Value::Null
        }),
    }
}

fn pick_allowed(column: &Column, constraint: &ParsedConstraint, ctx: &mut GenerationContext) -> Value {
    let values = &constraint.allowed_values;

    if column.holds_uuid() {
        let parsed: Vec<Uuid> = values
            .iter()
            .filter_map(|v| Uuid::parse_str(v.trim()).ok())
            .collect();
        if parsed.is_empty() {
            tracing::warn!(
                column = %column.name,
                "Allowed values are not UUID literals, generating fresh UUIDs"
            );
            return fresh_uuid(ctx);
        }
        let unused: Vec<Uuid> = parsed
            .iter()
            .copied()
            .filter(|u| !ctx.used_uuids.contains(u))
            .collect();
        let pool = if unused.is_empty() {
            tracing::warn!(column = %column.name, "Every allowed UUID is already in use");
            &parsed
        } else {
            &unused
        };
        let id = pool[ctx.rng.random_range(0..pool.len())];
        ctx.used_uuids.insert(id);
        return Value::Uuid(id);
    }

    let idx = ctx.rng.random_range(0..values.len());
    let literal = &values[idx];
    coerce_literal(column, literal).unwrap_or_else(|| Value::Text(literal.clone()))
}

/// A random UUID not yet emitted in this run.
pub fn fresh_uuid(ctx: &mut GenerationContext) -> Value {
    let mut id = Uuid::nil();
    for _ in 0..UUID_RETRIES {
        id = uuid::Builder::from_random_bytes(ctx.rng.random()).into_uuid();
        if ctx.used_uuids.insert(id) {
            return Value::Uuid(id);
        }
    }
    tracing::warn!(%id, "UUID collision retries exhausted");
    Value::Uuid(id)
}

fn generate_typed(
    column: &Column,
    constraint: &ParsedConstraint,
    row_index: usize,
    distinct: bool,
    ctx: &mut GenerationContext,
) -> Value {
    if column.auto_increment && column.sql_type.is_integer() {
        return Value::Int(
            ctx.options
                .sequence_offset
                .saturating_add(row_index as i64 + 1),
        );
    }

    match column.sql_type.category() {
        TypeCategory::Numeric => generate_number(column, constraint, row_index, distinct, ctx),
        TypeCategory::Text => generate_text(column, constraint, row_index, distinct, ctx),
        TypeCategory::Boolean => Value::Bool(ctx.rng.random_bool(0.5)),
        TypeCategory::Temporal => generate_temporal(&column.sql_type, ctx),
        TypeCategory::Other => match &column.sql_type {
            SqlType::Json => generate_json(ctx),
            SqlType::Binary => Value::Bytes(ctx.rng.random::<[u8; 16]>().to_vec()),
            SqlType::Uuid => fresh_uuid(ctx),
            _ => {
                let word = ctx.options.words.pick(&mut ctx.rng);
                if distinct {
                    Value::Text(format!("{}_{}", word, row_index))
                } else {
                    Value::Text(word)
                }
            }
        },
    }
}

fn generate_number(
    column: &Column,
    constraint: &ParsedConstraint,
    row_index: usize,
    distinct: bool,
    ctx: &mut GenerationContext,
) -> Value {
    match &column.sql_type {
        t if t.is_integer() => generate_integer(column, constraint, row_index, distinct, ctx),
        SqlType::Decimal { precision, scale } => {
            generate_decimal(*precision, scale.unwrap_or(0), constraint, ctx)
        }
        _ => generate_float(constraint, ctx),
    }
}

/// Inclusive integer bounds: `ceil(min)..=floor(max)`, clamped to the type.
fn integer_bounds(column: &Column, constraint: &ParsedConstraint) -> (i64, i64) {
    let (type_lo, type_hi) = column
        .sql_type
        .integer_range()
        .unwrap_or((i64::MIN, i64::MAX));

    let (lo, hi) = match (constraint.min.map(f64::ceil), constraint.max.map(f64::floor)) {
        (Some(l), Some(h)) => (l, h),
        (Some(l), None) => (l, l + (DEFAULT_INT_MAX - DEFAULT_INT_MIN)),
        (None, Some(h)) if h >= DEFAULT_INT_MIN => (DEFAULT_INT_MIN, h),
        (None, Some(h)) => (h - (DEFAULT_INT_MAX - DEFAULT_INT_MIN), h),
        (None, None) => (DEFAULT_INT_MIN, DEFAULT_INT_MAX),
    };

    let clamp = |v: f64| v.max(type_lo as f64).min(type_hi as f64) as i64;
    let (lo, hi) = (clamp(lo), clamp(hi));
    if lo > hi {
        tracing::warn!(
            column = %column.name,
            min = lo,
            max = hi,
            "Conflicting integer bounds. Widening."
        );
        return (lo, lo.saturating_add(100).min(type_hi));
    }
    (lo, hi)
}

fn generate_integer(
    column: &Column,
    constraint: &ParsedConstraint,
    row_index: usize,
    distinct: bool,
    ctx: &mut GenerationContext,
) -> Value {
    let (lo, hi) = integer_bounds(column, constraint);
    if distinct {
        let sequential = lo.saturating_add(row_index as i64);
        if sequential <= hi {
            return Value::Int(sequential);
        }
    }
    Value::Int(ctx.rng.random_range(lo..=hi))
}

fn float_bounds(constraint: &ParsedConstraint) -> (f64, f64) {
    match (constraint.min, constraint.max) {
        (Some(l), Some(h)) => (l, h),
        (Some(l), None) => (l, l + DEFAULT_FLOAT_SPAN),
        (None, Some(h)) if h >= DEFAULT_FLOAT_MIN => (DEFAULT_FLOAT_MIN, h),
        (None, Some(h)) => (h - DEFAULT_FLOAT_SPAN, h),
        (None, None) => (DEFAULT_FLOAT_MIN, DEFAULT_FLOAT_MIN + DEFAULT_FLOAT_SPAN),
    }
}

fn generate_float(constraint: &ParsedConstraint, ctx: &mut GenerationContext) -> Value {
    let (lo, mut hi) = float_bounds(constraint);
    if !lo.is_finite() || !hi.is_finite() {
        return Value::Float(if lo.is_finite() { lo } else { 0.0 });
    }
    if lo > hi {
        tracing::warn!(min = lo, max = hi, "Conflicting numeric bounds. Widening.");
        hi = lo + 100.0;
    }
    if lo == hi {
        return Value::Float(lo);
    }

    let raw: f64 = ctx.rng.random_range(lo..=hi);
    let rounded = (raw * 100.0).round() / 100.0;
    if rounded >= lo && rounded <= hi {
        Value::Float(rounded)
    } else {
        Value::Float(raw)
    }
}

fn generate_decimal(
    precision: Option<u32>,
    scale: u32,
    constraint: &ParsedConstraint,
    ctx: &mut GenerationContext,
) -> Value {
    let scale = scale.min(MAX_DECIMAL_SCALE);
    let factor = 10f64.powi(scale as i32);
    let (mut lo, mut hi) = float_bounds(constraint);

    // numeric(p, s) holds at most p - s integer digits
    if let Some(p) = precision.filter(|p| *p >= scale) {
        let magnitude = 10f64.powi((p - scale) as i32) - 1.0 / factor;
        lo = lo.max(-magnitude);
        hi = hi.min(magnitude);
    }

    const UNIT_LIMIT: f64 = 9.0e15;
    let lo_units = (lo * factor).ceil().clamp(-UNIT_LIMIT, UNIT_LIMIT) as i64;
    let hi_units = (hi * factor).floor().clamp(-UNIT_LIMIT, UNIT_LIMIT) as i64;

    let units = if lo_units > hi_units {
        tracing::warn!(
            min = lo,
            max = hi,
            scale,
            "No decimal value of this scale fits the bounds. Widening."
        );
        lo_units
    } else {
        ctx.rng.random_range(lo_units..=hi_units)
    };

    Value::Decimal {
        value: units as f64 / factor,
        scale,
    }
}

fn generate_text(
    column: &Column,
    constraint: &ParsedConstraint,
    row_index: usize,
    distinct: bool,
    ctx: &mut GenerationContext,
) -> Value {
    let fixed = match column.sql_type {
        SqlType::Char { length } => length,
        _ => None,
    };
    let limit = constraint.max_length.or(fixed).map(|l| l as usize);

    let word_count = match column.sql_type {
        SqlType::Text => ctx.rng.random_range(2..=5),
        _ => ctx.rng.random_range(1..=2),
    };
    let mut text = ctx.options.words.phrase(&mut ctx.rng, word_count);

    if distinct {
        text = with_row_suffix(&text, row_index, limit);
    } else if let Some(max) = limit {
        text = truncate_chars(&text, max);
    }

    if let Some(min) = constraint.min_length.map(|l| l as usize) {
        let target = limit.map_or(min, |max| min.min(max));
        while text.chars().count() < target {
            text.push(ctx.rng.random_range(b'a'..=b'z') as char);
        }
    }

    if let Some(n) = fixed.map(|n| n as usize) {
        text = truncate_chars(&text, n);
        let len = text.chars().count();
        text.push_str(&" ".repeat(n - len));
    }

    Value::Text(text)
}

/// `base_<row>` within `limit` characters; the suffix wins over the base.
fn with_row_suffix(base: &str, row_index: usize, limit: Option<usize>) -> String {
    let suffix = format!("_{}", row_index);
    match limit {
        None => format!("{}{}", base, suffix),
        Some(max) if suffix.len() < max => {
            format!("{}{}", truncate_chars(base, max - suffix.len()), suffix)
        }
        Some(max) => {
            let digits = row_index.to_string();
            digits[digits.len().saturating_sub(max)..].to_string()
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn generate_temporal(sql_type: &SqlType, ctx: &mut GenerationContext) -> Value {
    let start = ctx.base_time - ChronoDuration::days(PAST_WINDOW_DAYS);
    let span_secs = (PAST_WINDOW_DAYS + FUTURE_WINDOW_DAYS) * 86_400;
    let ts = start + ChronoDuration::seconds(ctx.rng.random_range(0..=span_secs));
    match sql_type {
        SqlType::Date => Value::Date(ts.date()),
        SqlType::Time => Value::Time(ts.time()),
        _ => Value::Timestamp(ts),
    }
}

fn generate_json(ctx: &mut GenerationContext) -> Value {
    let mut map = serde_json::Map::new();
    let key = ctx.options.words.pick(&mut ctx.rng);
    map.insert(key, serde_json::json!(ctx.rng.random_range(0..1000)));
    map.insert(
        "active".to_string(),
        serde_json::Value::Bool(ctx.rng.random_bool(0.5)),
    );
    Value::Json(serde_json::Value::Object(map))
}

/// Redraw a numeric value until it lies in `[min, max]`.
///
/// Reversed bounds are swapped. Non-numeric columns yield `Null`. After
/// `max_retries` attempts the last draw is returned even if it is still
/// out of bounds.
pub fn generate_numeric_within_bounds(
    column: &Column,
    min: f64,
    max: f64,
    ctx: &mut GenerationContext,
) -> Value {
    if !column.sql_type.is_numeric() {
        return Value::Null;
    }
    let (lo, hi) = if min > max { (max, min) } else { (min, max) };
    let bounds = ParsedConstraint {
        min: Some(lo),
        max: Some(hi),
        ..Default::default()
    };

    let attempts = ctx.options.max_retries.max(1);
    let mut last = Value::Null;
    for _ in 0..attempts {
        let candidate = generate_number(column, &bounds, 0, false, ctx);
        if candidate.as_f64().is_some_and(|v| v >= lo && v <= hi) {
            return candidate;
        }
        last = candidate;
    }

    tracing::warn!(
        column = %column.name,
        min = lo,
        max = hi,
        attempts,
        "Retry ceiling reached, keeping last attempt"
    );
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::effective_constraint;
    use crate::generate::context::{GenerationOptions, SoftDelete};

    fn options(seed: u64) -> GenerationOptions {
        GenerationOptions {
            seed: Some(seed),
            base_time: chrono::NaiveDate::from_ymd_opt(2025, 6, 15)
                .and_then(|d| d.and_hms_opt(12, 0, 0)),
            ..Default::default()
        }
    }

    fn value_for(
        column: &Column,
        constraint: &ParsedConstraint,
        row_index: usize,
        ctx: &mut GenerationContext,
    ) -> Value {
        generate_column_value(column, constraint, row_index, column.primary_key, ctx)
    }

    fn required(name: &str, sql_type: SqlType) -> Column {
        let mut col = Column::new(name, sql_type);
        col.nullable = false;
        col
    }

    fn bounded(min: f64, max: f64) -> ParsedConstraint {
        ParsedConstraint {
            min: Some(min),
            max: Some(max),
            ..Default::default()
        }
    }

    #[test]
    fn test_bounded_integer_stays_in_range() {
        let opts = options(1);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("age", SqlType::Integer);
        let constraint = bounded(18.0, 65.0);
        for i in 0..500 {
            let v = value_for(&col, &constraint, i, &mut ctx).as_int().unwrap();
            assert!((18..=65).contains(&v), "{v} out of range");
        }
    }

    #[test]
    fn test_nullable_column_is_sometimes_null() {
        let opts = options(2);
        let mut ctx = GenerationContext::new(&opts);
        let col = Column::new("nickname", SqlType::Text);
        let values: Vec<Value> = (0..1000)
            .map(|i| value_for(&col, &ParsedConstraint::default(), i, &mut ctx))
            .collect();
        let nulls = values.iter().filter(|v| v.is_null()).count();
        assert!(nulls > 0 && nulls < 1000);
    }

    #[test]
    fn test_primary_key_is_never_null() {
        let mut opts = options(3);
        opts.null_probability = 1.0;
        let mut ctx = GenerationContext::new(&opts);
        let mut col = Column::new("id", SqlType::Integer);
        col.primary_key = true;
        col.nullable = true;
        for i in 0..50 {
            assert_eq!(
                value_for(&col, &ParsedConstraint::default(), i, &mut ctx),
                Value::Int(1 + i as i64)
            );
        }
    }

    #[test]
    fn test_allowed_values_are_coerced() {
        let opts = options(4);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("level", SqlType::SmallInt);
        let constraint = ParsedConstraint {
            allowed_values: ["1", "2", "3"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        for i in 0..100 {
            let v = value_for(&col, &constraint, i, &mut ctx).as_int().unwrap();
            assert!((1..=3).contains(&v));
        }
    }

    #[test]
    fn test_allowed_uuid_values_prefer_unused() {
        let opts = options(5);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("ref", SqlType::Uuid);
        let a = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let b = "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8";
        let constraint = ParsedConstraint {
            allowed_values: [a, b].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let first = value_for(&col, &constraint, 0, &mut ctx);
        let second = value_for(&col, &constraint, 1, &mut ctx);
        assert_ne!(first, second);
        assert_eq!(ctx.used_uuids.len(), 2);
    }

    #[test]
    fn test_uuids_are_unique_across_columns() {
        let opts = options(6);
        let mut ctx = GenerationContext::new(&opts);
        let a = required("id", SqlType::Uuid);
        let b = required("external_ref", SqlType::Char { length: Some(36) }).with_uuid_override(true);
        let mut seen = std::collections::HashSet::new();
        for i in 0..500 {
            for col in [&a, &b] {
                let Value::Uuid(id) = value_for(col, &ParsedConstraint::default(), i, &mut ctx)
                else {
                    panic!("expected uuid");
                };
                assert!(seen.insert(id));
            }
        }
    }

    #[test]
    fn test_char_is_padded_to_exact_length() {
        let opts = options(7);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("code", SqlType::Char { length: Some(6) });
        let constraint = effective_constraint(&col, &[]);
        for i in 0..100 {
            let v = value_for(&col, &constraint, i, &mut ctx);
            assert_eq!(v.as_str().unwrap().chars().count(), 6);
        }
    }

    #[test]
    fn test_varchar_respects_length() {
        let opts = options(8);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("label", SqlType::VarChar { length: Some(4) });
        let constraint = effective_constraint(&col, &[]);
        for i in 0..200 {
            let v = generate_column_value(&col, &constraint, i, i % 2 == 0, &mut ctx);
            assert!(v.as_str().unwrap().chars().count() <= 4);
        }
    }

    #[test]
    fn test_min_length_is_padded() {
        let opts = options(9);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("token", SqlType::VarChar { length: Some(40) });
        let constraint = effective_constraint(&col, &["length(token) >= 30".to_string()]);
        let v = value_for(&col, &constraint, 0, &mut ctx);
        let len = v.as_str().unwrap().chars().count();
        assert!((30..=40).contains(&len));
    }

    #[test]
    fn test_distinct_text_has_row_suffix() {
        let opts = options(10);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("slug", SqlType::VarChar { length: Some(12) });
        let v = generate_column_value(&col, &ParsedConstraint::default(), 42, true, &mut ctx);
        assert!(v.as_str().unwrap().ends_with("_42"));
        assert_eq!(with_row_suffix("anything", 12345, Some(3)), "345");
    }

    #[test]
    fn test_decimal_respects_scale_and_strict_bound() {
        let opts = options(11);
        let mut ctx = GenerationContext::new(&opts);
        let col = required(
            "price",
            SqlType::Decimal {
                precision: Some(5),
                scale: Some(2),
            },
        );
        let constraint =
            crate::constraint::parse_column_constraint("price", &["price > 0".to_string()]);
        for i in 0..500 {
            let Value::Decimal { value, scale } = value_for(&col, &constraint, i, &mut ctx)
            else {
                panic!("expected decimal");
            };
            assert_eq!(scale, 2);
            assert!(value >= 0.01 && value <= 999.99);
            assert!(((value * 100.0).round() - value * 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_float_default_and_bounds() {
        let opts = options(12);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("ratio", SqlType::Double);
        let constraint = bounded(0.5, 0.75);
        for i in 0..200 {
            let v = value_for(&col, &constraint, i, &mut ctx).as_f64().unwrap();
            assert!((0.5..=0.75).contains(&v));
        }
    }

    #[test]
    fn test_auto_increment_follows_sequence_offset() {
        let mut opts = options(13);
        opts.sequence_offset = 500;
        let mut ctx = GenerationContext::new(&opts);
        let mut col = required("id", SqlType::BigInt);
        col.auto_increment = true;
        assert_eq!(
            value_for(&col, &ParsedConstraint::default(), 0, &mut ctx),
            Value::Int(501)
        );
        assert_eq!(
            value_for(&col, &ParsedConstraint::default(), 9, &mut ctx),
            Value::Int(510)
        );
    }

    #[test]
    fn test_temporal_window() {
        let opts = options(14);
        let mut ctx = GenerationContext::new(&opts);
        let base = ctx.base_time;
        let col = required("created_at", SqlType::Timestamp);
        for i in 0..200 {
            let Value::Timestamp(ts) = value_for(&col, &ParsedConstraint::default(), i, &mut ctx)
            else {
                panic!("expected timestamp");
            };
            assert!(ts >= base - ChronoDuration::days(730));
            assert!(ts <= base + ChronoDuration::days(30));
        }
    }

    #[test]
    fn test_soft_delete_resolution() {
        let mut opts = options(15);
        opts.soft_delete = SoftDelete {
            columns: vec!["is_deleted".to_string()],
            value: Some("false".to_string()),
        };
        let mut ctx = GenerationContext::new(&opts);
        let col = required("is_deleted", SqlType::Boolean);
        assert_eq!(
            value_for(&col, &ParsedConstraint::default(), 0, &mut ctx),
            Value::Bool(false)
        );

        let int_col = required("is_deleted", SqlType::Integer);
        assert_eq!(soft_delete_value(&int_col, Some("not-a-number")), Value::Null);
        assert_eq!(soft_delete_value(&int_col, None), Value::UseDefault);
    }

    #[test]
    fn test_numeric_within_bounds_swaps_reversed_bounds() {
        let opts = options(16);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("qty", SqlType::Integer);
        for _ in 0..100 {
            let v = generate_numeric_within_bounds(&col, 20.0, 10.0, &mut ctx)
                .as_int()
                .unwrap();
            assert!((10..=20).contains(&v));
        }
    }

    #[test]
    fn test_numeric_within_bounds_non_numeric_is_null() {
        let opts = options(17);
        let mut ctx = GenerationContext::new(&opts);
        let col = required("name", SqlType::Text);
        assert_eq!(
            generate_numeric_within_bounds(&col, 0.0, 1.0, &mut ctx),
            Value::Null
        );
    }

    #[test]
    fn test_numeric_within_bounds_keeps_last_attempt() {
        let mut opts = options(18);
        opts.max_retries = 5;
        let mut ctx = GenerationContext::new(&opts);
        let col = required("qty", SqlType::Integer);
        // no integer lies in [0.2, 0.8]
        let v = generate_numeric_within_bounds(&col, 0.2, 0.8, &mut ctx);
        assert!(matches!(v, Value::Int(_)));
    }
}
