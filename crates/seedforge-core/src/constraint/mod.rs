//! # Constraint Inference
//!
//! Turns raw CHECK-constraint text into per-column facts the value generator
//! can act on: numeric bounds, string length limits and closed value sets.
//!
//! This is pattern matching, not SQL parsing. Anything that does not match a
//! known shape is ignored, which only ever loosens the inferred constraint.

pub mod combination;
pub mod normalize;

use indexmap::IndexSet;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::schema::types::Column;
use normalize::{
    identifier_name, normalize_clause, parse_literal, split_list, split_top_level,
    strip_outer_parens, Connective, Literal, IDENT,
};

pub use combination::{parse_combinations, CombinationConstraint};

static LENGTH_CMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:char_length|character_length|length|len)\s*\(\s*(?P<col>{IDENT})\s*\)\s*(?P<op>>=|<=|<>|!=|=|>|<)\s*(?P<lit>.+)$"
    ))
    .expect("length regex is valid")
});

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<col>{IDENT})\s+(?P<not>NOT\s+)?BETWEEN\s+(?P<a>.+?)\s+AND\s+(?P<b>.+)$"
    ))
    .expect("between regex is valid")
});

static IN_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<col>{IDENT})\s+(?P<not>NOT\s+)?IN\s*\((?P<list>.*)\)$"
    ))
    .expect("in regex is valid")
});

static ANY_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<col>{IDENT})\s*=\s*ANY\s*\(*\s*ARRAY\s*\[(?P<list>.*)\]\s*\)*$"
    ))
    .expect("any regex is valid")
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<col>{IDENT})\s*(?P<op>>=|<=|<>|!=|=|>|<)\s*(?P<lit>.+)$"
    ))
    .expect("comparison regex is valid")
});

static REVERSED_COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<lit>[^<>=!]+?)\s*(?P<op>>=|<=|<>|!=|=|>|<)\s*(?P<col>{IDENT})$"
    ))
    .expect("reversed comparison regex is valid")
});

static IS_NULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(?P<col>{IDENT})\s+IS\s+NULL$")).expect("is null regex is valid")
});

/// Facts about one column derived from its table's CHECK clauses.
///
/// Unset bounds are `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedConstraint {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub allowed_values: IndexSet<String>,
}

impl ParsedConstraint {
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.max_length.is_none()
            && self.min_length.is_none()
            && self.allowed_values.is_empty()
    }

    pub fn has_numeric_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// `min > max` after intersection.
    pub fn is_contradictory(&self) -> bool {
        matches!((self.min, self.max), (Some(lo), Some(hi)) if lo > hi)
    }

    /// Whether `value` lies inside the numeric bounds. Unset bounds are open.
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|lo| value >= lo) && self.max.is_none_or(|hi| value <= hi)
    }

    pub fn raise_min(&mut self, value: f64) {
        self.min = Some(self.min.map_or(value, |m| m.max(value)));
    }

    pub fn lower_max(&mut self, value: f64) {
        self.max = Some(self.max.map_or(value, |m| m.min(value)));
    }

    pub fn limit_length(&mut self, value: u32) {
        self.max_length = Some(self.max_length.map_or(value, |m| m.min(value)));
    }

    pub fn require_length(&mut self, value: u32) {
        self.min_length = Some(self.min_length.map_or(value, |m| m.max(value)));
    }

    /// Tightest bound wins; allowed values accumulate.
    pub fn intersect(&mut self, other: ParsedConstraint) {
        if let Some(lo) = other.min {
            self.raise_min(lo);
        }
        if let Some(hi) = other.max {
            self.lower_max(hi);
        }
        if let Some(len) = other.max_length {
            self.limit_length(len);
        }
        if let Some(len) = other.min_length {
            self.require_length(len);
        }
        self.allowed_values.extend(other.allowed_values);
    }
}

/// Derive the constraint for `column` from every CHECK clause of its table.
pub fn parse_column_constraint(column: &str, checks: &[String]) -> ParsedConstraint {
    let target = identifier_name(column);
    let mut result = ParsedConstraint::default();

    for check in checks {
        let expr = normalize_clause(check);
        match parse_expr(&target, &expr) {
            Some(parsed) => {
                tracing::debug!(column, clause = %check, ?parsed, "Inferred constraint");
                result.intersect(parsed);
            }
            None => tracing::trace!(column, clause = %check, "Clause does not constrain column"),
        }
    }

    if result.is_contradictory() {
        tracing::warn!(
            column,
            min = ?result.min,
            max = ?result.max,
            "CHECK clauses give contradictory bounds"
        );
    }
    result
}

/// Combine the CHECK-derived constraint with catalog metadata.
///
/// The declared column length always caps a looser CHECK length. Numeric
/// hints from the catalog intersect with the CHECK bounds. Column-level and
/// CHECK-level value sets intersect when both exist and share a value;
/// otherwise whichever is non-empty is used.
pub fn effective_constraint(column: &Column, checks: &[String]) -> ParsedConstraint {
    let mut parsed = parse_column_constraint(&column.name, checks);

    if let Some(len) = column.max_length() {
        parsed.limit_length(len);
    }
    if let Some(lo) = column.min_value {
        parsed.raise_min(lo);
    }
    if let Some(hi) = column.max_value {
        parsed.lower_max(hi);
    }

    if !column.allowed_values.is_empty() {
        let declared: IndexSet<String> = column.allowed_values.iter().cloned().collect();
        if parsed.allowed_values.is_empty() {
            parsed.allowed_values = declared;
        } else {
            let shared: IndexSet<String> = parsed
                .allowed_values
                .iter()
                .filter(|v| declared.contains(*v))
                .cloned()
                .collect();
            if !shared.is_empty() {
                parsed.allowed_values = shared;
            }
        }
    }

    if let (Some(lo), Some(hi)) = (parsed.min_length, parsed.max_length) {
        if lo > hi {
            parsed.min_length = Some(hi);
        }
    }
    parsed
}

fn parse_expr(column: &str, expr: &str) -> Option<ParsedConstraint> {
    let expr = strip_outer_parens(expr);

    let disjuncts = split_top_level(expr, Connective::Or);
    if disjuncts.len() > 1 {
        return parse_disjunction(column, &disjuncts);
    }

    let conjuncts = split_top_level(expr, Connective::And);
    if conjuncts.len() > 1 {
        let mut acc: Option<ParsedConstraint> = None;
        for conjunct in conjuncts {
            if let Some(parsed) = parse_expr(column, conjunct) {
                match acc.as_mut() {
                    Some(existing) => existing.intersect(parsed),
                    None => acc = Some(parsed),
                }
            }
        }
        return acc;
    }

    parse_predicate(column, expr)
}

/// `col IS NULL OR p` reduces to `p`. Otherwise only a disjunction of pure
/// equalities on this column is understood, and it unions the values.
fn parse_disjunction(column: &str, disjuncts: &[&str]) -> Option<ParsedConstraint> {
    let remaining: Vec<&str> = disjuncts
        .iter()
        .map(|d| strip_outer_parens(d))
        .filter(|d| !is_null_test(column, d))
        .collect();

    if remaining.is_empty() {
        return None;
    }
    if remaining.len() == 1 {
        return parse_expr(column, remaining[0]);
    }

    let mut result = ParsedConstraint::default();
    for disjunct in remaining {
        result.allowed_values.extend(equality_values(column, disjunct)?);
    }
    Some(result)
}

fn is_null_test(column: &str, expr: &str) -> bool {
    IS_NULL
        .captures(expr)
        .is_some_and(|caps| identifier_name(&caps["col"]) == column)
}

fn equality_values(column: &str, expr: &str) -> Option<Vec<String>> {
    if let Some(values) = list_values(column, expr) {
        return Some(values);
    }
    let caps = COMPARISON.captures(expr)?;
    if identifier_name(&caps["col"]) != column || &caps["op"] != "=" {
        return None;
    }
    match parse_literal(&caps["lit"]) {
        Literal::Bare(_) => None,
        lit => Some(vec![lit.as_value()]),
    }
}

/// Values of an `IN (...)` list or `= ANY (ARRAY[...])` for this column.
fn list_values(column: &str, expr: &str) -> Option<Vec<String>> {
    let list = if let Some(caps) = IN_LIST.captures(expr) {
        if identifier_name(&caps["col"]) != column || caps.name("not").is_some() {
            return None;
        }
        caps.name("list")?.as_str().to_string()
    } else if let Some(caps) = ANY_ARRAY.captures(expr) {
        if identifier_name(&caps["col"]) != column {
            return None;
        }
        caps.name("list")?.as_str().to_string()
    } else {
        return None;
    };

    let values = split_list(&list)
        .into_iter()
        .filter_map(|item| match parse_literal(item) {
            Literal::Bare(b) if b.eq_ignore_ascii_case("null") => None,
            lit => Some(lit.as_value()),
        })
        .collect();
    Some(values)
}

fn parse_predicate(column: &str, expr: &str) -> Option<ParsedConstraint> {
    if let Some(caps) = LENGTH_CMP.captures(expr) {
        if identifier_name(&caps["col"]) != column {
            return None;
        }
        let Literal::Number(n) = parse_literal(&caps["lit"]) else {
            return None;
        };
        return length_constraint(&caps["op"], n);
    }

    if let Some(caps) = BETWEEN.captures(expr) {
        if identifier_name(&caps["col"]) != column || caps.name("not").is_some() {
            return None;
        }
        let (Literal::Number(a), Literal::Number(b)) =
            (parse_literal(&caps["a"]), parse_literal(&caps["b"]))
        else {
            return None;
        };
        return Some(ParsedConstraint {
            min: Some(a.min(b)),
            max: Some(a.max(b)),
            ..Default::default()
        });
    }

    if let Some(values) = list_values(column, expr) {
        return Some(ParsedConstraint {
            allowed_values: values.into_iter().collect(),
            ..Default::default()
        });
    }

    if let Some(caps) = COMPARISON.captures(expr) {
        if identifier_name(&caps["col"]) == column {
            return comparison_constraint(&caps["op"], parse_literal(&caps["lit"]));
        }
    }

    if let Some(caps) = REVERSED_COMPARISON.captures(expr) {
        if identifier_name(&caps["col"]) == column {
            let lit = parse_literal(&caps["lit"]);
            if matches!(lit, Literal::Number(_)) {
                return comparison_constraint(flip(&caps["op"]), lit);
            }
        }
    }

    None
}

fn comparison_constraint(op: &str, lit: Literal) -> Option<ParsedConstraint> {
    let mut parsed = ParsedConstraint::default();
    match (op, lit) {
        (">=", Literal::Number(n)) => parsed.min = Some(n),
        (">", Literal::Number(n)) => parsed.min = Some(next_up(n)),
        ("<=", Literal::Number(n)) => parsed.max = Some(n),
        ("<", Literal::Number(n)) => parsed.max = Some(next_down(n)),
        ("=", Literal::Number(n)) => {
            parsed.min = Some(n);
            parsed.max = Some(n);
        }
        ("=", Literal::Text(s)) => {
            parsed.allowed_values.insert(s);
        }
        _ => return None,
    }
    Some(parsed)
}

fn length_constraint(op: &str, n: f64) -> Option<ParsedConstraint> {
    if n < 0.0 {
        return None;
    }
    let n = n.floor() as u32;
    let mut parsed = ParsedConstraint::default();
    match op {
        "<=" => parsed.max_length = Some(n),
        "<" => parsed.max_length = Some(n.saturating_sub(1)),
        "=" => {
            parsed.max_length = Some(n);
            parsed.min_length = Some(n);
        }
        ">=" => parsed.min_length = Some(n),
        ">" => parsed.min_length = Some(n.saturating_add(1)),
        _ => return None,
    }
    Some(parsed)
}

fn flip(op: &str) -> &str {
    match op {
        ">=" => "<=",
        "<=" => ">=",
        ">" => "<",
        "<" => ">",
        other => other,
    }
}

/// Smallest double strictly greater than `x`.
pub fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// Largest double strictly less than `x`.
pub fn next_down(x: f64) -> f64 {
    -next_up(-x)
}
