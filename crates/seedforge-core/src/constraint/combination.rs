//! Multi-column allowed combinations.
//!
//! A clause such as `(status = 'A' AND code = 1) OR (status = 'B' AND code = 2)`
//! cannot be expressed per column without losing the pairing, so it is kept
//! as a list of whole assignments that the row generator picks from.

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::normalize::{
    identifier_display, normalize_clause, parse_literal, split_top_level, strip_outer_parens,
    Connective, IDENT,
};

static EQUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(?P<col>{IDENT})\s*=\s*(?P<lit>.+)$"))
        .expect("equality regex is valid")
});

/// A joint constraint over `columns`: every row must match one entry of
/// `combinations` exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationConstraint {
    pub columns: Vec<String>,
    pub combinations: Vec<IndexMap<String, String>>,
}

/// Extract every multi-column combination clause from a table's checks.
pub fn parse_combinations(checks: &[String]) -> Vec<CombinationConstraint> {
    checks
        .iter()
        .filter_map(|check| {
            let parsed = parse_combination(&normalize_clause(check));
            if parsed.is_some() {
                tracing::debug!(clause = %check, "Parsed multi-column combination");
            }
            parsed
        })
        .collect()
}

fn parse_combination(expr: &str) -> Option<CombinationConstraint> {
    let disjuncts = split_top_level(expr, Connective::Or);
    if disjuncts.len() < 2 {
        return None;
    }

    let mut columns: IndexSet<String> = IndexSet::new();
    let mut combinations = Vec::with_capacity(disjuncts.len());

    for disjunct in disjuncts {
        let mut assignment = IndexMap::new();
        for conjunct in split_top_level(strip_outer_parens(disjunct), Connective::And) {
            let (column, value) = equality(strip_outer_parens(conjunct))?;
            let key = columns
                .iter()
                .find(|c| c.eq_ignore_ascii_case(&column))
                .cloned()
                .unwrap_or_else(|| column.clone());
            columns.insert(key.clone());
            assignment.insert(key, value);
        }
        combinations.push(assignment);
    }

    // A single column OR'd with itself is an allowed-value set, not a combination.
    if columns.len() < 2 {
        return None;
    }
    // Every disjunct must pin the same columns, otherwise the pairing is partial.
    if combinations.iter().any(|c| c.len() != columns.len()) {
        return None;
    }

    Some(CombinationConstraint {
        columns: columns.into_iter().collect(),
        combinations,
    })
}

fn equality(expr: &str) -> Option<(String, String)> {
    let caps = EQUALITY.captures(expr)?;
    let lit = caps.name("lit")?.as_str();
    let value = match parse_literal(lit) {
        super::normalize::Literal::Bare(bare) => {
            let lower = bare.to_ascii_lowercase();
            if lower == "true" || lower == "false" {
                lower
            } else {
                return None;
            }
        }
        other => other.as_value(),
    };
    Some((identifier_display(&caps["col"]), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(clauses: &[&str]) -> Vec<String> {
        clauses.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parses_paired_assignments() {
        let parsed = parse_combinations(&checks(&[
            "(status = 'A' AND code = 1) OR (status = 'B' AND code = 2)",
        ]));
        assert_eq!(parsed.len(), 1);
        let combo = &parsed[0];
        assert_eq!(combo.columns, vec!["status", "code"]);
        assert_eq!(combo.combinations.len(), 2);
        assert_eq!(combo.combinations[1]["status"], "B");
        assert_eq!(combo.combinations[1]["code"], "2");
    }

    #[test]
    fn test_postgres_shape() {
        let parsed = parse_combinations(&checks(&[
            "CHECK ((((kind)::text = 'card'::text) AND (verified = true)) OR (((kind)::text = 'cash'::text) AND (verified = false)))",
        ]));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].combinations[0]["kind"], "card");
        assert_eq!(parsed[0].combinations[0]["verified"], "true");
    }

    #[test]
    fn test_single_column_or_is_not_a_combination() {
        assert!(parse_combinations(&checks(&["size = 'S' OR size = 'M'"])).is_empty());
    }

    #[test]
    fn test_ranges_are_not_combinations() {
        assert!(parse_combinations(&checks(&["(a > 1 AND b = 2) OR (a = 3 AND b = 4)"])).is_empty());
        assert!(parse_combinations(&checks(&["price >= 0"])).is_empty());
    }

    #[test]
    fn test_partial_pairing_is_rejected() {
        assert!(parse_combinations(&checks(&["(a = 1 AND b = 2) OR (a = 3)"])).is_empty());
    }
}
