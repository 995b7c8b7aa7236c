use indexmap::IndexMap;
use std::collections::HashSet;

use crate::generate::value::Row;

/// Tracks generated key tuples for one table's primary and unique keys.
pub struct UniqueTracker {
    /// Column group -> seen value tuples, in registration order.
    constraints: IndexMap<Vec<String>, HashSet<String>>,
    /// Maximum regeneration attempts per row before giving up.
    pub max_retries: usize,
}

impl UniqueTracker {
    pub fn new() -> Self {
        Self {
            constraints: IndexMap::new(),
            max_retries: 1000,
        }
    }

    /// Register a unique column group to track.
    pub fn register_constraint(&mut self, columns: &[String]) {
        self.constraints.entry(columns.to_vec()).or_default();
    }

    /// First registered group whose values in `row` were already seen.
    /// Groups with a null member never collide (SQL treats NULLs as distinct).
    pub fn find_collision(&self, row: &Row) -> Option<&[String]> {
        self.constraints.iter().find_map(|(columns, seen)| {
            let key = tuple_key(columns, row)?;
            seen.contains(&key).then_some(columns.as_slice())
        })
    }

    /// Record every group of `row`. Call after `find_collision` returned `None`.
    pub fn record(&mut self, row: &Row) {
        for (columns, seen) in self.constraints.iter_mut() {
            if let Some(key) = tuple_key(columns, row) {
                seen.insert(key);
            }
        }
    }
}

impl Default for UniqueTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn tuple_key(columns: &[String], row: &Row) -> Option<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        let value = row.get(column)?;
        if value.is_absent() {
            return None;
        }
        parts.push(value.to_unique_key());
    }
    Some(parts.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::value::Value;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_unique_tracking() {
        let mut tracker = UniqueTracker::new();
        let cols = vec!["email".to_string()];
        tracker.register_constraint(&cols);

        let first = row(&[("email", text("test@example.com"))]);
        assert!(tracker.find_collision(&first).is_none());
        tracker.record(&first);
        assert_eq!(tracker.find_collision(&first), Some(cols.as_slice()));

        let other = row(&[("email", text("other@example.com"))]);
        assert!(tracker.find_collision(&other).is_none());
    }

    #[test]
    fn test_unregistered_columns_never_collide() {
        let mut tracker = UniqueTracker::new();
        tracker.register_constraint(&["id".to_string()]);
        let r = row(&[("id", Value::Int(1)), ("name", text("a"))]);
        tracker.record(&r);
        let same_name = row(&[("id", Value::Int(2)), ("name", text("a"))]);
        assert!(tracker.find_collision(&same_name).is_none());
    }

    #[test]
    fn test_composite_rows() {
        let mut tracker = UniqueTracker::new();
        let cols = vec!["first_name".to_string(), "last_name".to_string()];
        tracker.register_constraint(&cols);

        let mut row = Row::new();
        row.insert("first_name".to_string(), text("John"));
        row.insert("last_name".to_string(), text("Doe"));
        assert!(tracker.find_collision(&row).is_none());
        tracker.record(&row);
        assert_eq!(tracker.find_collision(&row), Some(cols.as_slice()));

        row.insert("first_name".to_string(), text("Jane"));
        assert!(tracker.find_collision(&row).is_none());
    }

    #[test]
    fn test_nulls_never_collide() {
        let mut tracker = UniqueTracker::new();
        let cols = vec!["code".to_string()];
        tracker.register_constraint(&cols);

        let mut row = Row::new();
        row.insert("code".to_string(), Value::Null);
        tracker.record(&row);
        assert!(tracker.find_collision(&row).is_none());
    }
}
