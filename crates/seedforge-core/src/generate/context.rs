//! # Generation Options and Run Context
//!
//! `GenerationOptions` is the engine's plain input: row counts, seed,
//! deferral policy, per-table rules. `GenerationContext` is the mutable
//! state of one `generate()` call (random source, used UUIDs, pinned base
//! time). It is created per run and passed by reference; nothing is global.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::generate::words::WordSource;

pub const DEFAULT_ROWS: usize = 100;
pub const DEFAULT_NULL_PROBABILITY: f64 = 0.1;
/// Ceiling for numeric revalidation attempts.
pub const DEFAULT_MAX_RETRIES: usize = 100;

/// Block of rows sharing pinned or jointly generated values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepetitionRule {
    pub count: usize,
    /// column -> literal, identical in every row of the block
    #[serde(default)]
    pub fixed: IndexMap<String, String>,
    /// columns generated once and reused across the block
    #[serde(default)]
    pub shared: Vec<String>,
}

/// Per-table overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOptions {
    pub rows: Option<usize>,
    pub exclude_columns: Vec<String>,
    pub repeat: Vec<RepetitionRule>,
    /// Text columns that hold UUIDs by convention.
    pub uuid_columns: Vec<String>,
}

/// Columns that mark a row as soft-deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftDelete {
    pub columns: Vec<String>,
    /// Literal to write; `None` leaves the column to its schema default.
    pub value: Option<String>,
}

impl SoftDelete {
    pub fn matches(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub default_rows: usize,
    /// Random when absent; the chosen seed is reported back.
    pub seed: Option<u64>,
    /// The emitted transaction defers constraint checks to commit.
    pub deferred: bool,
    pub null_probability: f64,
    pub max_retries: usize,
    pub sequence_offset: i64,
    pub words: WordSource,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub tables: HashMap<String, TableOptions>,
    pub soft_delete: SoftDelete,
    /// `table.column` entries preferred for deferral inside cycles.
    pub break_cycle_at: Vec<String>,
    /// Anchor for temporal values; the current time when absent.
    pub base_time: Option<NaiveDateTime>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            default_rows: DEFAULT_ROWS,
            seed: None,
            deferred: false,
            null_probability: DEFAULT_NULL_PROBABILITY,
            max_retries: DEFAULT_MAX_RETRIES,
            sequence_offset: 0,
            words: WordSource::default(),
            include: Vec::new(),
            exclude: Vec::new(),
            tables: HashMap::new(),
            soft_delete: SoftDelete::default(),
            break_cycle_at: Vec::new(),
            base_time: None,
        }
    }
}

impl GenerationOptions {
    pub fn table(&self, name: &str) -> Option<&TableOptions> {
        self.tables.get(name)
    }

    pub fn rows_for(&self, table: &str) -> usize {
        self.table(table)
            .and_then(|t| t.rows)
            .unwrap_or(self.default_rows)
    }
}

/// Mutable state shared by every table of one generation run.
pub struct GenerationContext<'a> {
    pub rng: StdRng,
    pub seed: u64,
    pub options: &'a GenerationOptions,
    /// Every UUID emitted so far, across all tables.
    pub used_uuids: HashSet<Uuid>,
    pub base_time: NaiveDateTime,
}

impl<'a> GenerationContext<'a> {
    pub fn new(options: &'a GenerationOptions) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);
        let base_time = options
            .base_time
            .unwrap_or_else(|| chrono::Utc::now().naive_utc());
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            options,
            used_uuids: HashSet::new(),
            base_time,
        }
    }

    pub fn null_probability(&self) -> f64 {
        self.options.null_probability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_for_uses_table_override() {
        let mut options = GenerationOptions::default();
        options.tables.insert(
            "users".to_string(),
            TableOptions {
                rows: Some(7),
                ..Default::default()
            },
        );
        assert_eq!(options.rows_for("users"), 7);
        assert_eq!(options.rows_for("orders"), DEFAULT_ROWS);
    }

    #[test]
    fn test_soft_delete_matching_is_case_insensitive() {
        let soft = SoftDelete {
            columns: vec!["deleted_at".to_string()],
            value: None,
        };
        assert!(soft.matches("DELETED_AT"));
        assert!(!soft.matches("created_at"));
    }

    #[test]
    fn test_fixed_seed_is_kept() {
        let options = GenerationOptions {
            seed: Some(9),
            ..Default::default()
        };
        let ctx = GenerationContext::new(&options);
        assert_eq!(ctx.seed, 9);
    }
}
