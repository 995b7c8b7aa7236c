//! # Configuration File Parser
//!
//! Reads `seedforge.toml`, the optional file that sets generation defaults
//! without CLI flags. Supports:
//!
//! - `[database]`: default connection URL and catalog schema
//! - `[generate]`: row count, seed, deferral, null probability, dictionary
//! - `[tables.<name>]`: per-table rows, excluded columns, repetition rules
//! - `[soft_delete]`: columns that mark rows deleted, and their value
//! - `[graph]`: FK edges preferred for deferral inside cycles
//!
//! Example `seedforge.toml`:
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/myapp"
//!
//! [generate]
//! rows = 500
//! seed = 42
//! deferred = true
//! null_probability = 0.05
//!
//! [tables.orders]
//! rows = 5000
//! exclude_columns = ["notes"]
//!
//! [[tables.orders.repeat]]
//! count = 50
//! fixed = { status = "shipped" }
//! shared = ["customer_id"]
//!
//! [soft_delete]
//! columns = ["deleted_at", "is_deleted"]
//!
//! [graph]
//! break_cycle_at = ["users.invited_by_id"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SeedForgeError};
use crate::generate::context::{
    GenerationOptions, RepetitionRule, SoftDelete, TableOptions, DEFAULT_MAX_RETRIES,
    DEFAULT_NULL_PROBABILITY, DEFAULT_ROWS,
};
use crate::generate::words::WordSource;
use crate::output::sql::DEFAULT_BATCH_SIZE;
use crate::schema::types::DatabaseSchema;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "seedforge.toml";

/// Top-level seedforge.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedForgeConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
    /// Per-table overrides, keyed by table name.
    pub tables: BTreeMap<String, TableConfig>,
    pub soft_delete: SoftDeleteConfig,
    pub graph: GraphConfig,

    /// Directory holding the file; relative paths resolve against it.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    /// Catalog schema to read (e.g. "public" for PostgreSQL).
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Default number of rows per table.
    pub rows: Option<usize>,
    pub seed: Option<u64>,
    pub deferred: Option<bool>,
    pub null_probability: Option<f64>,
    /// Ceiling for numeric revalidation retries.
    pub max_retries: Option<usize>,
    /// Newline-separated word list for text columns.
    pub dictionary: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub sequence_offset: Option<i64>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub rows: Option<usize>,
    pub exclude_columns: Vec<String>,
    pub repeat: Vec<RepetitionRule>,
    /// Text columns holding UUIDs.
    pub uuid_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SoftDeleteConfig {
    pub columns: Vec<String>,
    /// Literal to write; absent leaves the schema default.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// `table.column` entries; their FK edges are deferred first when a
    /// cycle has to be broken.
    pub break_cycle_at: Vec<String>,
}

/// Read and parse seedforge.toml from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
pub fn read_config(dir: &Path) -> Result<Option<SeedForgeConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    read_config_file(&path).map(Some)
}

/// Read and validate a config file at an explicit path.
pub fn read_config_file(path: &Path) -> Result<SeedForgeConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SeedForgeError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config: SeedForgeConfig =
        toml::from_str(&content).map_err(|e| SeedForgeError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.config_dir = Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));

    config.validate()?;
    Ok(config)
}

impl SeedForgeConfig {
    /// Well-formed `break_cycle_at` entries.
    ///
    /// Entries without a `table.column` dot are logged and skipped.
    pub fn cycle_break_edges(&self) -> Vec<String> {
        self.graph
            .break_cycle_at
            .iter()
            .filter(|entry| match entry.split_once('.') {
                Some((table, column)) if !table.is_empty() && !column.is_empty() => true,
                _ => {
                    tracing::warn!(
                        "Invalid graph.break_cycle_at entry: '{}'. \
                         Expected format 'table.column'. Ignoring.",
                        entry
                    );
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// Validate what serde cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self.generate.null_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(SeedForgeError::Config {
                    message: format!("generate.null_probability must be within [0, 1], got {}", p),
                });
            }
        }
        if self.generate.batch_size == Some(0) {
            return Err(SeedForgeError::Config {
                message: "generate.batch_size must be at least 1".to_string(),
            });
        }

        for (table, table_cfg) in &self.tables {
            for (i, rule) in table_cfg.repeat.iter().enumerate() {
                if rule.count == 0 {
                    return Err(SeedForgeError::Config {
                        message: format!("tables.{}.repeat[{}]: count must be at least 1", table, i),
                    });
                }
                if let Some(column) = rule.shared.iter().find(|c| rule.fixed.contains_key(*c)) {
                    return Err(SeedForgeError::Config {
                        message: format!(
                            "tables.{}.repeat[{}]: column '{}' is both fixed and shared",
                            table, i, column
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Warnings for entries naming tables or columns the schema lacks.
    pub fn validate_against_schema(&self, schema: &DatabaseSchema) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, table_cfg) in &self.tables {
            let Some(table) = schema.tables.get(name) else {
                warnings.push(format!(
                    "seedforge.toml: [tables.{}] references a table which does not exist in schema",
                    name
                ));
                continue;
            };
            let referenced = table_cfg
                .exclude_columns
                .iter()
                .chain(&table_cfg.uuid_columns)
                .chain(table_cfg.repeat.iter().flat_map(|r| r.fixed.keys().chain(&r.shared)));
            for column in referenced {
                if !table.has_column(column) {
                    warnings.push(format!(
                        "seedforge.toml: [tables.{}] references column '{}' which does not exist",
                        name, column
                    ));
                }
            }
        }
        for entry in self.cycle_break_edges() {
            if let Some((table, column)) = entry.split_once('.') {
                if schema.tables.get(table).is_none_or(|t| !t.has_column(column)) {
                    warnings.push(format!(
                        "seedforge.toml: graph.break_cycle_at entry '{}' does not match a column",
                        entry
                    ));
                }
            }
        }
        warnings
    }

    pub fn batch_size(&self) -> usize {
        self.generate.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Convert the file into engine options. Loads the dictionary, if any.
    pub fn generation_options(&self) -> Result<GenerationOptions> {
        let words = match &self.generate.dictionary {
            Some(path) => WordSource::from_file(&self.resolve_path(path))?,
            None => WordSource::default(),
        };

        let tables = self
            .tables
            .iter()
            .map(|(name, cfg)| {
                (
                    name.clone(),
                    TableOptions {
                        rows: cfg.rows,
                        exclude_columns: cfg.exclude_columns.clone(),
                        repeat: cfg.repeat.clone(),
                        uuid_columns: cfg.uuid_columns.clone(),
                    },
                )
            })
            .collect();

        Ok(GenerationOptions {
            default_rows: self.generate.rows.unwrap_or(DEFAULT_ROWS),
            seed: self.generate.seed,
            deferred: self.generate.deferred.unwrap_or(false),
            null_probability: self
                .generate
                .null_probability
                .unwrap_or(DEFAULT_NULL_PROBABILITY),
            max_retries: self.generate.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            sequence_offset: self.generate.sequence_offset.unwrap_or(0),
            words,
            include: self.generate.include.clone(),
            exclude: self.generate.exclude.clone(),
            tables,
            soft_delete: SoftDelete {
                columns: self.soft_delete.columns.clone(),
                value: self.soft_delete.value.clone(),
            },
            break_cycle_at: self.cycle_break_edges(),
            base_time: None,
        })
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.config_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
