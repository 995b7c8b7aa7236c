//! # Error Types
//!
//! Defines `SeedForgeError`, the unified error enum for every failure mode in
//! the SeedForge pipeline. Every variant carries the table, column and row
//! context needed to act on it without digging through logs.
//!
//! Best-effort degradations (contradictory numeric bounds, exhausted numeric
//! retries, unparseable CHECK text) are deliberately *not* errors: they are
//! logged with `tracing::warn!` and generation continues.

use thiserror::Error;

/// All errors that can occur in SeedForge operations.
#[derive(Error, Debug)]
pub enum SeedForgeError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Catalog query '{query}' failed: {source}")]
    Introspection {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No schema source provided. SeedForge looks for one in this order:\n  1. --schema <file.json|file.toml>\n  2. --db flag\n  3. DATABASE_URL environment variable or .env file\n  4. seedforge.toml [database] section")]
    NoSchemaSource,

    #[error("Unsupported database scheme '{scheme}'. Supported: postgres://, sqlite://")]
    UnsupportedDatabase { scheme: String },

    #[error("Invalid schema for table '{table}': {message}")]
    InvalidSchema { table: String, message: String },

    #[error("Foreign key {table}.({columns}) sits inside a dependency cycle but is NOT NULL\n  Without deferred constraints the row cannot be inserted before its parent exists.\n  Either make one of the columns nullable, run with --deferred, or list a different edge in [graph] break_cycle_at")]
    UnresolvableCycle { table: String, columns: String },

    #[error("Table '{table}' needs post-insert updates for {fk_name} but has no primary key to identify its rows")]
    MissingPrimaryKey { table: String, fk_name: String },

    #[error("Foreign key resolution failed: {source_table}.({source_columns}) references {target_table}, but the target table has no generated rows with a complete key")]
    ForeignKeyResolution {
        source_table: String,
        source_columns: String,
        target_table: String,
    },

    #[error("One-to-one foreign key {table}.({columns}) ran out of distinct parent rows at row {row_index}\n  Generate at least as many {target_table} rows as {table} rows")]
    ForeignKeyExhausted {
        table: String,
        columns: String,
        target_table: String,
        row_index: usize,
    },

    #[error("Failed to generate unique value for {table}.({columns}) at row {row_index}: {max_retries} retries exhausted\n  Consider reducing the row count or widening the column's constraints")]
    UniqueExhausted {
        table: String,
        columns: String,
        row_index: usize,
        max_retries: usize,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Schema file error in {path}: {message}")]
    SchemaFile { path: String, message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, SeedForgeError>;
