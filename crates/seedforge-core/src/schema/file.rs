//! Schema descriptions read from disk, for offline runs and fixtures.
//!
//! The file mirrors [`DatabaseSchema`]: a `dialect`, a `name` and a `tables`
//! map keyed by table name. JSON and TOML are both accepted, picked by
//! extension.

use std::path::Path;

use crate::error::{Result, SeedForgeError};
use crate::schema::types::DatabaseSchema;

pub fn read_schema_file(path: &Path) -> Result<DatabaseSchema> {
    let shown = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| SeedForgeError::SchemaFile {
        path: shown.clone(),
        message: e.to_string(),
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let mut schema = match extension.as_deref() {
        Some("json") => parse_json(&content),
        Some("toml") => parse_toml(&content),
        _ => Err("unsupported extension, expected .json or .toml".to_string()),
    }
    .map_err(|message| SeedForgeError::SchemaFile {
        path: shown.clone(),
        message,
    })?;

    schema.normalize();
    schema.validate()?;
    tracing::debug!(path = %shown, tables = schema.table_count(), "Loaded schema file");
    Ok(schema)
}

fn parse_json(content: &str) -> std::result::Result<DatabaseSchema, String> {
    serde_json::from_str(content).map_err(|e| e.to_string())
}

fn parse_toml(content: &str) -> std::result::Result<DatabaseSchema, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}
