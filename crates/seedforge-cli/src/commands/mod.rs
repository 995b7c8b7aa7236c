pub mod generate;
pub mod graph;
pub mod inspect;

use std::path::Path;

use anyhow::{Context, Result};

use seedforge_core::config::{read_config, read_config_file, SeedForgeConfig};
use seedforge_core::schema::{read_catalog, read_schema_file, DatabaseSchema};
use seedforge_core::SeedForgeError;

use crate::args::SourceArgs;

/// `--config` when given, otherwise `./seedforge.toml` if it exists.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<SeedForgeConfig>> {
    match explicit {
        Some(path) => Ok(Some(read_config_file(path)?)),
        None => Ok(read_config(Path::new("."))?),
    }
}

/// Resolve the schema: `--schema` file, then `--db` / DATABASE_URL, then the
/// config's `[database]` section.
pub async fn load_schema(
    source: &SourceArgs,
    config: Option<&SeedForgeConfig>,
) -> Result<DatabaseSchema> {
    let schema = match &source.schema {
        Some(path) => read_schema_file(path)
            .with_context(|| format!("Failed to load schema file {}", path.display()))?,
        None => {
            let database = config.map(|c| &c.database);
            let url = source
                .db
                .clone()
                .or_else(|| database.and_then(|d| d.url.clone()))
                .ok_or(SeedForgeError::NoSchemaSource)?;
            let namespace = source
                .namespace
                .clone()
                .or_else(|| database.and_then(|d| d.schema.clone()));
            read_catalog(&url, namespace.as_deref()).await?
        }
    };

    if let Some(cfg) = config {
        for warning in cfg.validate_against_schema(&schema) {
            tracing::warn!("{}", warning);
        }
    }
    Ok(schema)
}
