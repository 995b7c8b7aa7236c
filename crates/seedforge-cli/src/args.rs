use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use seedforge_core::schema::types::Dialect;

#[derive(Parser, Debug)]
#[command(
    name = "seedforge",
    about = "Generate constraint-satisfying seed data for relational schemas",
    version,
    after_help = "Examples:\n  seedforge generate --db postgres://localhost/myapp --rows 1000 --output seed.sql\n  seedforge generate --schema schema.toml --dialect mysql --seed 7\n  seedforge generate --rows 100              # DATABASE_URL from .env\n  seedforge graph --db sqlite://app.db --format dot\n  seedforge inspect --db postgres://localhost/myapp"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate seed data as a SQL script or JSON document
    Generate(GenerateArgs),

    /// Visualize the table dependency graph
    Graph(GraphArgs),

    /// Show generation order, cycle groups and inferred constraints
    Inspect(InspectArgs),
}

/// Where the schema comes from. A schema file wins over a database URL.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Database connection URL (postgres://, sqlite://)
    /// Falls back to DATABASE_URL env var or .env file
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Schema description file (.json or .toml) instead of a live database
    #[arg(long, conflicts_with = "namespace")]
    pub schema: Option<PathBuf>,

    /// Catalog schema to read (default: public for Postgres)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Config file (default: ./seedforge.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of rows to generate per table
    #[arg(long)]
    pub rows: Option<usize>,

    /// Per-table row count overrides (e.g., users=500,orders=2000)
    #[arg(long, value_delimiter = ',')]
    pub table_rows: Vec<String>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Insert cycles directly and defer constraint checks to commit
    #[arg(long)]
    pub deferred: bool,

    /// SQL dialect of the script (default: the schema's own)
    #[arg(long)]
    pub dialect: Option<DialectArg>,

    /// Output format (auto-detected from file extension if not specified)
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Output file path; stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rows per INSERT statement
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Only generate data for these tables (and the tables they reference)
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Exclude these tables from generation
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format for the dependency graph
    #[arg(long, default_value = "mermaid")]
    pub format: GraphFormat,

    /// Output file path; stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: InspectFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Sql,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DialectArg {
    Postgres,
    Mysql,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InspectFormat {
    Table,
    Json,
}

impl GenerateArgs {
    /// Determine output format from the explicit flag or the file extension.
    pub fn output_format(&self) -> OutputFormat {
        if let Some(fmt) = self.format {
            return fmt;
        }
        let is_json = self
            .output
            .as_ref()
            .and_then(|p| p.extension())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            OutputFormat::Json
        } else {
            OutputFormat::Sql
        }
    }

    /// Parse table row overrides like "users=500,orders=2000".
    /// Malformed entries are returned as errors.
    pub fn parse_table_rows(&self) -> Result<BTreeMap<String, usize>, String> {
        let mut map = BTreeMap::new();
        for entry in &self.table_rows {
            let parsed = entry
                .split_once('=')
                .and_then(|(table, count)| Some((table.trim(), count.trim().parse::<usize>().ok()?)));
            match parsed {
                Some((table, count)) if !table.is_empty() => {
                    map.insert(table.to_string(), count);
                }
                _ => return Err(format!("invalid --table-rows entry '{}', expected table=count", entry)),
            }
        }
        Ok(map)
    }
}
