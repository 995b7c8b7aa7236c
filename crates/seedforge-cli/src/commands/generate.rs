use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use seedforge_core::generate::{generate, GenerationOptions};
use seedforge_core::output::{sql_dialect, write_json, write_sql, SqlOptions};
use seedforge_core::output::sql::DEFAULT_BATCH_SIZE;

use crate::args::{GenerateArgs, OutputFormat};
use crate::commands::{load_config, load_schema};

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let config = load_config(args.source.config.as_deref())?;

    // Phase 1: Read schema
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{prefix}] {msg}")?);
    pb.set_prefix("1/3");
    pb.set_message("Reading schema...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let schema = load_schema(&args.source, config.as_ref()).await?;
    pb.finish_with_message(format!(
        "Reading schema... ✓ {} tables, {} foreign keys",
        schema.table_count(),
        schema.foreign_key_count()
    ));

    let options = build_options(args, config.as_ref())?;
    let batch_size = args
        .batch_size
        .or_else(|| config.as_ref().map(|c| c.batch_size()))
        .unwrap_or(DEFAULT_BATCH_SIZE);
    if batch_size == 0 {
        bail!("--batch-size must be at least 1");
    }

    // Phase 2: Generate
    let pb2 = ProgressBar::new(schema.table_count() as u64);
    pb2.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [2/3] Generating {msg:20} {bar:40.cyan/dim} {pos}/{len} tables")?
            .progress_chars("█▓░"),
    );
    let data = generate(
        &schema,
        &options,
        Some(&|table, done, total| {
            pb2.set_length(total as u64);
            pb2.set_position(done as u64);
            pb2.set_message(table.to_string());
        }),
    )?;
    pb2.finish_with_message(format!("✓ {} rows", data.total_rows()));

    // Phase 3: Write
    let dialect = sql_dialect(args.dialect.map(Into::into).unwrap_or(schema.dialect));
    let sql_options = SqlOptions {
        batch_size,
        deferred: options.deferred,
    };

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    match args.output_format() {
        OutputFormat::Sql => write_sql(&mut writer, &data, dialect.as_ref(), sql_options)?,
        OutputFormat::Json => write_json(&mut writer, &data)?,
    }
    drop(writer);

    let destination = args
        .output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    eprintln!(
        "\n✓ Generated {} rows across {} tables → {} (seed {})",
        data.total_rows(),
        data.tables.len(),
        destination,
        data.seed
    );
    if !data.pending_updates.is_empty() {
        eprintln!(
            "  {} foreign keys are assigned by UPDATE after the inserts",
            data.pending_updates.len()
        );
    }

    Ok(())
}

/// Config file values with CLI flags on top.
fn build_options(
    args: &GenerateArgs,
    config: Option<&seedforge_core::config::SeedForgeConfig>,
) -> Result<GenerationOptions> {
    let mut options = match config {
        Some(cfg) => cfg.generation_options()?,
        None => GenerationOptions::default(),
    };

    if let Some(rows) = args.rows {
        options.default_rows = rows;
    }
    if args.seed.is_some() {
        options.seed = args.seed;
    }
    if args.deferred {
        options.deferred = true;
    }
    if !args.include.is_empty() {
        options.include = args.include.clone();
    }
    if !args.exclude.is_empty() {
        options.exclude = args.exclude.clone();
    }

    let table_rows = args.parse_table_rows().map_err(anyhow::Error::msg)?;
    for (table, rows) in table_rows {
        options
            .tables
            .entry(table)
            .or_default()
            .rows = Some(rows);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Cli, Command};
    use clap::Parser;

    fn generate_args(args: &[&str]) -> GenerateArgs {
        match Cli::try_parse_from(args).unwrap().command {
            Command::Generate(args) => args,
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config: seedforge_core::config::SeedForgeConfig = toml::from_str(
            r#"
[generate]
rows = 10
seed = 1

[tables.users]
rows = 3
"#,
        )
        .unwrap();
        let args = generate_args(&[
            "seedforge",
            "generate",
            "--rows",
            "25",
            "--deferred",
            "--table-rows",
            "orders=7",
        ]);

        let options = build_options(&args, Some(&config)).unwrap();
        assert_eq!(options.default_rows, 25);
        assert_eq!(options.seed, Some(1));
        assert!(options.deferred);
        assert_eq!(options.rows_for("users"), 3);
        assert_eq!(options.rows_for("orders"), 7);
    }

    #[test]
    fn test_defaults_without_config() {
        let args = generate_args(&["seedforge", "generate", "--seed", "9"]);
        let options = build_options(&args, None).unwrap();
        assert_eq!(options.seed, Some(9));
        assert!(!options.deferred);
    }
}
