use anyhow::{Context, Result};

use seedforge_core::graph::visualize::{self, GraphFormat as VizFormat};
use seedforge_core::graph::{DependencyGraph, GenerationOrder};

use crate::args::{GraphArgs, GraphFormat};
use crate::commands::{load_config, load_schema};

pub async fn run(args: &GraphArgs) -> Result<()> {
    let config = load_config(args.source.config.as_deref())?;
    let schema = load_schema(&args.source, config.as_ref()).await?;

    let break_at = config
        .as_ref()
        .map(|c| c.cycle_break_edges())
        .unwrap_or_default();
    let dep_graph = DependencyGraph::from_schema(&schema);
    let order = GenerationOrder::compute(&dep_graph, &break_at);

    let format = match args.format {
        GraphFormat::Mermaid => VizFormat::Mermaid,
        GraphFormat::Dot => VizFormat::Dot,
    };
    let output = visualize::visualize(&dep_graph, &order, format);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write graph to {}", path.display()))?;
            eprintln!("✓ Graph written to {}", path.display());
        }
        None => println!("{}", output),
    }

    Ok(())
}
