use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};

use seedforge_core::constraint::{effective_constraint, ParsedConstraint};
use seedforge_core::graph::{DependencyGraph, GenerationOrder};

use crate::args::{InspectArgs, InspectFormat};
use crate::commands::{load_config, load_schema};

pub async fn run(args: &InspectArgs) -> Result<()> {
    let config = load_config(args.source.config.as_deref())?;
    let schema = load_schema(&args.source, config.as_ref()).await?;

    let break_at = config
        .as_ref()
        .map(|c| c.cycle_break_edges())
        .unwrap_or_default();
    let dep_graph = DependencyGraph::from_schema(&schema);
    let order = GenerationOrder::compute(&dep_graph, &break_at);

    if let InspectFormat::Json = args.format {
        let json = serde_json::json!({
            "schema": schema,
            "order": order,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Database: {} ({})", schema.name, schema.dialect);
    println!(
        "Tables: {}  Columns: {}  Foreign Keys: {}  Cycle groups: {}",
        schema.table_count(),
        schema.column_count(),
        schema.foreign_key_count(),
        order.cycles().count()
    );
    println!();

    for (position, table_name) in order.tables().iter().enumerate() {
        let Some(table) = schema.tables.get(table_name) else {
            continue;
        };
        let group = match order.component_of(table_name) {
            Some(c) if c.cyclic => format!("  [cycle group {}: {}]", c.id, c.tables.join(", ")),
            _ => String::new(),
        };
        println!("━━━ {}. {}{} ━━━", position + 1, table_name, group);

        let mut t = ComfyTable::new();
        t.set_header(vec!["Column", "Type", "Nullable", "PK", "FK", "Inferred"]);

        for column in &table.columns {
            let fk_target = table
                .foreign_key_for(&column.name)
                .and_then(|fk| {
                    fk.columns
                        .get(&column.name)
                        .map(|parent| format!("→ {}.{}", fk.referenced_table, parent))
                })
                .unwrap_or_default();
            let constraint = effective_constraint(column, &table.check_constraints);

            t.add_row(vec![
                Cell::new(&column.name),
                Cell::new(column.sql_type.to_string()),
                Cell::new(if column.nullable { "YES" } else { "NO" }),
                Cell::new(if column.primary_key { "PK" } else { "" }),
                Cell::new(fk_target),
                Cell::new(describe(&constraint)),
            ]);
        }

        println!("{}", t);
        for edge in order
            .deferred_edges()
            .iter()
            .filter(|e| e.source_table == *table_name)
        {
            println!(
                "  deferred: {}.({}) → {} is assigned after insert",
                edge.source_table,
                edge.source_columns.join(", "),
                edge.target_table
            );
        }
        println!();
    }

    Ok(())
}

/// One-line summary of an inferred constraint, e.g. `18..120` or `in {a, b}`.
fn describe(constraint: &ParsedConstraint) -> String {
    let mut parts = Vec::new();
    match (constraint.min, constraint.max) {
        (Some(lo), Some(hi)) => parts.push(format!("{}..{}", lo, hi)),
        (Some(lo), None) => parts.push(format!(">= {}", lo)),
        (None, Some(hi)) => parts.push(format!("<= {}", hi)),
        (None, None) => {}
    }
    match (constraint.min_length, constraint.max_length) {
        (Some(lo), Some(hi)) => parts.push(format!("len {}..{}", lo, hi)),
        (Some(lo), None) => parts.push(format!("len >= {}", lo)),
        (None, Some(hi)) => parts.push(format!("len <= {}", hi)),
        (None, None) => {}
    }
    if !constraint.allowed_values.is_empty() {
        let values: Vec<&str> = constraint.allowed_values.iter().map(String::as_str).collect();
        parts.push(format!("in {{{}}}", values.join(", ")));
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_constraint() {
        let mut c = ParsedConstraint::default();
        assert_eq!(describe(&c), "");

        c.min = Some(18.0);
        c.max = Some(65.0);
        assert_eq!(describe(&c), "18..65");

        c.max_length = Some(12);
        c.allowed_values.insert("A".to_string());
        c.allowed_values.insert("B".to_string());
        assert_eq!(describe(&c), "18..65; len <= 12; in {A, B}");
    }
}
