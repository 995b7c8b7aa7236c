use petgraph::visit::EdgeRef;
use std::collections::HashSet;

use crate::graph::dag::DependencyGraph;
use crate::graph::scc::GenerationOrder;

/// Output format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Render the dependency graph. Cycle groups are drawn as subgraphs and
/// deferred edges as dashed lines.
pub fn visualize(graph: &DependencyGraph, order: &GenerationOrder, format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph, order),
        GraphFormat::Dot => generate_dot(graph, order),
    }
}

/// (source table, fk name) of every deferred edge.
fn deferred_keys(order: &GenerationOrder) -> HashSet<(&str, &str)> {
    order
        .deferred_edges()
        .iter()
        .map(|e| (e.source_table.as_str(), e.fk_name.as_str()))
        .collect()
}

fn node_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn generate_mermaid(graph: &DependencyGraph, order: &GenerationOrder) -> String {
    let mut output = String::from("graph TD\n");
    let deferred = deferred_keys(order);

    for component in order.components() {
        if component.cyclic {
            output.push_str(&format!("    subgraph cycle_{}[cycle {}]\n", component.id, component.id));
            for table in &component.tables {
                output.push_str(&format!("        {}[{}]\n", node_id(table), table));
            }
            output.push_str("    end\n");
        } else {
            for table in &component.tables {
                output.push_str(&format!("    {}[{}]\n", node_id(table), table));
            }
        }
    }

    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let info = edge.weight();
        let label = info.source_columns.join(", ");
        if deferred.contains(&(from, info.fk_name.as_str())) {
            output.push_str(&format!(
                "    {} -.->|{} (deferred)| {}\n",
                node_id(from),
                label,
                node_id(to)
            ));
        } else {
            output.push_str(&format!("    {} -->|{}| {}\n", node_id(from), label, node_id(to)));
        }
    }

    output
}

fn generate_dot(graph: &DependencyGraph, order: &GenerationOrder) -> String {
    let mut output = String::from("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");
    let deferred = deferred_keys(order);

    for component in order.cycles() {
        output.push_str(&format!("    subgraph cluster_cycle_{} {{\n", component.id));
        output.push_str(&format!("        label=\"cycle {}\";\n", component.id));
        output.push_str("        style=dashed;\n");
        for table in &component.tables {
            output.push_str(&format!("        \"{}\";\n", table));
        }
        output.push_str("    }\n");
    }

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let info = edge.weight();
        let label = info.source_columns.join(", ");
        if deferred.contains(&(from, info.fk_name.as_str())) {
            output.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{} (deferred)\", style=dashed, color=red];\n",
                from, to, label
            ));
        } else {
            output.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                from, to, label
            ));
        }
    }

    output.push_str("}\n");
    output
}
