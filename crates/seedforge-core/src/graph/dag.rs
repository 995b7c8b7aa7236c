use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::schema::types::{DatabaseSchema, Table};

/// A directed graph representing table dependencies via foreign keys.
/// Edges point from dependent table to referenced table (child → parent).
///
/// Nodes are added in catalog order, so `NodeIndex::index()` doubles as the
/// catalog position used for tie-breaking.
pub struct DependencyGraph {
    pub graph: DiGraph<String, EdgeInfo>,
    pub node_indices: HashMap<String, NodeIndex>,
}

/// Information about an edge (foreign key relationship).
#[derive(Debug, Clone)]
pub struct EdgeInfo {
    pub fk_name: String,
    /// Columns in the dependent table
    pub source_columns: Vec<String>,
    /// Referenced columns in the parent table
    pub referenced_columns: Vec<String>,
    /// All FK columns are nullable
    pub is_nullable: bool,
    pub is_deferrable: bool,
}

impl DependencyGraph {
    pub fn from_schema(schema: &DatabaseSchema) -> Self {
        Self::from_tables(&schema.tables)
    }

    /// Build a dependency graph over `tables`. Each table becomes a node and
    /// each FK a directed edge from child to parent. FKs that reference a
    /// table outside the set are skipped.
    pub fn from_tables(tables: &IndexMap<String, Table>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for table_name in tables.keys() {
            let idx = graph.add_node(table_name.clone());
            node_indices.insert(table_name.clone(), idx);
        }

        for (table_name, table) in tables {
            for fk in &table.foreign_keys {
                let (Some(&from_idx), Some(&to_idx)) = (
                    node_indices.get(table_name),
                    node_indices.get(&fk.referenced_table),
                ) else {
                    tracing::warn!(
                        table = %table_name,
                        fk = %fk.name,
                        referenced = %fk.referenced_table,
                        "Foreign key references a table outside this run, ignoring"
                    );
                    continue;
                };

                let is_nullable = fk
                    .child_columns()
                    .all(|col| table.column(col).is_some_and(|c| c.nullable));

                graph.add_edge(
                    from_idx,
                    to_idx,
                    EdgeInfo {
                        fk_name: fk.name.clone(),
                        source_columns: fk.child_columns().map(str::to_string).collect(),
                        referenced_columns: fk.parent_columns().map(str::to_string).collect(),
                        is_nullable,
                        is_deferrable: fk.deferrable,
                    },
                );
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether `table` has a foreign key to itself.
    pub fn has_self_reference(&self, idx: NodeIndex) -> bool {
        self.graph.find_edge(idx, idx).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::*;

    fn make_test_schema() -> DatabaseSchema {
        let mut schema = DatabaseSchema::new(Dialect::Postgres, "test".to_string());

        let mut users = Table::new("users");
        users.columns.push(Column::new("id", SqlType::Integer));
        users.primary_key = vec!["id".to_string()];
        schema.add_table(users);

        let mut orders = Table::new("orders");
        orders.columns.push(Column::new("id", SqlType::Integer));
        let mut user_id = Column::new("user_id", SqlType::Integer);
        user_id.nullable = false;
        orders.columns.push(user_id);
        orders
            .foreign_keys
            .push(ForeignKey::new("users", [("user_id", "id")]));
        schema.add_table(orders);

        let mut items = Table::new("order_items");
        items.columns.push(Column::new("order_id", SqlType::Integer));
        items
            .foreign_keys
            .push(ForeignKey::new("orders", [("order_id", "id")]));
        items
            .foreign_keys
            .push(ForeignKey::new("warehouses", [("order_id", "id")]));
        schema.add_table(items);

        schema
    }

    #[test]
    fn test_build_graph() {
        let schema = make_test_schema();
        let graph = DependencyGraph::from_schema(&schema);

        assert_eq!(graph.table_count(), 3);
        // the FK to an unknown table is dropped
        assert_eq!(graph.graph.edge_count(), 2);
        let names: Vec<&String> = graph.graph.node_weights().collect();
        assert_eq!(names, vec!["users", "orders", "order_items"]);
    }

    #[test]
    fn test_edge_nullability() {
        let schema = make_test_schema();
        let graph = DependencyGraph::from_schema(&schema);

        let orders = graph.node_indices["orders"];
        let users = graph.node_indices["users"];
        let edge = graph.graph.find_edge(orders, users).unwrap();
        assert!(!graph.graph[edge].is_nullable);

        let items = graph.node_indices["order_items"];
        let edge = graph.graph.find_edge(items, orders).unwrap();
        assert!(graph.graph[edge].is_nullable);
        assert_eq!(graph.graph[edge].fk_name, "fk_orders_order_id");
    }
}
