//! # Generation Order
//!
//! Orders tables so every parent is generated before its children. Foreign
//! key cycles are found with Tarjan's strongly-connected-components
//! algorithm; the condensation of the graph is then sorted topologically,
//! using catalog order as the tie-break so the result is reproducible.
//!
//! Inside a cycle group some edges cannot point to an earlier table. Those
//! are chosen by priority (user `break_cycle_at`, nullable, deferrable, then
//! the first edge in catalog order) and reported as deferred edges. The
//! foreign key resolver either fills them directly (deferred transactions)
//! or through post-insert UPDATEs.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::graph::dag::{DependencyGraph, EdgeInfo};

/// One strongly connected component of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    /// Position of the component in generation order.
    pub id: usize,
    /// Member tables in generation order.
    pub tables: Vec<String>,
    /// More than one member, or a table referencing itself.
    pub cyclic: bool,
}

/// A foreign key edge whose parent is not generated before the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredEdge {
    pub fk_name: String,
    pub source_table: String,
    pub source_columns: Vec<String>,
    pub target_table: String,
    pub target_columns: Vec<String>,
}

/// The computed table order plus SCC membership.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOrder {
    tables: Vec<String>,
    components: Vec<Component>,
    deferred_edges: Vec<DeferredEdge>,
    #[serde(skip)]
    component_index: HashMap<String, usize>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl GenerationOrder {
    /// Compute the order for every table in `graph`.
    ///
    /// `break_at` lists `table.column` entries whose FK should be the first
    /// choice for deferral when ordering members of a cycle group.
    pub fn compute(graph: &DependencyGraph, break_at: &[String]) -> Self {
        let g = &graph.graph;

        let mut sccs = tarjan_scc(g);
        for scc in &mut sccs {
            scc.sort_by_key(|n| n.index());
        }

        let mut scc_of: HashMap<NodeIndex, usize> = HashMap::new();
        for (i, scc) in sccs.iter().enumerate() {
            for &node in scc {
                scc_of.insert(node, i);
            }
        }

        // Condensation: child component waits on each distinct parent component.
        let mut waiting_on: Vec<HashSet<usize>> = vec![HashSet::new(); sccs.len()];
        let mut dependents: Vec<HashSet<usize>> = vec![HashSet::new(); sccs.len()];
        for edge in g.edge_references() {
            let child = scc_of[&edge.source()];
            let parent = scc_of[&edge.target()];
            if child != parent {
                waiting_on[child].insert(parent);
                dependents[parent].insert(child);
            }
        }

        let catalog_key = |i: usize| sccs[i][0].index();
        let mut ready: BTreeSet<(usize, usize)> = (0..sccs.len())
            .filter(|&i| waiting_on[i].is_empty())
            .map(|i| (catalog_key(i), i))
            .collect();

        let mut order = GenerationOrder::default();
        while let Some((_, current)) = ready.pop_first() {
            let members = &sccs[current];
            let cyclic = members.len() > 1 || graph.has_self_reference(members[0]);

            let (member_order, deferred) = if cyclic {
                order_cycle_group(graph, members, break_at)
            } else {
                (members.clone(), Vec::new())
            };

            order.push_component(graph, member_order, cyclic);
            order.deferred_edges.extend(deferred);

            let mut children: Vec<usize> = dependents[current].iter().copied().collect();
            children.sort_unstable();
            for child in children {
                waiting_on[child].remove(&current);
                if waiting_on[child].is_empty() {
                    ready.insert((catalog_key(child), child));
                }
            }
        }

        tracing::debug!(
            tables = order.tables.len(),
            components = order.components.len(),
            deferred = order.deferred_edges.len(),
            "Computed generation order"
        );
        order
    }

    fn push_component(&mut self, graph: &DependencyGraph, members: Vec<NodeIndex>, cyclic: bool) {
        let id = self.components.len();
        let tables: Vec<String> = members
            .iter()
            .map(|&n| graph.table_name(n).to_string())
            .collect();
        for table in &tables {
            self.positions.insert(table.clone(), self.tables.len());
            self.component_index.insert(table.clone(), id);
            self.tables.push(table.clone());
        }
        self.components.push(Component { id, tables, cyclic });
    }

    /// Tables in generation order, parents first.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Cycle groups only.
    pub fn cycles(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.cyclic)
    }

    pub fn component_of(&self, table: &str) -> Option<&Component> {
        self.component_index
            .get(table)
            .map(|&id| &self.components[id])
    }

    pub fn is_cyclic(&self, table: &str) -> bool {
        self.component_of(table).is_some_and(|c| c.cyclic)
    }

    pub fn position(&self, table: &str) -> Option<usize> {
        self.positions.get(table).copied()
    }

    /// Whether `parent` is generated strictly before `child`.
    pub fn precedes(&self, parent: &str, child: &str) -> bool {
        match (self.position(parent), self.position(child)) {
            (Some(p), Some(c)) => p < c,
            _ => false,
        }
    }

    pub fn deferred_edges(&self) -> &[DeferredEdge] {
        &self.deferred_edges
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Order the members of one cycle group and report the edges that end up
/// pointing forward (to a later member, or to the table itself).
fn order_cycle_group(
    graph: &DependencyGraph,
    members: &[NodeIndex],
    break_at: &[String],
) -> (Vec<NodeIndex>, Vec<DeferredEdge>) {
    let g = &graph.graph;
    let member_set: HashSet<NodeIndex> = members.iter().copied().collect();

    let mut deferred = Vec::new();
    let mut internal: Vec<(NodeIndex, NodeIndex, &EdgeInfo)> = Vec::new();
    for &node in members {
        let mut edges: Vec<_> = g
            .edges(node)
            .filter(|e| member_set.contains(&e.target()))
            .collect();
        edges.sort_by_key(|e| e.id().index());
        for edge in edges {
            if edge.target() == node {
                deferred.push(deferred_edge(graph, node, node, edge.weight()));
            } else {
                internal.push((node, edge.target(), edge.weight()));
            }
        }
    }

    let mut removed: HashSet<usize> = HashSet::new();
    loop {
        let remaining: Vec<usize> = (0..internal.len())
            .filter(|i| !removed.contains(i))
            .collect();

        let mut local: DiGraph<NodeIndex, usize> = DiGraph::new();
        let local_idx: HashMap<NodeIndex, NodeIndex> =
            members.iter().map(|&n| (n, local.add_node(n))).collect();
        for &i in &remaining {
            let (from, to, _) = internal[i];
            local.add_edge(local_idx[&from], local_idx[&to], i);
        }

        let knots: Vec<Vec<NodeIndex>> = tarjan_scc(&local)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .collect();
        if knots.is_empty() {
            break;
        }

        for knot in knots {
            let knot_members: HashSet<NodeIndex> = knot.iter().map(|&l| local[l]).collect();
            let candidates: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| {
                    let (from, to, _) = internal[i];
                    knot_members.contains(&from) && knot_members.contains(&to)
                })
                .collect();
            if let Some(pick) = pick_edge_to_defer(graph, &internal, &candidates, break_at) {
                removed.insert(pick);
            }
        }
    }

    // Topological order over the remaining edges, catalog order as tie-break.
    let mut waiting: HashMap<NodeIndex, usize> = members.iter().map(|&n| (n, 0)).collect();
    let mut children_of: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    for (i, &(from, to, _)) in internal.iter().enumerate() {
        if removed.contains(&i) {
            continue;
        }
        *waiting.entry(from).or_default() += 1;
        children_of.entry(to).or_default().push(from);
    }

    let mut ready: BTreeSet<usize> = members
        .iter()
        .filter(|n| waiting[*n] == 0)
        .map(|n| n.index())
        .collect();
    let mut ordered = Vec::with_capacity(members.len());
    while let Some(next) = ready.pop_first() {
        let node = NodeIndex::new(next);
        ordered.push(node);
        for &child in children_of.get(&node).into_iter().flatten() {
            if let Some(count) = waiting.get_mut(&child) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(child.index());
                }
            }
        }
    }

    for (i, &(from, to, info)) in internal.iter().enumerate() {
        if removed.contains(&i) {
            deferred.push(deferred_edge(graph, from, to, info));
        }
    }

    (ordered, deferred)
}

fn pick_edge_to_defer(
    graph: &DependencyGraph,
    internal: &[(NodeIndex, NodeIndex, &EdgeInfo)],
    candidates: &[usize],
    break_at: &[String],
) -> Option<usize> {
    let user_choice = candidates.iter().copied().find(|&i| {
        let (from, _, info) = internal[i];
        let table = graph.table_name(from);
        info.source_columns.iter().any(|col| {
            let qualified = format!("{}.{}", table, col);
            break_at.iter().any(|b| b.eq_ignore_ascii_case(&qualified))
        })
    });

    user_choice
        .or_else(|| candidates.iter().copied().find(|&i| internal[i].2.is_nullable))
        .or_else(|| candidates.iter().copied().find(|&i| internal[i].2.is_deferrable))
        .or_else(|| candidates.first().copied())
}

fn deferred_edge(
    graph: &DependencyGraph,
    from: NodeIndex,
    to: NodeIndex,
    info: &EdgeInfo,
) -> DeferredEdge {
    DeferredEdge {
        fk_name: info.fk_name.clone(),
        source_table: graph.table_name(from).to_string(),
        source_columns: info.source_columns.clone(),
        target_table: graph.table_name(to).to_string(),
        target_columns: info.referenced_columns.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::*;

    fn table(name: &str, fks: &[(&str, &str, bool)]) -> Table {
        let mut t = Table::new(name);
        t.columns.push(Column::new("id", SqlType::Integer));
        t.primary_key = vec!["id".to_string()];
        for &(col, parent, nullable) in fks {
            let mut c = Column::new(col, SqlType::Integer);
            c.nullable = nullable;
            t.columns.push(c);
            t.foreign_keys.push(ForeignKey::new(parent, [(col, "id")]));
        }
        t
    }

    fn order_for(tables: Vec<Table>, break_at: &[String]) -> GenerationOrder {
        let mut schema = DatabaseSchema::new(Dialect::Postgres, "test".to_string());
        for t in tables {
            schema.add_table(t);
        }
        GenerationOrder::compute(&DependencyGraph::from_schema(&schema), break_at)
    }

    #[test]
    fn test_parents_before_children() {
        let order = order_for(
            vec![
                table("order_items", &[("order_id", "orders", false)]),
                table("orders", &[("user_id", "users", false)]),
                table("users", &[]),
            ],
            &[],
        );
        assert_eq!(order.tables(), &["users", "orders", "order_items"]);
        assert!(order.deferred_edges().is_empty());
        assert!(order.cycles().next().is_none());
    }

    #[test]
    fn test_catalog_order_tie_break() {
        let order = order_for(
            vec![table("b", &[]), table("a", &[]), table("c", &[("a_id", "a", false)])],
            &[],
        );
        assert_eq!(order.tables(), &["b", "a", "c"]);
    }

    #[test]
    fn test_mutual_cycle_is_one_component() {
        let order = order_for(
            vec![
                table("a", &[("b_id", "b", false)]),
                table("b", &[("a_id", "a", true)]),
            ],
            &[],
        );
        let comp = order.component_of("a").unwrap();
        assert_eq!(comp.tables.len(), 2);
        assert!(comp.cyclic);
        assert_eq!(order.component_of("b").unwrap().id, comp.id);

        // b.a_id is nullable, so it is deferred and b goes first
        assert_eq!(order.tables(), &["b", "a"]);
        assert_eq!(order.deferred_edges().len(), 1);
        assert_eq!(order.deferred_edges()[0].source_table, "b");
    }

    #[test]
    fn test_break_at_overrides_nullability() {
        let order = order_for(
            vec![
                table("a", &[("b_id", "b", false)]),
                table("b", &[("a_id", "a", true)]),
            ],
            &["a.b_id".to_string()],
        );
        assert_eq!(order.tables(), &["a", "b"]);
        assert_eq!(order.deferred_edges()[0].source_table, "a");
    }

    #[test]
    fn test_self_reference_is_cyclic_singleton() {
        let order = order_for(
            vec![table("employees", &[("manager_id", "employees", true)])],
            &[],
        );
        let comp = order.component_of("employees").unwrap();
        assert_eq!(comp.tables, vec!["employees"]);
        assert!(comp.cyclic);
        assert!(order.is_cyclic("employees"));
        assert_eq!(order.deferred_edges().len(), 1);
    }

    #[test]
    fn test_cycle_group_after_its_parents_and_before_children() {
        let order = order_for(
            vec![
                table("reviews", &[("author_id", "authors", false)]),
                table("authors", &[("org_id", "orgs", false), ("book_id", "books", true)]),
                table("books", &[("author_id", "authors", false)]),
                table("orgs", &[]),
            ],
            &[],
        );
        let pos = |t: &str| order.position(t).unwrap();
        assert!(pos("orgs") < pos("authors"));
        assert!(pos("authors") < pos("books"));
        assert!(pos("books") < pos("reviews"));
        assert!(order.precedes("authors", "reviews"));
        assert!(!order.is_cyclic("reviews"));
    }

    #[test]
    fn test_order_is_deterministic() {
        let build = || {
            order_for(
                vec![
                    table("x", &[("y_id", "y", true)]),
                    table("y", &[("z_id", "z", true)]),
                    table("z", &[("x_id", "x", true)]),
                    table("w", &[]),
                ],
                &[],
            )
        };
        let first = build();
        let second = build();
        assert_eq!(first.tables(), second.tables());
        assert_eq!(first.components(), second.components());
        assert_eq!(first.deferred_edges(), second.deferred_edges());
    }

    #[test]
    fn test_empty_graph() {
        let order = order_for(Vec::new(), &[]);
        assert!(order.is_empty());
        assert!(order.components().is_empty());
    }
}
