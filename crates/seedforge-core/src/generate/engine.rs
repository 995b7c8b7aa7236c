use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::Result;
use crate::generate::context::{GenerationContext, GenerationOptions};
use crate::generate::foreign_key::{resolve_foreign_keys, PendingUpdate};
use crate::generate::rows::{generate_table_rows, TableRequest};
use crate::generate::value::Row;
use crate::graph::{DependencyGraph, GenerationOrder};
use crate::schema::types::{DatabaseSchema, Table};

/// The result of one generation run.
#[derive(Debug)]
pub struct GeneratedData {
    /// Table name -> rows, in generation order. Each row keeps column order.
    pub tables: IndexMap<String, Vec<Row>>,
    /// FK assignments applied by UPDATE after every INSERT.
    pub pending_updates: Vec<PendingUpdate>,
    pub order: GenerationOrder,
    /// The seed actually used, so a run can be reproduced.
    pub seed: u64,
}

impl GeneratedData {
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Generate rows for every table of `schema`.
///
/// Tables are visited parents first. Each table's rows are generated in
/// full, then the foreign key resolver fills FK columns from parent rows
/// and collects the updates that must run after the inserts.
///
/// `progress` is called with `(table, tables_done, tables_total)` after each
/// table.
pub fn generate(
    schema: &DatabaseSchema,
    options: &GenerationOptions,
    progress: Option<&dyn Fn(&str, usize, usize)>,
) -> Result<GeneratedData> {
    schema.validate()?;

    let tables = select_tables(schema, options);
    let graph = DependencyGraph::from_tables(&tables);
    let order = GenerationOrder::compute(&graph, &options.break_cycle_at);

    let mut ctx = GenerationContext::new(options);
    let mut data: IndexMap<String, Vec<Row>> = IndexMap::with_capacity(tables.len());
    let total = order.tables().len();

    for (done, table_name) in order.tables().iter().enumerate() {
        let Some(table) = tables.get(table_name) else {
            continue;
        };
        let table_options = options.table(table_name);

        let mut request = TableRequest::new(table, options.rows_for(table_name));
        if let Some(t) = table_options {
            request.excluded = &t.exclude_columns;
            request.rules = &t.repeat;
        }
        request.resolved_columns = resolved_columns(table, &tables);

        let generated = generate_table_rows(&request, &mut ctx)?;
        data.insert(table_name.clone(), generated.rows);

        if let Some(cb) = progress {
            cb(table_name, done + 1, total);
        }
    }

    let pending_updates = resolve_foreign_keys(&tables, &order, &mut data, options.deferred, &mut ctx)?;

    info!(
        seed = ctx.seed,
        tables = data.len(),
        order = %order.tables().join(", "),
        "Generated seed data"
    );

    Ok(GeneratedData {
        tables: data,
        pending_updates,
        order,
        seed: ctx.seed,
    })
}

/// Apply include/exclude filters and UUID column overrides.
///
/// `include` is closed over FK parents so every required reference has rows
/// to point at. `exclude` wins over `include`.
fn select_tables(schema: &DatabaseSchema, options: &GenerationOptions) -> IndexMap<String, Table> {
    let mut wanted: IndexSet<&str> = if options.include.is_empty() {
        schema.tables.keys().map(String::as_str).collect()
    } else {
        options.include.iter().map(String::as_str).collect()
    };

    if !options.include.is_empty() {
        let mut i = 0;
        while i < wanted.len() {
            let name = wanted[i];
            match schema.tables.get(name) {
                Some(table) => {
                    for fk in &table.foreign_keys {
                        wanted.insert(fk.referenced_table.as_str());
                    }
                }
                None => warn!(table = name, "Included table does not exist in the schema"),
            }
            i += 1;
        }
    }

    let excluded: HashSet<&str> = options.exclude.iter().map(String::as_str).collect();

    schema
        .tables
        .values()
        .filter(|t| wanted.contains(t.name.as_str()) && !excluded.contains(t.name.as_str()))
        .map(|t| {
            let mut table = t.clone();
            if let Some(uuid_columns) = options.table(&t.name).map(|o| &o.uuid_columns) {
                for column in &mut table.columns {
                    if uuid_columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
                        *column = column.with_uuid_override(true);
                    }
                }
            }
            (table.name.clone(), table)
        })
        .collect()
}

/// FK child columns the resolver will assign. References to tables outside
/// the run keep generated values.
fn resolved_columns(table: &Table, tables: &IndexMap<String, Table>) -> HashSet<String> {
    let mut columns = HashSet::new();
    for fk in &table.foreign_keys {
        if tables.contains_key(&fk.referenced_table) {
            columns.extend(fk.child_columns().map(str::to_string));
        } else {
            warn!(
                table = %table.name,
                fk = %fk.name,
                referenced = %fk.referenced_table,
                "Foreign key references a table outside this run, values are generated unchecked"
            );
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::context::TableOptions;
    use crate::generate::value::Value;
    use crate::schema::types::{Column, Dialect, ForeignKey, SqlType};
    use std::cell::RefCell;

    fn shop() -> DatabaseSchema {
        let mut schema = DatabaseSchema::new(Dialect::Postgres, "shop".to_string());

        let mut orders = Table::new("orders");
        orders.columns.push(Column::new("id", SqlType::Integer));
        let mut customer = Column::new("customer_id", SqlType::Integer);
        customer.nullable = false;
        orders.columns.push(customer);
        orders.primary_key = vec!["id".to_string()];
        orders
            .foreign_keys
            .push(ForeignKey::new("customers", [("customer_id", "id")]));

        let mut customers = Table::new("customers");
        customers.columns.push(Column::new("id", SqlType::Integer));
        customers
            .columns
            .push(Column::new("email", SqlType::VarChar { length: Some(60) }));
        customers.primary_key = vec!["id".to_string()];

        let mut audit = Table::new("audit");
        let mut reference = Column::new("ref", SqlType::Char { length: Some(36) });
        reference.nullable = false;
        audit.columns.push(reference);

        schema.add_table(orders);
        schema.add_table(customers);
        schema.add_table(audit);
        schema.normalize();
        schema
    }

    fn options() -> GenerationOptions {
        GenerationOptions {
            default_rows: 10,
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_orders_parents_first() {
        let data = generate(&shop(), &options(), None).unwrap();
        let names: Vec<&String> = data.tables.keys().collect();
        assert_eq!(names, vec!["customers", "orders", "audit"]);
        assert_eq!(data.seed, 42);
        assert_eq!(data.total_rows(), 30);

        let ids: HashSet<i64> = data.tables["customers"]
            .iter()
            .map(|r| r["id"].as_int().unwrap())
            .collect();
        for row in &data.tables["orders"] {
            assert!(ids.contains(&row["customer_id"].as_int().unwrap()));
        }
    }

    #[test]
    fn test_same_seed_same_rows() {
        let a = generate(&shop(), &options(), None).unwrap();
        let b = generate(&shop(), &options(), None).unwrap();
        assert_eq!(a.tables, b.tables);
    }

    #[test]
    fn test_include_pulls_in_parents_and_exclude_drops() {
        let mut opts = options();
        opts.include = vec!["orders".to_string()];
        let data = generate(&shop(), &opts, None).unwrap();
        assert!(data.tables.contains_key("customers"));
        assert!(!data.tables.contains_key("audit"));

        let mut opts = options();
        opts.exclude = vec!["audit".to_string()];
        let data = generate(&shop(), &opts, None).unwrap();
        assert!(!data.tables.contains_key("audit"));
    }

    #[test]
    fn test_uuid_override_and_progress() {
        let mut opts = options();
        opts.tables.insert(
            "audit".to_string(),
            TableOptions {
                uuid_columns: vec!["ref".to_string()],
                rows: Some(3),
                ..Default::default()
            },
        );
        let seen = RefCell::new(Vec::new());
        let cb = |table: &str, done: usize, total: usize| {
            seen.borrow_mut().push((table.to_string(), done, total));
        };
        let data = generate(&shop(), &opts, Some(&cb)).unwrap();

        assert_eq!(data.tables["audit"].len(), 3);
        for row in &data.tables["audit"] {
            assert!(matches!(row["ref"], Value::Uuid(_)));
        }
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last().map(|s| (s.1, s.2)), Some((3, 3)));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let mut schema = shop();
        schema.tables["orders"].primary_key = vec!["missing".to_string()];
        assert!(generate(&schema, &options(), None).is_err());
    }
}
