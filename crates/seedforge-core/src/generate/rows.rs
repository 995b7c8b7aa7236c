//! # Row Generator
//!
//! Drives the value generator across every column of a table. Repetition
//! rules are emitted first, then filler rows up to the requested total.
//! Excluded columns are left out of the rows entirely; foreign key columns
//! that the resolver will fill are left as `Null` placeholders.
//!
//! After a table is complete, numeric values that fell outside their
//! inferred bounds are redrawn with `generate_numeric_within_bounds`.

use indexmap::IndexMap;
use rand::Rng;
use std::collections::HashSet;

use crate::constraint::{effective_constraint, parse_combinations, CombinationConstraint, ParsedConstraint};
use crate::error::{Result, SeedForgeError};
use crate::generate::coerce::coerce_literal;
use crate::generate::context::{GenerationContext, RepetitionRule};
use crate::generate::providers::{generate_column_value, generate_numeric_within_bounds};
use crate::generate::unique::UniqueTracker;
use crate::generate::value::{Row, Value};
use crate::schema::types::{Column, Table};

/// Everything the row generator needs to know about one table.
pub struct TableRequest<'a> {
    pub table: &'a Table,
    pub rows: usize,
    /// Columns left out of every row.
    pub excluded: &'a [String],
    pub rules: &'a [RepetitionRule],
    /// Foreign key columns the resolver assigns afterwards.
    pub resolved_columns: HashSet<String>,
}

impl<'a> TableRequest<'a> {
    pub fn new(table: &'a Table, rows: usize) -> Self {
        Self {
            table,
            rows,
            excluded: &[],
            rules: &[],
            resolved_columns: HashSet::new(),
        }
    }

    fn is_excluded(&self, column: &str) -> bool {
        self.excluded.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Generated rows plus the per-column constraints they were drawn under.
#[derive(Debug, Default)]
pub struct TableRows {
    pub rows: Vec<Row>,
    pub constraints: IndexMap<String, ParsedConstraint>,
}

/// Values a repetition block pins for all of its rows.
struct Block {
    remaining: usize,
    values: IndexMap<String, Value>,
}

pub fn generate_table_rows(request: &TableRequest, ctx: &mut GenerationContext) -> Result<TableRows> {
    let table = request.table;
    if table.columns.is_empty() || request.rows == 0 {
        return Ok(TableRows::default());
    }

    let constraints: IndexMap<String, ParsedConstraint> = table
        .columns
        .iter()
        .map(|c| (c.name.clone(), effective_constraint(c, &table.check_constraints)))
        .collect();

    let combinations = table_combinations(request);
    let unique_columns = unique_column_set(table);

    let mut tracker = UniqueTracker::new();
    for group in key_groups(table) {
        let trackable = group
            .iter()
            .all(|c| !request.is_excluded(c) && !request.resolved_columns.contains(c));
        if trackable {
            tracker.register_constraint(&group);
        }
    }

    let mut blocks = build_blocks(request, &constraints, ctx);
    let mut rows = Vec::with_capacity(request.rows);
    let mut pinned_columns: Vec<Vec<String>> = Vec::with_capacity(request.rows);

    for row_index in 0..request.rows {
        let pinned = next_block_values(&mut blocks);
        let mut row = Row::with_capacity(table.columns.len());

        let chosen = pick_combinations(&combinations, ctx);
        for column in &table.columns {
            if request.is_excluded(&column.name) {
                continue;
            }
            let value = if let Some(v) = pinned.and_then(|p| p.get(&column.name)) {
                v.clone()
            } else if let Some(v) = chosen.get(&column.name) {
                v.clone()
            } else if request.resolved_columns.contains(&column.name) {
                Value::Null
            } else {
                let distinct = column.primary_key || unique_columns.contains(&column.name);
                generate_column_value(column, &constraints[&column.name], row_index, distinct, ctx)
            };
            row.insert(column.name.clone(), value);
        }

        let mut attempt = 0;
        while let Some(group) = tracker.find_collision(&row).map(<[String]>::to_vec) {
            attempt += 1;
            let regenerable: Vec<&Column> = group
                .iter()
                .filter(|c| pinned.is_none_or(|p| !p.contains_key(*c)))
                .filter_map(|c| table.column(c))
                .collect();
            if attempt > tracker.max_retries || regenerable.is_empty() {
                return Err(SeedForgeError::UniqueExhausted {
                    table: table.name.clone(),
                    columns: group.join(", "),
                    row_index,
                    max_retries: tracker.max_retries,
                });
            }
            // shift the row index so sequential generators move past the taken value
            let salted = row_index + attempt * request.rows;
            for column in regenerable {
                let value =
                    generate_column_value(column, &constraints[&column.name], salted, true, ctx);
                row.insert(column.name.clone(), value);
            }
        }
        tracker.record(&row);
        rows.push(row);
        pinned_columns.push(pinned.map(|p| p.keys().cloned().collect()).unwrap_or_default());
    }

    revalidate_numeric(request, &mut rows, &pinned_columns, &constraints, ctx);

    tracing::debug!(table = %table.name, rows = rows.len(), "Generated rows");
    Ok(TableRows { rows, constraints })
}

/// Primary key first, then declared unique keys.
pub(crate) fn key_groups(table: &Table) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    if !table.primary_key.is_empty() {
        groups.push(table.primary_key.clone());
    }
    for key in &table.unique_keys {
        if !key.is_empty() && !groups.contains(key) {
            groups.push(key.clone());
        }
    }
    groups
}

/// Columns that are unique on their own.
fn unique_column_set(table: &Table) -> HashSet<String> {
    key_groups(table)
        .into_iter()
        .filter(|g| g.len() == 1)
        .flatten()
        .collect()
}

/// Combination constraints whose columns all exist, mapped to real column
/// names, skipping those touching excluded or resolver-owned columns.
fn table_combinations<'a>(
    request: &TableRequest<'a>,
) -> Vec<(CombinationConstraint, Vec<&'a Column>)> {
    parse_combinations(&request.table.check_constraints)
        .into_iter()
        .filter_map(|combo| {
            let columns: Vec<&Column> = combo
                .columns
                .iter()
                .map(|name| {
                    request
                        .table
                        .columns
                        .iter()
                        .find(|c| c.name.eq_ignore_ascii_case(name))
                })
                .collect::<Option<_>>()?;
            let usable = columns.iter().all(|c| {
                !request.is_excluded(&c.name) && !request.resolved_columns.contains(&c.name)
            });
            usable.then_some((combo, columns))
        })
        .collect()
}

/// Draw one allowed assignment per combination constraint.
fn pick_combinations(
    combinations: &[(CombinationConstraint, Vec<&Column>)],
    ctx: &mut GenerationContext,
) -> IndexMap<String, Value> {
    let mut chosen = IndexMap::new();
    for (combo, columns) in combinations {
        if combo.combinations.is_empty() {
            continue;
        }
        let pick = &combo.combinations[ctx.rng.random_range(0..combo.combinations.len())];
        for (name, column) in combo.columns.iter().zip(columns) {
            if let Some(literal) = pick.get(name) {
                let value = coerce_literal(column, literal)
                    .unwrap_or_else(|| Value::Text(literal.clone()));
                chosen.insert(column.name.clone(), value);
            }
        }
    }
    chosen
}

fn build_blocks(
    request: &TableRequest,
    constraints: &IndexMap<String, ParsedConstraint>,
    ctx: &mut GenerationContext,
) -> Vec<Block> {
    let table = request.table;
    let mut budget = request.rows;
    let mut start = 0;
    let mut blocks = Vec::new();

    for rule in request.rules {
        let count = rule.count.min(budget);
        if count == 0 {
            continue;
        }
        let mut values = IndexMap::new();

        for (name, literal) in &rule.fixed {
            let Some(column) = table.column(name) else {
                tracing::warn!(table = %table.name, column = %name, "Repeat rule names an unknown column");
                continue;
            };
            let value = coerce_literal(column, literal).unwrap_or_else(|| {
                tracing::warn!(
                    table = %table.name,
                    column = %name,
                    literal = %literal,
                    "Fixed value does not fit column type, using NULL"
                );
                Value::Null
            });
            values.insert(column.name.clone(), value);
        }

        for name in &rule.shared {
            let Some(column) = table.column(name) else {
                tracing::warn!(table = %table.name, column = %name, "Repeat rule names an unknown column");
                continue;
            };
            if values.contains_key(&column.name) {
                continue;
            }
            let value = generate_column_value(column, &constraints[&column.name], start, false, ctx);
            values.insert(column.name.clone(), value);
        }

        blocks.push(Block {
            remaining: count,
            values,
        });
        budget -= count;
        start += count;
    }
    blocks.reverse();
    blocks
}

/// Values of the block the next row belongs to, or `None` for filler rows.
fn next_block_values(blocks: &mut Vec<Block>) -> Option<&IndexMap<String, Value>> {
    while blocks.last().is_some_and(|b| b.remaining == 0) {
        blocks.pop();
    }
    let block = blocks.last_mut()?;
    block.remaining -= 1;
    Some(&block.values)
}

/// Redraw numeric values found outside their bounds. Allowed-set members,
/// keys, sequences and resolver-owned columns are left alone, as are values
/// a repetition block pins (`pinned[i]` lists them for row `i`).
fn revalidate_numeric(
    request: &TableRequest,
    rows: &mut [Row],
    pinned: &[Vec<String>],
    constraints: &IndexMap<String, ParsedConstraint>,
    ctx: &mut GenerationContext,
) {
    for column in &request.table.columns {
        if !column.sql_type.is_numeric()
            || column.primary_key
            || column.auto_increment
            || request.resolved_columns.contains(&column.name)
        {
            continue;
        }
        let Some(constraint) = constraints.get(&column.name) else {
            continue;
        };
        if !constraint.has_numeric_bounds() {
            continue;
        }
        let lo = constraint.min.unwrap_or(f64::MIN);
        let hi = constraint.max.unwrap_or(f64::MAX);

        let mut fixed = 0usize;
        let mut kept = 0usize;
        for (i, row) in rows.iter_mut().enumerate() {
            let Some(value) = row.get_mut(&column.name) else {
                continue;
            };
            let Some(n) = value.as_f64() else {
                continue;
            };
            if constraint.contains(n) || constraint.allowed_values.contains(&value.to_string()) {
                continue;
            }
            if pinned.get(i).is_some_and(|p| p.contains(&column.name)) {
                kept += 1;
                continue;
            }
            *value = generate_numeric_within_bounds(column, lo, hi, ctx);
            fixed += 1;
        }
        if kept > 0 {
            tracing::warn!(
                table = %request.table.name,
                column = %column.name,
                rows = kept,
                "Repeat rule value lies outside the column's CHECK bounds, keeping it"
            );
        }
        if fixed > 0 {
            tracing::debug!(
                table = %request.table.name,
                column = %column.name,
                fixed,
                "Revalidated out-of-bounds numeric values"
            );
        }
    }
}
