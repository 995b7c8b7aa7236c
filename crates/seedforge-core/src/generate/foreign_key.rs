//! # Foreign Key Resolver
//!
//! Rewrites foreign key columns of generated rows so they reference real
//! parent keys. Tables are visited in generation order. A foreign key whose
//! parent is generated strictly earlier is filled inline. Any other foreign
//! key (self references, back edges inside a cycle group) is:
//!
//! - filled directly when the output runs with deferred constraints, since
//!   every row exists by commit time;
//! - otherwise left `NULL` and recorded as a [`PendingUpdate`] applied after
//!   the inserts. A NOT NULL column in that position cannot be inserted at
//!   all and is reported as [`SeedForgeError::UnresolvableCycle`].
//!
//! One-to-one foreign keys (`unique_on_fk`) draw parents without replacement.
//!
//! Primary and unique keys that contain foreign key columns are checked once
//! every foreign key of a row has a parent; a repeated tuple redraws the
//! parents. A key made only of foreign key columns is drawn without
//! replacement from the product of its parents' keys.

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{Result, SeedForgeError};
use crate::generate::context::GenerationContext;
use crate::generate::rows::key_groups;
use crate::generate::unique::UniqueTracker;
use crate::generate::value::{Row, Value};
use crate::graph::GenerationOrder;
use crate::schema::types::{ForeignKey, Table};

/// Largest parent key product enumerated for a key made only of foreign key
/// columns. Larger products fall back to redrawing on collision.
const JOINT_POOL_LIMIT: usize = 1 << 20;

/// A post-insert correction: set `values` on the row of `table` identified
/// by `key`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingUpdate {
    pub table: String,
    pub fk_name: String,
    /// FK column -> parent key value
    pub values: IndexMap<String, Value>,
    /// PK column -> value of the row to update
    pub key: IndexMap<String, Value>,
}

/// How candidate parents are drawn for one foreign key.
enum Sampler {
    Uniform,
    /// Remaining parent indices, consumed from the back.
    WithoutReplacement(Vec<usize>),
}

impl Sampler {
    fn next(&mut self, len: usize, rng: &mut impl Rng) -> Option<usize> {
        match self {
            Sampler::Uniform => Some(rng.random_range(0..len)),
            Sampler::WithoutReplacement(pool) => pool.pop(),
        }
    }

    /// Put an index back so a later row can still use it.
    fn give_back(&mut self, idx: usize) {
        if let Sampler::WithoutReplacement(pool) = self {
            pool.insert(0, idx);
        }
    }
}

/// One foreign key of the table being resolved.
struct FkPlan<'a> {
    fk: &'a ForeignKey,
    child_columns: Vec<&'a str>,
    parent_columns: Vec<&'a str>,
    nullable: bool,
    self_reference: bool,
    /// Written in the INSERT itself: the parent comes earlier, or the
    /// script defers constraint checks.
    direct: bool,
    candidates: Vec<Vec<Value>>,
    sampler: Sampler,
}

impl FkPlan<'_> {
    fn touches(&self, group: &[String]) -> bool {
        self.child_columns
            .iter()
            .any(|c| group.iter().any(|g| g == c))
    }

    /// Parent index for `row`, or `None` for a NULL reference.
    fn draw(
        &mut self,
        row: &Row,
        row_index: usize,
        table: &str,
        null_probability: f64,
        rng: &mut impl Rng,
    ) -> Result<Option<usize>> {
        if self.candidates.is_empty() || (self.nullable && rng.random_bool(null_probability)) {
            return Ok(None);
        }
        self.pick(row, row_index, table, rng)
    }

    /// A non-NULL parent. `None` only once a nullable one-to-one key runs out.
    fn pick(
        &mut self,
        row: &Row,
        row_index: usize,
        table: &str,
        rng: &mut impl Rng,
    ) -> Result<Option<usize>> {
        let len = self.candidates.len();
        let Some(mut pick) = self.sampler.next(len, rng) else {
            if self.nullable {
                return Ok(None);
            }
            return Err(SeedForgeError::ForeignKeyExhausted {
                table: table.to_string(),
                columns: self.fk.column_list(),
                target_table: self.fk.referenced_table.clone(),
                row_index,
            });
        };

        // a row should not be its own parent when another parent exists
        if self.self_reference && len > 1 {
            let own_key: Vec<Value> = self
                .parent_columns
                .iter()
                .map(|c| row.get(*c).cloned().unwrap_or(Value::Null))
                .collect();
            if own_key == self.candidates[pick] {
                if let Some(other) = self.sampler.next(len, rng) {
                    self.sampler.give_back(pick);
                    pick = other;
                }
                if own_key == self.candidates[pick] {
                    pick = (pick + 1) % len;
                }
            }
        }
        Ok(Some(pick))
    }

    /// Replace a parent whose key tuple was already taken.
    fn redraw(
        &mut self,
        old: usize,
        row: &Row,
        row_index: usize,
        table: &str,
        rng: &mut impl Rng,
    ) -> Result<Option<usize>> {
        let next = self.pick(row, row_index, table, rng)?;
        self.sampler.give_back(old);
        Ok(next)
    }
}

/// Without-replacement draws over the product of several foreign keys'
/// parents, for a key whose columns all belong to those foreign keys.
struct JointPool {
    group: Vec<String>,
    /// Plan indices, one mixed-radix digit each.
    members: Vec<usize>,
    remaining: Vec<usize>,
}

impl JointPool {
    fn build(group: &[String], plans: &[FkPlan], rng: &mut impl Rng) -> Option<Self> {
        let members: Vec<usize> = plans
            .iter()
            .enumerate()
            .filter(|(_, p)| p.touches(group))
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            return None;
        }
        let members_inside = members.iter().all(|&i| {
            let plan = &plans[i];
            !plan.fk.unique_on_fk
                && !plan.self_reference
                && plan
                    .child_columns
                    .iter()
                    .all(|c| group.iter().any(|g| g == c))
        });
        let group_covered = group
            .iter()
            .all(|g| members.iter().any(|&i| plans[i].child_columns.contains(&g.as_str())));
        if !members_inside || !group_covered {
            return None;
        }

        let size = members
            .iter()
            .try_fold(1usize, |acc, &i| acc.checked_mul(plans[i].candidates.len()))?;
        if size == 0 || size > JOINT_POOL_LIMIT {
            return None;
        }
        let mut remaining: Vec<usize> = (0..size).collect();
        remaining.shuffle(rng);
        Some(Self {
            group: group.to_vec(),
            members,
            remaining,
        })
    }

    /// Overwrite the members' picks with the next unused combination. Rows
    /// where a member drew NULL are left alone. False once the pool is spent.
    fn take(&mut self, plans: &[FkPlan], picks: &mut [Option<usize>]) -> bool {
        if self.members.iter().any(|&i| picks[i].is_none()) {
            return true;
        }
        let Some(mut combination) = self.remaining.pop() else {
            return false;
        };
        for &i in &self.members {
            let len = plans[i].candidates.len();
            picks[i] = Some(combination % len);
            combination /= len;
        }
        true
    }
}

/// Resolve every foreign key of every generated table.
pub fn resolve_foreign_keys(
    tables: &IndexMap<String, Table>,
    order: &GenerationOrder,
    data: &mut IndexMap<String, Vec<Row>>,
    deferred: bool,
    ctx: &mut GenerationContext,
) -> Result<Vec<PendingUpdate>> {
    let mut pending = Vec::new();

    for table_name in order.tables() {
        let Some(table) = tables.get(table_name) else {
            continue;
        };
        pending.extend(resolve_table(table, order, data, deferred, ctx)?);
    }

    if !pending.is_empty() {
        tracing::info!(updates = pending.len(), "Recorded post-insert foreign key updates");
    }
    Ok(pending)
}

fn resolve_table(
    table: &Table,
    order: &GenerationOrder,
    data: &mut IndexMap<String, Vec<Row>>,
    deferred: bool,
    ctx: &mut GenerationContext,
) -> Result<Vec<PendingUpdate>> {
    let Some(first) = data.get(&table.name).and_then(|rows| rows.first()) else {
        return Ok(Vec::new());
    };

    let mut plans = Vec::new();
    for fk in &table.foreign_keys {
        let Some(parent_rows) = data.get(&fk.referenced_table) else {
            continue;
        };
        if let Some(plan) = plan_foreign_key(table, fk, first, parent_rows, order, deferred, ctx)? {
            plans.push(plan);
        }
    }
    if plans.is_empty() {
        return Ok(Vec::new());
    }

    // keys the row generator could not check because they hold FK columns
    let tracked: Vec<Vec<String>> = key_groups(table)
        .into_iter()
        .filter(|g| g.iter().all(|c| first.contains_key(c)))
        .filter(|g| plans.iter().any(|p| p.touches(g)))
        .collect();
    let mut key_columns: Vec<String> = Vec::new();
    let mut tracker = UniqueTracker::new();
    for group in &tracked {
        tracker.register_constraint(group);
        for column in group {
            if !key_columns.contains(column) {
                key_columns.push(column.clone());
            }
        }
    }
    let mut pools: Vec<JointPool> = tracked
        .iter()
        .filter_map(|g| JointPool::build(g, &plans, &mut ctx.rng))
        .collect();

    let null_probability = ctx.null_probability();
    let rows = data
        .get_mut(&table.name)
        .ok_or_else(|| SeedForgeError::InvalidSchema {
            table: table.name.clone(),
            message: "generated rows disappeared during foreign key resolution".to_string(),
        })?;

    let mut pending: Vec<Vec<PendingUpdate>> = plans.iter().map(|_| Vec::new()).collect();
    for (row_index, row) in rows.iter_mut().enumerate() {
        let mut picks = Vec::with_capacity(plans.len());
        for plan in plans.iter_mut() {
            picks.push(plan.draw(row, row_index, &table.name, null_probability, &mut ctx.rng)?);
        }
        for pool in pools.iter_mut() {
            if !pool.take(&plans, &mut picks) {
                return Err(exhausted(table, &pool.group, row_index, tracker.max_retries));
            }
        }

        let mut attempt = 0;
        loop {
            let view = key_view(row, &key_columns, &plans, &picks);
            let collision = tracker.find_collision(&view).map(<[String]>::to_vec);
            let Some(group) = collision else {
                tracker.record(&view);
                break;
            };
            attempt += 1;
            if attempt > tracker.max_retries {
                return Err(exhausted(table, &group, row_index, tracker.max_retries));
            }
            if let Some(pool) = pools.iter_mut().find(|p| p.group == group) {
                if !pool.take(&plans, &mut picks) {
                    return Err(exhausted(table, &group, row_index, tracker.max_retries));
                }
                continue;
            }
            for (i, plan) in plans.iter_mut().enumerate() {
                if !plan.touches(&group) {
                    continue;
                }
                if let Some(old) = picks[i] {
                    picks[i] = plan.redraw(old, row, row_index, &table.name, &mut ctx.rng)?;
                }
            }
        }

        apply_picks(table, row, &plans, &picks, &mut pending);
    }

    for (plan, updates) in plans.iter().zip(&pending) {
        tracing::debug!(
            table = %table.name,
            fk = %plan.fk.name,
            direct = plan.direct,
            deferred_updates = updates.len(),
            "Resolved foreign key"
        );
    }
    Ok(pending.into_iter().flatten().collect())
}

/// Check the policy for one foreign key and collect its candidate parents.
/// `None` when the FK columns were excluded from the rows.
fn plan_foreign_key<'a>(
    table: &Table,
    fk: &'a ForeignKey,
    sample_row: &Row,
    parent_rows: &[Row],
    order: &GenerationOrder,
    deferred: bool,
    ctx: &mut GenerationContext,
) -> Result<Option<FkPlan<'a>>> {
    let child_columns: Vec<&str> = fk.child_columns().collect();
    // excluded FK columns are not ours to fill
    if child_columns.iter().any(|c| !sample_row.contains_key(*c)) {
        return Ok(None);
    }
    let parent_columns: Vec<&str> = fk.parent_columns().collect();

    let nullable = child_columns
        .iter()
        .all(|c| table.column(c).is_some_and(|col| col.nullable));
    let self_reference = fk.referenced_table == table.name;
    let inline = !self_reference && order.precedes(&fk.referenced_table, &table.name);

    if !inline && !deferred && !nullable {
        return Err(SeedForgeError::UnresolvableCycle {
            table: table.name.clone(),
            columns: fk.column_list(),
        });
    }
    if !inline && !deferred && table.primary_key.is_empty() {
        return Err(SeedForgeError::MissingPrimaryKey {
            table: table.name.clone(),
            fk_name: fk.name.clone(),
        });
    }

    let candidates = parent_keys(parent_rows, &parent_columns);
    if candidates.is_empty() {
        if !nullable {
            return Err(SeedForgeError::ForeignKeyResolution {
                source_table: table.name.clone(),
                source_columns: fk.column_list(),
                target_table: fk.referenced_table.clone(),
            });
        }
        tracing::warn!(
            table = %table.name,
            fk = %fk.name,
            "Referenced table has no usable keys, leaving foreign key NULL"
        );
    }

    let sampler = if fk.unique_on_fk {
        let mut pool: Vec<usize> = (0..candidates.len()).collect();
        pool.shuffle(&mut ctx.rng);
        Sampler::WithoutReplacement(pool)
    } else {
        Sampler::Uniform
    };

    Ok(Some(FkPlan {
        fk,
        child_columns,
        parent_columns,
        nullable,
        self_reference,
        direct: inline || deferred,
        candidates,
        sampler,
    }))
}

/// The key columns of `row` as they will read once every FK is applied,
/// including values that only arrive by post-insert UPDATE.
fn key_view(row: &Row, columns: &[String], plans: &[FkPlan], picks: &[Option<usize>]) -> Row {
    let mut view: Row = columns
        .iter()
        .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
        .collect();
    for (plan, pick) in plans.iter().zip(picks) {
        for (i, column) in plan.child_columns.iter().enumerate() {
            if let Some(slot) = view.get_mut(*column) {
                *slot = pick
                    .map(|p| plan.candidates[p][i].clone())
                    .unwrap_or(Value::Null);
            }
        }
    }
    view
}

/// Write the chosen parents into `row`, or record them as pending updates.
fn apply_picks(
    table: &Table,
    row: &mut Row,
    plans: &[FkPlan],
    picks: &[Option<usize>],
    pending: &mut [Vec<PendingUpdate>],
) {
    for (plan, pick) in plans.iter().zip(picks) {
        let parent = pick.map(|p| &plan.candidates[p]);
        if plan.direct || parent.is_none() {
            set_columns(row, &plan.child_columns, parent);
        }
    }

    for (i, (plan, pick)) in plans.iter().zip(picks).enumerate() {
        let Some(p) = pick else {
            continue;
        };
        if plan.direct {
            continue;
        }
        set_columns(row, &plan.child_columns, None);
        let key: IndexMap<String, Value> = table
            .primary_key
            .iter()
            .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
            .collect();
        let values: IndexMap<String, Value> = plan
            .child_columns
            .iter()
            .zip(&plan.candidates[*p])
            .map(|(c, v)| (c.to_string(), v.clone()))
            .collect();
        pending[i].push(PendingUpdate {
            table: table.name.clone(),
            fk_name: plan.fk.name.clone(),
            values,
            key,
        });
    }
}

fn exhausted(table: &Table, group: &[String], row_index: usize, max_retries: usize) -> SeedForgeError {
    SeedForgeError::UniqueExhausted {
        table: table.name.clone(),
        columns: group.join(", "),
        row_index,
        max_retries,
    }
}

/// Complete key tuples of the parent rows, in row order.
fn parent_keys(rows: &[Row], columns: &[&str]) -> Vec<Vec<Value>> {
    rows.iter()
        .filter_map(|row| {
            columns
                .iter()
                .map(|c| row.get(*c).filter(|v| !v.is_absent()).cloned())
                .collect::<Option<Vec<Value>>>()
        })
        .collect()
}

fn set_columns(row: &mut Row, columns: &[&str], values: Option<&Vec<Value>>) {
    for (i, column) in columns.iter().enumerate() {
        let value = values
            .and_then(|v| v.get(i))
            .cloned()
            .unwrap_or(Value::Null);
        if let Some(slot) = row.get_mut(*column) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::context::GenerationOptions;
    use crate::graph::DependencyGraph;
    use crate::schema::types::{Column, SqlType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn employees(nullable_manager: bool) -> Table {
        let mut t = Table::new("employees");
        let mut id = Column::new("id", SqlType::Integer);
        id.primary_key = true;
        id.nullable = false;
        t.columns.push(id);
        let mut manager = Column::new("manager_id", SqlType::Integer);
        manager.nullable = nullable_manager;
        t.columns.push(manager);
        t.primary_key = vec!["id".to_string()];
        t.foreign_keys
            .push(ForeignKey::new("employees", [("manager_id", "id")]));
        t
    }

    fn rows_with_ids(n: i64, fk: &str) -> Vec<Row> {
        (1..=n)
            .map(|i| {
                let mut r = Row::new();
                r.insert("id".to_string(), Value::Int(i));
                r.insert(fk.to_string(), Value::Null);
                r
            })
            .collect()
    }

    fn setup(tables: Vec<Table>) -> (IndexMap<String, Table>, GenerationOrder) {
        let map: IndexMap<String, Table> = tables.into_iter().map(|t| (t.name.clone(), t)).collect();
        let order = GenerationOrder::compute(&DependencyGraph::from_tables(&map), &[]);
        (map, order)
    }

    fn options(null_probability: f64) -> GenerationOptions {
        GenerationOptions {
            seed: Some(7),
            null_probability,
            ..Default::default()
        }
    }

    #[test]
    fn test_self_reference_non_deferred_creates_updates() {
        let (tables, order) = setup(vec![employees(true)]);
        let mut data = IndexMap::new();
        data.insert("employees".to_string(), rows_with_ids(20, "manager_id"));
        let opts = options(0.0);
        let mut ctx = GenerationContext::new(&opts);

        let pending = resolve_foreign_keys(&tables, &order, &mut data, false, &mut ctx).unwrap();

        assert_eq!(data["employees"][0]["manager_id"], Value::Null);
        assert_eq!(pending.len(), 20);
        let ids: HashSet<i64> = (1..=20).collect();
        for update in &pending {
            let target = update.values["manager_id"].as_int().unwrap();
            assert!(ids.contains(&target));
            assert_ne!(Some(target), update.key["id"].as_int());
        }
    }

    #[test]
    fn test_self_reference_deferred_assigns_directly() {
        let (tables, order) = setup(vec![employees(false)]);
        let mut data = IndexMap::new();
        data.insert("employees".to_string(), rows_with_ids(10, "manager_id"));
        let opts = options(0.0);
        let mut ctx = GenerationContext::new(&opts);

        let pending = resolve_foreign_keys(&tables, &order, &mut data, true, &mut ctx).unwrap();

        assert!(pending.is_empty());
        for row in &data["employees"] {
            let m = row["manager_id"].as_int().unwrap();
            assert!((1..=10).contains(&m));
        }
    }

    #[test]
    fn test_not_null_cycle_without_deferral_is_an_error() {
        let (tables, order) = setup(vec![employees(false)]);
        let mut data = IndexMap::new();
        data.insert("employees".to_string(), rows_with_ids(3, "manager_id"));
        let opts = options(0.0);
        let mut ctx = GenerationContext::new(&opts);

        let err = resolve_foreign_keys(&tables, &order, &mut data, false, &mut ctx).unwrap_err();
        match err {
            SeedForgeError::UnresolvableCycle { table, columns } => {
                assert_eq!(table, "employees");
                assert_eq!(columns, "manager_id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn parent_child(unique: bool, parents: i64, children: i64, nullable: bool) -> (IndexMap<String, Table>, GenerationOrder, IndexMap<String, Vec<Row>>) {
        let mut users = Table::new("users");
        users.columns.push(Column::new("id", SqlType::Integer));
        users.primary_key = vec!["id".to_string()];

        let mut profiles = Table::new("profiles");
        profiles.columns.push(Column::new("id", SqlType::Integer));
        let mut user_id = Column::new("user_id", SqlType::Integer);
        user_id.nullable = nullable;
        profiles.columns.push(user_id);
        profiles.primary_key = vec!["id".to_string()];
        let fk = ForeignKey::new("users", [("user_id", "id")]);
        profiles.foreign_keys.push(if unique { fk.unique() } else { fk });

        let (tables, order) = setup(vec![profiles, users]);
        let mut data = IndexMap::new();
        data.insert("users".to_string(), rows_with_ids(parents, "unused"));
        data.insert("profiles".to_string(), rows_with_ids(children, "user_id"));
        (tables, order, data)
    }

    #[test]
    fn test_inline_references_existing_parents() {
        let (tables, order, mut data) = parent_child(false, 5, 40, false);
        let opts = options(0.5);
        let mut ctx = GenerationContext::new(&opts);

        let pending = resolve_foreign_keys(&tables, &order, &mut data, false, &mut ctx).unwrap();
        assert!(pending.is_empty());
        for row in &data["profiles"] {
            let u = row["user_id"].as_int().unwrap();
            assert!((1..=5).contains(&u));
        }
    }

    #[test]
    fn test_one_to_one_samples_without_replacement() {
        let (tables, order, mut data) = parent_child(true, 10, 10, false);
        let opts = options(0.0);
        let mut ctx = GenerationContext::new(&opts);

        resolve_foreign_keys(&tables, &order, &mut data, false, &mut ctx).unwrap();
        let used: HashSet<i64> = data["profiles"]
            .iter()
            .map(|r| r["user_id"].as_int().unwrap())
            .collect();
        assert_eq!(used.len(), 10);
    }

    #[test]
    fn test_one_to_one_exhaustion() {
        let (tables, order, mut data) = parent_child(true, 3, 5, false);
        let opts = options(0.0);
        let mut ctx = GenerationContext::new(&opts);
        let err = resolve_foreign_keys(&tables, &order, &mut data, false, &mut ctx).unwrap_err();
        assert!(matches!(err, SeedForgeError::ForeignKeyExhausted { row_index: 3, .. }));

        let (tables, order, mut data) = parent_child(true, 3, 5, true);
        let mut ctx = GenerationContext::new(&opts);
        resolve_foreign_keys(&tables, &order, &mut data, false, &mut ctx).unwrap();
        let nulls = data["profiles"].iter().filter(|r| r["user_id"].is_null()).count();
        assert_eq!(nulls, 2);
    }

    #[test]
    fn test_empty_parent_for_required_fk_is_an_error() {
        let (tables, order, mut data) = parent_child(false, 0, 2, false);
        let opts = options(0.0);
        let mut ctx = GenerationContext::new(&opts);
        let err = resolve_foreign_keys(&tables, &order, &mut data, false, &mut ctx).unwrap_err();
        assert!(matches!(err, SeedForgeError::ForeignKeyResolution { .. }));
    }

    fn plan(fk: &ForeignKey, parents: i64) -> FkPlan<'_> {
        FkPlan {
            fk,
            child_columns: fk.child_columns().collect(),
            parent_columns: fk.parent_columns().collect(),
            nullable: false,
            self_reference: false,
            direct: true,
            candidates: (1..=parents).map(|i| vec![Value::Int(i)]).collect(),
            sampler: Sampler::Uniform,
        }
    }

    #[test]
    fn test_joint_pool_walks_the_whole_product() {
        let posts = ForeignKey::new("posts", [("post_id", "id")]);
        let tags = ForeignKey::new("tags", [("tag_id", "id")]);
        let plans = vec![plan(&posts, 3), plan(&tags, 2)];
        let group = vec!["post_id".to_string(), "tag_id".to_string()];
        let mut rng = StdRng::seed_from_u64(3);
        let mut pool = JointPool::build(&group, &plans, &mut rng).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..6 {
            let mut picks = vec![Some(0), Some(0)];
            assert!(pool.take(&plans, &mut picks));
            assert!(seen.insert((picks[0].unwrap(), picks[1].unwrap())));
        }
        let mut picks = vec![Some(0), Some(0)];
        assert!(!pool.take(&plans, &mut picks));

        // rows with a NULL member keep their picks
        let mut picks = vec![None, Some(1)];
        assert!(pool.take(&plans, &mut picks));
        assert_eq!(picks, vec![None, Some(1)]);

        let mixed = vec!["post_id".to_string(), "kind".to_string()];
        assert!(JointPool::build(&mixed, &plans, &mut rng).is_none());
    }
}
