//! Query Executor for arclite
//!
//! This module executes logical plans and returns results. Reads go through
//! the connection's transaction view; writes are staged in its transaction
//! and reach the table store on commit.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::RwLock;

use super::cursor::Cursor;
use super::eval::BoundExpr;
use super::planner::{LogicalPlan, Projection, RowTarget, SortKey};
use crate::catalog::{Catalog, Column, TableDef};
use crate::error::{Error, Result};
use crate::storage::{RowMutator, SharedMutator, Table, TableStore, Tuple, Value, WriteOp};
use crate::transaction::TransactionManager;

/// Outcome of one statement
#[derive(Debug)]
pub struct QueryResult {
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    affected_rows: usize,
    /// Result rows (for SELECT)
    cursor: Option<Cursor>,
}

impl QueryResult {
    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize) -> Self {
        Self {
            affected_rows: count,
            cursor: None,
        }
    }

    /// Create a result carrying a cursor
    pub fn with_cursor(cursor: Cursor) -> Self {
        Self {
            affected_rows: 0,
            cursor: Some(cursor),
        }
    }

    pub fn affected_rows(&self) -> usize {
        self.affected_rows
    }

    /// Whether the statement produced a result set
    pub fn produced_results(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn cursor_mut(&mut self) -> Option<&mut Cursor> {
        self.cursor.as_mut()
    }

    pub fn into_cursor(self) -> Option<Cursor> {
        self.cursor
    }
}

/// Applies UPDATE assignments to a row; every assignment sees the old row
#[derive(Debug)]
struct Assign {
    assignments: Vec<(usize, BoundExpr)>,
}

impl RowMutator for Assign {
    fn mutate(&self, row: &mut Tuple) -> Result<()> {
        let updates = self
            .assignments
            .iter()
            .map(|(position, expr)| Ok((*position, expr.evaluate(row.values())?)))
            .collect::<Result<Vec<_>>>()?;

        for (position, value) in updates {
            row.set(position, value);
        }
        Ok(())
    }
}

/// Execution Engine
pub struct ExecutionEngine<'a> {
    /// System catalog
    catalog: &'a Catalog,
    /// Table storage shared by every connection of a database
    store: &'a RwLock<TableStore>,
    /// The connection's transactions
    transactions: &'a mut TransactionManager,
    /// Commit implicitly opened transactions after each statement
    auto_commit: bool,
    /// Liveness flag handed to cursors
    connection_open: &'a Arc<AtomicBool>,
}

impl<'a> ExecutionEngine<'a> {
    /// Create a new execution engine
    pub fn new(
        catalog: &'a Catalog,
        store: &'a RwLock<TableStore>,
        transactions: &'a mut TransactionManager,
        connection_open: &'a Arc<AtomicBool>,
    ) -> Self {
        Self {
            catalog,
            store,
            transactions,
            auto_commit: true,
            connection_open,
        }
    }

    /// Set the auto-commit mode for this execution
    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    /// Execute a logical plan
    pub fn execute(&mut self, plan: LogicalPlan) -> Result<QueryResult> {
        match plan {
            LogicalPlan::CreateTable {
                table_name,
                columns,
                if_not_exists,
            } => self.execute_create_table(&table_name, columns, if_not_exists),
            LogicalPlan::DropTable {
                table_name,
                if_exists,
            } => self.execute_drop_table(&table_name, if_exists),
            LogicalPlan::Select {
                table,
                projection,
                predicate,
                order_by,
                limit,
            } => self.execute_select(&table, &projection, predicate.as_ref(), &order_by, limit),
            LogicalPlan::BeginTransaction => self.execute_begin(),
            LogicalPlan::Commit => self.execute_commit(),
            LogicalPlan::Rollback => self.execute_rollback(),
            dml => self.execute_dml(dml),
        }
    }

    // ========== Transaction control ==========

    fn execute_begin(&mut self) -> Result<QueryResult> {
        let version = self.store.read().version();
        let id = self.transactions.begin(version)?;
        tracing::info!(txn = id, "transaction started");
        Ok(QueryResult::with_affected_rows(0))
    }

    fn execute_commit(&mut self) -> Result<QueryResult> {
        let mut store = self.store.write();
        self.transactions.commit(&mut store)?;
        Ok(QueryResult::with_affected_rows(0))
    }

    fn execute_rollback(&mut self) -> Result<QueryResult> {
        self.transactions.rollback()?;
        Ok(QueryResult::with_affected_rows(0))
    }

    // ========== DDL ==========

    fn execute_create_table(
        &mut self,
        table_name: &str,
        columns: Vec<Column>,
        if_not_exists: bool,
    ) -> Result<QueryResult> {
        if if_not_exists && self.catalog.table_exists(table_name) {
            tracing::debug!(table = table_name, "table exists, skipping create");
            return Ok(QueryResult::with_affected_rows(0));
        }

        let def = self.catalog.define_table(table_name, columns)?;
        if let Err(err) = self.store.write().create_table(def) {
            // Keep the catalog and the store in step
            self.catalog.drop_table(table_name).ok();
            return Err(err);
        }
        Ok(QueryResult::with_affected_rows(0))
    }

    fn execute_drop_table(&mut self, table_name: &str, if_exists: bool) -> Result<QueryResult> {
        if if_exists && !self.catalog.table_exists(table_name) {
            return Ok(QueryResult::with_affected_rows(0));
        }

        self.catalog.drop_table(table_name)?;
        self.store.write().drop_table(table_name)?;
        Ok(QueryResult::with_affected_rows(0))
    }

    // ========== DML ==========

    /// Stage an INSERT, UPDATE or DELETE.
    ///
    /// Without an active transaction the statement runs in one of its own,
    /// committed at once when auto-commit is on and left open otherwise.
    fn execute_dml(&mut self, plan: LogicalPlan) -> Result<QueryResult> {
        let implicit = !self.transactions.is_active();
        if implicit {
            let version = self.store.read().version();
            self.transactions.begin(version)?;
        }

        let count = match self.stage_writes(plan) {
            Ok(count) => count,
            Err(err) => {
                if implicit {
                    let id = self.transactions.rollback()?;
                    tracing::warn!(txn = id, error = %err, "statement failed, implicit transaction rolled back");
                }
                return Err(err);
            }
        };

        if implicit && self.auto_commit {
            let mut store = self.store.write();
            self.transactions.commit(&mut store)?;
        }

        Ok(QueryResult::with_affected_rows(count))
    }

    /// Validate a DML plan against the transaction's view and stage its writes.
    ///
    /// Returns the number of rows the statement affects in that view.
    fn stage_writes(&mut self, plan: LogicalPlan) -> Result<usize> {
        let (writes, count) = {
            let store = self.store.read();
            match plan {
                LogicalPlan::Insert { table, rows } => {
                    let view = self.transactions.view(&store, &table.name)?;
                    check_new_keys(&view, &rows)?;

                    let count = rows.len();
                    let writes = rows
                        .into_iter()
                        .map(|row| WriteOp::Insert {
                            table: table.name.clone(),
                            row,
                        })
                        .collect::<Vec<_>>();
                    (writes, count)
                }
                LogicalPlan::Update {
                    table,
                    assignments,
                    target,
                } => {
                    let view = self.transactions.view(&store, &table.name)?;
                    let (keys, count) = resolve_target(&view, target)?;
                    let mutator: SharedMutator = Arc::new(Assign { assignments });

                    // Surface type and NULL errors now rather than at commit
                    for key in keys.iter().filter(|key| view.contains_key(key)) {
                        view.prepare_update(key, mutator.as_ref())?;
                    }

                    let writes = keys
                        .into_iter()
                        .map(|key| WriteOp::Update {
                            table: table.name.clone(),
                            key,
                            mutator: mutator.clone(),
                        })
                        .collect::<Vec<_>>();
                    (writes, count)
                }
                LogicalPlan::Delete { table, target } => {
                    let view = self.transactions.view(&store, &table.name)?;
                    let (keys, count) = resolve_target(&view, target)?;
                    let writes = keys
                        .into_iter()
                        .map(|key| WriteOp::Delete {
                            table: table.name.clone(),
                            key,
                        })
                        .collect::<Vec<_>>();
                    (writes, count)
                }
                other => {
                    return Err(Error::Internal(format!(
                        "not a data modification plan: {:?}",
                        other
                    )))
                }
            }
        };

        tracing::debug!(writes = writes.len(), rows = count, "staging statement");
        for write in writes {
            self.transactions.stage(write)?;
        }
        Ok(count)
    }

    // ========== SELECT ==========

    fn execute_select(
        &mut self,
        table: &TableDef,
        projection: &[Projection],
        predicate: Option<&BoundExpr>,
        order_by: &[SortKey],
        limit: Option<usize>,
    ) -> Result<QueryResult> {
        let store = self.store.read();
        let view = self.transactions.view(&store, &table.name)?;

        let mut rows = Vec::new();
        for row in view.scan() {
            let keep = match predicate {
                Some(pred) => pred.matches(row.values())?,
                None => true,
            };
            if keep {
                rows.push(row);
            }
        }

        if !order_by.is_empty() {
            let mut keyed = rows
                .into_iter()
                .map(|row| {
                    let keys = order_by
                        .iter()
                        .map(|key| key.expr.evaluate(row.values()))
                        .collect::<Result<Vec<_>>>()?;
                    Ok((keys, row))
                })
                .collect::<Result<Vec<_>>>()?;
            keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(a, b, order_by));
            rows = keyed.into_iter().map(|(_, row)| row).collect();
        }

        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        let output = rows
            .into_iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|p| p.expr.evaluate(row.values()))
                    .collect::<Result<Tuple>>()
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(table = %table.name, rows = output.len(), "select materialized");
        let columns = projection.iter().map(|p| p.name.clone()).collect();
        Ok(QueryResult::with_cursor(Cursor::new(
            columns,
            output,
            self.connection_open.clone(),
        )))
    }
}

/// Keys of the rows an UPDATE or DELETE addresses, and how many of them exist
fn resolve_target(view: &Table, target: RowTarget) -> Result<(Vec<Value>, usize)> {
    match target {
        RowTarget::Key(key) => {
            let key = view.normalize_key(key);
            let count = usize::from(view.contains_key(&key));
            Ok((vec![key], count))
        }
        RowTarget::Filter(predicate) => {
            let mut keys = Vec::new();
            for row in view.scan() {
                let hit = match &predicate {
                    Some(pred) => pred.matches(row.values())?,
                    None => true,
                };
                if hit {
                    keys.push(view.key_of(row).clone());
                }
            }
            let count = keys.len();
            Ok((keys, count))
        }
    }
}

/// Reject rows whose key is already taken, in the view or earlier in the batch
fn check_new_keys(view: &Table, rows: &[Tuple]) -> Result<()> {
    let mut batch = HashSet::new();
    for row in rows {
        let key = view.key_of(row);
        if view.contains_key(key) || !batch.insert(key) {
            return Err(Error::PrimaryKeyViolation {
                table: view.name().to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

fn compare_sort_keys(a: &[Value], b: &[Value], order_by: &[SortKey]) -> Ordering {
    for ((x, y), key) in a.iter().zip(b).zip(order_by) {
        let ord = sort_order(x, y);
        let ord = if key.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Total order for sorting; NaN sorts after every other number
fn sort_order(x: &Value, y: &Value) -> Ordering {
    match (x, y) {
        (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
        (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(b),
        (Value::Float(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
        _ => x.compare(y).unwrap_or(Ordering::Equal),
    }
}
