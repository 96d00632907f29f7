//! Query Planner for arclite
//!
//! This module converts parsed SQL AST into executable plans. Planning binds
//! every parameter, resolves every table and column name, and checks the
//! shape of inserted rows, so errors of that kind surface before anything
//! is staged.

use std::sync::Arc;

use super::eval::{Binder, BoundExpr};
use crate::catalog::{Catalog, Column, TableDef};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::storage::{conform_row, Tuple, Value};

/// Which rows an UPDATE or DELETE addresses
#[derive(Debug, Clone, PartialEq)]
pub enum RowTarget {
    /// `WHERE pk = value`
    Key(Value),
    /// Any other predicate, or none for every row
    Filter(Option<BoundExpr>),
}

/// One output column of a SELECT
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub name: String,
    pub expr: BoundExpr,
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: BoundExpr,
    pub ascending: bool,
}

/// Logical plan node
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Create table
    CreateTable {
        table_name: String,
        columns: Vec<Column>,
        if_not_exists: bool,
    },
    /// Drop table
    DropTable { table_name: String, if_exists: bool },
    /// Insert rows that already match the table's shape
    Insert {
        table: Arc<TableDef>,
        rows: Vec<Tuple>,
    },
    /// Update table
    Update {
        table: Arc<TableDef>,
        /// Column position and new value, evaluated against the old row
        assignments: Vec<(usize, BoundExpr)>,
        target: RowTarget,
    },
    /// Delete from table
    Delete {
        table: Arc<TableDef>,
        target: RowTarget,
    },
    /// Filter, sort, limit and project one table
    Select {
        table: Arc<TableDef>,
        projection: Vec<Projection>,
        predicate: Option<BoundExpr>,
        order_by: Vec<SortKey>,
        limit: Option<usize>,
    },
    /// Begin transaction
    BeginTransaction,
    /// Commit transaction
    Commit,
    /// Rollback transaction
    Rollback,
}

/// Check a positional parameter list against a statement's slot count
pub fn check_parameters(param_count: usize, params: &[Value]) -> Result<()> {
    if params.len() > param_count {
        return Err(Error::ParameterOutOfRange {
            index: param_count + 1,
            count: param_count,
        });
    }
    if params.len() < param_count {
        return Err(Error::UnboundParameter(params.len() + 1));
    }
    Ok(())
}

/// Collect bound parameter slots; every slot must be filled
pub fn collect_bindings(slots: &[Option<Value>]) -> Result<Vec<Value>> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| slot.clone().ok_or(Error::UnboundParameter(i + 1)))
        .collect()
}

/// Query planner
pub struct Planner<'a> {
    catalog: &'a Catalog,
    params: &'a [Value],
}

impl<'a> Planner<'a> {
    /// Create a new planner
    pub fn new(catalog: &'a Catalog, params: &'a [Value]) -> Self {
        Self { catalog, params }
    }

    /// Plan a statement
    pub fn plan(&self, stmt: &Statement) -> Result<LogicalPlan> {
        match stmt {
            Statement::CreateTable(create) => self.plan_create_table(create),
            Statement::DropTable(drop) => Ok(LogicalPlan::DropTable {
                table_name: drop.table_name.clone(),
                if_exists: drop.if_exists,
            }),
            Statement::Insert(insert) => self.plan_insert(insert),
            Statement::Update(update) => self.plan_update(update),
            Statement::Delete(delete) => self.plan_delete(delete),
            Statement::Select(select) => self.plan_select(select),
            Statement::BeginTransaction => Ok(LogicalPlan::BeginTransaction),
            Statement::Commit => Ok(LogicalPlan::Commit),
            Statement::Rollback => Ok(LogicalPlan::Rollback),
        }
    }

    fn plan_create_table(&self, create: &CreateTableStatement) -> Result<LogicalPlan> {
        let name = &create.table_name;
        let mut columns: Vec<Column> = create
            .columns
            .iter()
            .map(|def| {
                let mut col = Column::new(def.name.clone(), def.data_type.clone())
                    .nullable(!def.not_null)
                    .primary_key(def.primary_key);
                if let Some((table, column)) = &def.references {
                    col = col.references(table.clone(), column.clone());
                }
                col
            })
            .collect();

        for constraint in &create.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns: keys } => {
                    let [key] = keys.as_slice() else {
                        return Err(Error::invalid_schema(
                            name,
                            "composite primary keys are not supported",
                        ));
                    };
                    let col = find_column(&mut columns, name, key)?;
                    *col = col.clone().primary_key(true);
                }
                TableConstraint::ForeignKey {
                    columns: keys,
                    ref_table,
                    ref_columns,
                } => {
                    let ([key], [ref_column]) = (keys.as_slice(), ref_columns.as_slice()) else {
                        return Err(Error::invalid_schema(
                            name,
                            "foreign keys must name exactly one column on each side",
                        ));
                    };
                    let col = find_column(&mut columns, name, key)?;
                    *col = col.clone().references(ref_table.clone(), ref_column.clone());
                }
            }
        }

        Ok(LogicalPlan::CreateTable {
            table_name: name.clone(),
            columns,
            if_not_exists: create.if_not_exists,
        })
    }

    fn plan_insert(&self, insert: &InsertStatement) -> Result<LogicalPlan> {
        let table = self.catalog.lookup(&insert.table_name)?;
        let schema = table.schema();

        // Map each supplied value to its column position
        let positions: Vec<usize> = match &insert.columns {
            Some(names) => {
                let mut positions = Vec::with_capacity(names.len());
                for column in names {
                    let position = schema.get_column_index(column).ok_or_else(|| {
                        Error::UnknownColumn {
                            column: column.clone(),
                            table: table.name.clone(),
                        }
                    })?;
                    if positions.contains(&position) {
                        return Err(Error::InvalidOperation(format!(
                            "column '{}' specified more than once",
                            column
                        )));
                    }
                    positions.push(position);
                }
                positions
            }
            None => (0..schema.column_count()).collect(),
        };

        let binder = Binder::new(None, &table.name, self.params);
        let mut rows = Vec::with_capacity(insert.values.len());
        for exprs in &insert.values {
            if exprs.len() != positions.len() {
                return Err(Error::ArityMismatch {
                    table: table.name.clone(),
                    expected: positions.len(),
                    found: exprs.len(),
                });
            }

            let mut values = vec![Value::Null; schema.column_count()];
            for (expr, &position) in exprs.iter().zip(&positions) {
                values[position] = binder.bind(expr)?.evaluate(&[])?;
            }
            rows.push(conform_row(&table, Tuple::new(values))?);
        }

        Ok(LogicalPlan::Insert { table, rows })
    }

    fn plan_update(&self, update: &UpdateStatement) -> Result<LogicalPlan> {
        let table = self.catalog.lookup(&update.table_name)?;
        let binder = Binder::new(Some(table.schema()), &table.name, self.params);

        let assignments = update
            .assignments
            .iter()
            .map(|assignment| {
                let position = table
                    .schema()
                    .get_column_index(&assignment.column)
                    .ok_or_else(|| Error::UnknownColumn {
                        column: assignment.column.clone(),
                        table: table.name.clone(),
                    })?;
                Ok((position, binder.bind(&assignment.value)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let target = self.row_target(&table, &binder, update.where_clause.as_ref())?;
        Ok(LogicalPlan::Update {
            table,
            assignments,
            target,
        })
    }

    fn plan_delete(&self, delete: &DeleteStatement) -> Result<LogicalPlan> {
        let table = self.catalog.lookup(&delete.table_name)?;
        let binder = Binder::new(Some(table.schema()), &table.name, self.params);
        let target = self.row_target(&table, &binder, delete.where_clause.as_ref())?;
        Ok(LogicalPlan::Delete { table, target })
    }

    fn row_target(
        &self,
        table: &TableDef,
        binder: &Binder<'_>,
        where_clause: Option<&Expr>,
    ) -> Result<RowTarget> {
        let Some(expr) = where_clause else {
            return Ok(RowTarget::Filter(None));
        };
        let predicate = binder.bind(expr)?;

        Ok(match key_lookup(&predicate, table.primary_key) {
            Some(key) => RowTarget::Key(key),
            None => RowTarget::Filter(Some(predicate)),
        })
    }

    fn plan_select(&self, select: &SelectStatement) -> Result<LogicalPlan> {
        let table = self.catalog.lookup(&select.from)?;
        let schema = table.schema();
        let binder = Binder::new(Some(schema), &table.name, self.params);

        let mut projection = Vec::new();
        for item in &select.columns {
            match item {
                SelectItem::Wildcard => {
                    projection.extend(schema.columns().iter().map(|col| Projection {
                        name: col.name.clone(),
                        expr: BoundExpr::Column(col.position),
                    }));
                }
                SelectItem::Expr { expr, alias } => {
                    let name = match (alias, expr) {
                        (Some(alias), _) => alias.clone(),
                        (None, Expr::Column(column)) => column.clone(),
                        (None, other) => other.to_string(),
                    };
                    projection.push(Projection {
                        name,
                        expr: binder.bind(expr)?,
                    });
                }
            }
        }

        let predicate = select
            .where_clause
            .as_ref()
            .map(|expr| binder.bind(expr))
            .transpose()?;

        let mut order_by = Vec::with_capacity(select.order_by.len());
        for item in &select.order_by {
            // An output alias may stand in for its expression
            let aliased = match &item.expr {
                Expr::Column(name) if !schema.has_column(name) => projection
                    .iter()
                    .find(|p| &p.name == name)
                    .map(|p| p.expr.clone()),
                _ => None,
            };
            let expr = match aliased {
                Some(expr) => expr,
                None => binder.bind(&item.expr)?,
            };
            order_by.push(SortKey {
                expr,
                ascending: item.ascending,
            });
        }

        let limit = select
            .limit
            .as_ref()
            .map(|expr| self.plan_limit(expr, &table.name))
            .transpose()?;

        Ok(LogicalPlan::Select {
            table,
            projection,
            predicate,
            order_by,
            limit,
        })
    }

    fn plan_limit(&self, expr: &Expr, table: &str) -> Result<usize> {
        let value = Binder::new(None, table, self.params)
            .bind(expr)?
            .evaluate(&[])?;
        value
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "LIMIT must be a non-negative integer, got {}",
                    value
                ))
            })
    }
}

fn find_column<'c>(columns: &'c mut [Column], table: &str, name: &str) -> Result<&'c mut Column> {
    columns
        .iter_mut()
        .find(|col| col.name == name)
        .ok_or_else(|| Error::UnknownColumn {
            column: name.to_string(),
            table: table.to_string(),
        })
}

/// The key value of a `pk = constant` predicate
fn key_lookup(predicate: &BoundExpr, primary_key: usize) -> Option<Value> {
    let BoundExpr::Binary {
        left,
        op: BinaryOperator::Eq,
        right,
    } = predicate
    else {
        return None;
    };

    let key = match (left.as_ref(), right.as_ref()) {
        (BoundExpr::Column(pos), BoundExpr::Constant(v))
        | (BoundExpr::Constant(v), BoundExpr::Column(pos))
            if *pos == primary_key =>
        {
            v
        }
        _ => return None,
    };
    (!key.is_null()).then(|| key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataType, TableBuilder};
    use crate::sql::Parser;

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        TableBuilder::new("account")
            .primary_key("id")
            .column_not_null("balance", DataType::Integer)
            .column("note", DataType::Varchar(4))
            .build(&catalog)
            .unwrap();
        catalog
    }

    fn plan(catalog: &Catalog, sql: &str, params: &[Value]) -> Result<LogicalPlan> {
        let stmt = Parser::new(sql)?.parse()?;
        Planner::new(catalog, params).plan(&stmt)
    }

    #[test]
    fn test_check_parameters() {
        assert!(check_parameters(2, &[1.into(), 2.into()]).is_ok());
        assert_eq!(
            check_parameters(2, &[1.into()]),
            Err(Error::UnboundParameter(2))
        );
        assert_eq!(
            check_parameters(0, &[1.into()]),
            Err(Error::ParameterOutOfRange { index: 1, count: 0 })
        );
        assert_eq!(
            collect_bindings(&[Some(1.into()), None]),
            Err(Error::UnboundParameter(2))
        );
    }

    #[test]
    fn test_plan_insert() {
        let catalog = catalog();
        let LogicalPlan::Insert { rows, .. } = plan(
            &catalog,
            "INSERT INTO account (balance, id) VALUES (?, ?), (5, 2)",
            &[Value::Integer(100), Value::Integer(1)],
        )
        .unwrap() else {
            panic!("expected insert plan");
        };

        assert_eq!(
            rows,
            vec![
                Tuple::new(vec![1.into(), 100.into(), Value::Null]),
                Tuple::new(vec![2.into(), 5.into(), Value::Null]),
            ]
        );
    }

    #[test]
    fn test_insert_shape_errors() {
        let catalog = catalog();
        assert!(matches!(
            plan(&catalog, "INSERT INTO account VALUES (1, 2)", &[]),
            Err(Error::ArityMismatch { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            plan(&catalog, "INSERT INTO account (id) VALUES (1)", &[]),
            Err(Error::NullNotAllowed(_))
        ));
        assert!(matches!(
            plan(&catalog, "INSERT INTO account (id, nope) VALUES (1, 2)", &[]),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            plan(&catalog, "INSERT INTO account VALUES (1, 2, 'toolong')", &[]),
            Err(Error::ValueTooLarge { .. })
        ));
        assert!(matches!(
            plan(&catalog, "INSERT INTO ghost VALUES (1)", &[]),
            Err(Error::UnknownTable(_))
        ));
    }

    #[test]
    fn test_keyed_targets() {
        let catalog = catalog();

        let LogicalPlan::Update { target, assignments, .. } = plan(
            &catalog,
            "UPDATE account SET balance = balance - ? WHERE id = ?",
            &[Value::Integer(50), Value::Integer(2)],
        )
        .unwrap() else {
            panic!("expected update plan");
        };
        assert_eq!(target, RowTarget::Key(Value::Integer(2)));
        assert_eq!(assignments[0].0, 1);

        let LogicalPlan::Delete { target, .. } =
            plan(&catalog, "DELETE FROM account WHERE 7 = id", &[]).unwrap()
        else {
            panic!("expected delete plan");
        };
        assert_eq!(target, RowTarget::Key(Value::Integer(7)));

        let LogicalPlan::Delete { target, .. } =
            plan(&catalog, "DELETE FROM account WHERE balance = 7", &[]).unwrap()
        else {
            panic!("expected delete plan");
        };
        assert!(matches!(target, RowTarget::Filter(Some(_))));
    }

    #[test]
    fn test_plan_select() {
        let catalog = catalog();
        let LogicalPlan::Select {
            projection,
            order_by,
            limit,
            ..
        } = plan(
            &catalog,
            "SELECT id, balance * 2 AS doubled, note || '!' FROM account ORDER BY doubled DESC LIMIT ?",
            &[Value::Integer(3)],
        )
        .unwrap()
        else {
            panic!("expected select plan");
        };

        let names: Vec<_> = projection.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "doubled", "note || '!'"]);
        assert_eq!(order_by[0].expr, projection[1].expr);
        assert!(!order_by[0].ascending);
        assert_eq!(limit, Some(3));

        assert!(matches!(
            plan(&catalog, "SELECT * FROM account LIMIT -1", &[]),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_plan_create_table() {
        let catalog = catalog();
        let LogicalPlan::CreateTable { columns, .. } = plan(
            &catalog,
            "CREATE TABLE txn (id INTEGER, account INTEGER NOT NULL, \
             PRIMARY KEY (id), FOREIGN KEY (account) REFERENCES account (id))",
            &[],
        )
        .unwrap() else {
            panic!("expected create plan");
        };

        assert!(columns[0].primary_key);
        assert!(!columns[0].nullable);
        assert!(!columns[1].nullable);
        assert_eq!(columns[1].references.as_ref().map(|fk| fk.table.as_str()), Some("account"));

        assert!(matches!(
            plan(&catalog, "CREATE TABLE t (a INTEGER, b INTEGER, PRIMARY KEY (a, b))", &[]),
            Err(Error::InvalidSchema { .. })
        ));
        assert!(matches!(
            plan(&catalog, "CREATE TABLE t (a INTEGER, PRIMARY KEY (z))", &[]),
            Err(Error::UnknownColumn { .. })
        ));
    }
}
