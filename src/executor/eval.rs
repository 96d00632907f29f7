//! Expression binding and evaluation
//!
//! Parsed expressions are bound once per statement: column names become
//! positions in the row and parameters become constants. Evaluation then
//! works on plain value slices.

use std::cmp::Ordering;

use crate::catalog::Schema;
use crate::error::{Error, Result};
use crate::sql::ast::{BinaryOperator, Expr, Literal, UnaryOperator};
use crate::storage::Value;

/// An expression resolved against a schema and a parameter set
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Constant(Value),
    Column(usize),
    Binary {
        left: Box<BoundExpr>,
        op: BinaryOperator,
        right: Box<BoundExpr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<BoundExpr>,
    },
    IsNull(Box<BoundExpr>),
    IsNotNull(Box<BoundExpr>),
}

/// Resolves column names and parameters
pub struct Binder<'a> {
    /// Schema columns are resolved against; `None` allows constants only
    schema: Option<&'a Schema>,
    table: &'a str,
    params: &'a [Value],
}

impl<'a> Binder<'a> {
    pub fn new(schema: Option<&'a Schema>, table: &'a str, params: &'a [Value]) -> Self {
        Self {
            schema,
            table,
            params,
        }
    }

    pub fn bind(&self, expr: &Expr) -> Result<BoundExpr> {
        Ok(match expr {
            Expr::Literal(lit) => BoundExpr::Constant(literal_to_value(lit)),
            Expr::Parameter(index) => {
                let value = index
                    .checked_sub(1)
                    .and_then(|i| self.params.get(i))
                    .ok_or(Error::UnboundParameter(*index))?;
                BoundExpr::Constant(value.clone())
            }
            Expr::Column(name) => {
                let position = self
                    .schema
                    .and_then(|schema| schema.get_column_index(name))
                    .ok_or_else(|| Error::UnknownColumn {
                        column: name.clone(),
                        table: self.table.to_string(),
                    })?;
                BoundExpr::Column(position)
            }
            Expr::BinaryOp { left, op, right } => BoundExpr::Binary {
                left: Box::new(self.bind(left)?),
                op: *op,
                right: Box::new(self.bind(right)?),
            },
            Expr::UnaryOp { op, expr } => BoundExpr::Unary {
                op: *op,
                expr: Box::new(self.bind(expr)?),
            },
            Expr::IsNull(inner) => BoundExpr::IsNull(Box::new(self.bind(inner)?)),
            Expr::IsNotNull(inner) => BoundExpr::IsNotNull(Box::new(self.bind(inner)?)),
            Expr::Nested(inner) => self.bind(inner)?,
        })
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
    }
}

impl BoundExpr {
    /// The constant value, if this expression is one
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            BoundExpr::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// Evaluate against a row
    pub fn evaluate(&self, row: &[Value]) -> Result<Value> {
        match self {
            BoundExpr::Constant(v) => Ok(v.clone()),
            BoundExpr::Column(idx) => row.get(*idx).cloned().ok_or(Error::ColumnIndexOutOfRange {
                index: *idx,
                width: row.len(),
            }),
            BoundExpr::Binary { left, op, right } => match op {
                BinaryOperator::And => logical_and(left, right, row),
                BinaryOperator::Or => logical_or(left, right, row),
                _ => {
                    let left_val = left.evaluate(row)?;
                    let right_val = right.evaluate(row)?;
                    evaluate_binary_op(&left_val, *op, &right_val)
                }
            },
            BoundExpr::Unary { op, expr } => {
                let val = expr.evaluate(row)?;
                evaluate_unary_op(*op, &val)
            }
            BoundExpr::IsNull(inner) => Ok(Value::Boolean(inner.evaluate(row)?.is_null())),
            BoundExpr::IsNotNull(inner) => Ok(Value::Boolean(!inner.evaluate(row)?.is_null())),
        }
    }

    /// Evaluate as a predicate; NULL does not match
    pub fn matches(&self, row: &[Value]) -> Result<bool> {
        Ok(truth(&self.evaluate(row)?)?.unwrap_or(false))
    }
}

/// Three-valued truth of a value
fn truth(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        other => other.as_bool().map(Some).ok_or_else(|| {
            Error::InvalidOperation(format!("{} is not a boolean", other.type_name()))
        }),
    }
}

fn logical_and(left: &BoundExpr, right: &BoundExpr, row: &[Value]) -> Result<Value> {
    let l = truth(&left.evaluate(row)?)?;
    if l == Some(false) {
        return Ok(Value::Boolean(false));
    }
    let r = truth(&right.evaluate(row)?)?;
    Ok(match (l, r) {
        (_, Some(false)) => Value::Boolean(false),
        (Some(true), Some(true)) => Value::Boolean(true),
        _ => Value::Null,
    })
}

fn logical_or(left: &BoundExpr, right: &BoundExpr, row: &[Value]) -> Result<Value> {
    let l = truth(&left.evaluate(row)?)?;
    if l == Some(true) {
        return Ok(Value::Boolean(true));
    }
    let r = truth(&right.evaluate(row)?)?;
    Ok(match (l, r) {
        (_, Some(true)) => Value::Boolean(true),
        (Some(false), Some(false)) => Value::Boolean(false),
        _ => Value::Null,
    })
}

fn evaluate_binary_op(left: &Value, op: BinaryOperator, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if op.is_comparison() {
        let cmp = left.compare(right).ok_or_else(|| {
            Error::InvalidOperation(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ))
        })?;
        let result = match op {
            BinaryOperator::Eq => cmp == Ordering::Equal,
            BinaryOperator::Neq => cmp != Ordering::Equal,
            BinaryOperator::Lt => cmp == Ordering::Less,
            BinaryOperator::Gt => cmp == Ordering::Greater,
            BinaryOperator::Lte => cmp != Ordering::Greater,
            _ => cmp != Ordering::Less,
        };
        return Ok(Value::Boolean(result));
    }

    if matches!(op, BinaryOperator::Div | BinaryOperator::Mod) && right.is_zero() {
        return Err(Error::DivisionByZero);
    }

    let result = match op {
        BinaryOperator::Add => left.add(right),
        BinaryOperator::Sub => left.sub(right),
        BinaryOperator::Mul => left.mul(right),
        BinaryOperator::Div => left.div(right),
        BinaryOperator::Mod => left.rem(right),
        BinaryOperator::Concat => Some(Value::String(format!("{}{}", left, right))),
        _ => None,
    };

    result.ok_or_else(|| {
        let overflow = matches!((left, right), (Value::Integer(_), Value::Integer(_)));
        if overflow {
            Error::InvalidOperation(format!("integer overflow in {} {} {}", left, op, right))
        } else {
            Error::InvalidOperation(format!(
                "cannot apply {} to {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ))
        }
    })
}

fn evaluate_unary_op(op: UnaryOperator, val: &Value) -> Result<Value> {
    match (op, val) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Minus, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::InvalidOperation(format!("integer overflow in -{}", i))),
        (UnaryOperator::Minus, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOperator::Not, other) => match truth(other)? {
            Some(b) => Ok(Value::Boolean(!b)),
            None => Ok(Value::Null),
        },
        (UnaryOperator::Minus, other) => Err(Error::InvalidOperation(format!(
            "cannot negate {}",
            other.type_name()
        ))),
    }
}
