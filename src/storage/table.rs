//! Table storage for arclite
//!
//! A table keeps its rows keyed by primary key, in insertion order.

use super::tuple::{Tuple, Value};
use crate::catalog::{DataType, Schema, TableDef};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// A change applied to a single row in place
pub trait RowMutator {
    fn mutate(&self, row: &mut Tuple) -> Result<()>;
}

impl<F> RowMutator for F
where
    F: Fn(&mut Tuple) -> Result<()>,
{
    fn mutate(&self, row: &mut Tuple) -> Result<()> {
        self(row)
    }
}

/// Check a row against a table definition.
///
/// Verifies arity, nullability, declared types and length limits, and returns
/// the row with values converted to the declared column types.
pub fn conform_row(def: &TableDef, row: Tuple) -> Result<Tuple> {
    let schema = def.schema();
    if row.len() != schema.column_count() {
        return Err(Error::ArityMismatch {
            table: def.name.clone(),
            expected: schema.column_count(),
            found: row.len(),
        });
    }

    let mut values = Vec::with_capacity(row.len());
    for (col, value) in schema.columns().iter().zip(row) {
        if value.is_null() {
            if !col.nullable {
                return Err(Error::NullNotAllowed(col.name.clone()));
            }
            values.push(Value::Null);
            continue;
        }

        let found = value.type_name();
        let value = col
            .data_type
            .coerce(value)
            .ok_or_else(|| Error::TypeMismatch {
                column: col.name.clone(),
                expected: col.data_type.to_string(),
                found: found.to_string(),
            })?;

        if let (Some(limit), Value::String(s)) = (col.data_type.max_length(), &value) {
            if s.chars().count() > limit {
                return Err(Error::ValueTooLarge {
                    column: col.name.clone(),
                    limit,
                });
            }
        }
        values.push(value);
    }

    Ok(Tuple::new(values))
}

/// Rows of one table
#[derive(Debug, Clone)]
pub struct Table {
    /// Table definition (metadata)
    def: Arc<TableDef>,
    /// Rows keyed by primary-key value
    rows: IndexMap<Value, Tuple>,
}

impl Table {
    /// Create a new, empty table
    pub fn new(def: Arc<TableDef>) -> Self {
        Self {
            def,
            rows: IndexMap::new(),
        }
    }

    /// Get table name
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Get table schema
    pub fn schema(&self) -> &Schema {
        self.def.schema()
    }

    /// Get table definition
    pub fn definition(&self) -> &Arc<TableDef> {
        &self.def
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert a lookup key to the primary-key column's type where possible
    pub fn normalize_key(&self, key: Value) -> Value {
        let data_type = &self.def.primary_key_column().data_type;
        match (data_type, key) {
            // Whole floats name the same row as the equal integer
            (DataType::Integer, Value::Float(f))
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Value::Integer(f as i64)
            }
            (data_type, key) => data_type.coerce(key.clone()).unwrap_or(key),
        }
    }

    /// Primary-key value of a conforming row
    pub fn key_of<'r>(&self, row: &'r Tuple) -> &'r Value {
        &row.values()[self.def.primary_key]
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &Value) -> bool {
        self.rows.contains_key(key)
    }

    /// Get a row by key
    pub fn get(&self, key: &Value) -> Option<&Tuple> {
        self.rows.get(key)
    }

    /// Scan all rows in insertion order
    pub fn scan(&self) -> Scan<'_> {
        Scan {
            inner: self.rows.values(),
        }
    }

    /// Insert a row that already conforms to the schema
    pub fn insert(&mut self, row: Tuple) -> Result<Value> {
        let key = self.key_of(&row).clone();
        if self.rows.contains_key(&key) {
            return Err(self.duplicate_key(&key));
        }
        self.rows.insert(key.clone(), row);
        Ok(key)
    }

    /// Compute the updated version of a row without storing it
    pub fn prepare_update(&self, key: &Value, mutator: &dyn RowMutator) -> Result<Tuple> {
        let current = self.rows.get(key).ok_or_else(|| self.not_found(key))?;
        let mut updated = current.clone();
        mutator.mutate(&mut updated)?;
        conform_row(&self.def, updated)
    }

    /// Replace the row stored under `key`, keeping its scan position.
    ///
    /// Returns the position and the previous row.
    pub fn replace(&mut self, key: &Value, row: Tuple) -> Result<(usize, Tuple)> {
        let index = self
            .rows
            .get_index_of(key)
            .ok_or_else(|| self.not_found(key))?;
        let new_key = self.key_of(&row).clone();

        if &new_key == key {
            let slot = &mut self.rows[index];
            let old = std::mem::replace(slot, row);
            return Ok((index, old));
        }

        if self.rows.contains_key(&new_key) {
            return Err(self.duplicate_key(&new_key));
        }
        let (_, old) = self
            .rows
            .shift_remove_index(index)
            .ok_or_else(|| self.not_found(key))?;
        self.rows.shift_insert(index, new_key, row);
        Ok((index, old))
    }

    /// Delete a row by key, returning its position and contents
    pub fn delete(&mut self, key: &Value) -> Result<(usize, Tuple)> {
        match self.rows.shift_remove_full(key) {
            Some((index, _, row)) => Ok((index, row)),
            None => Err(self.not_found(key)),
        }
    }

    /// Put a row back at a position (undo support)
    pub(crate) fn restore(&mut self, index: usize, key: Value, row: Tuple) {
        let index = index.min(self.rows.len());
        self.rows.shift_insert(index, key, row);
    }

    /// Drop a row without reporting absence (undo support)
    pub(crate) fn remove_key(&mut self, key: &Value) {
        self.rows.shift_remove(key);
    }

    fn duplicate_key(&self, key: &Value) -> Error {
        Error::PrimaryKeyViolation {
            table: self.name().to_string(),
            key: key.to_string(),
        }
    }

    fn not_found(&self, key: &Value) -> Error {
        Error::NotFound {
            table: self.name().to_string(),
            key: key.to_string(),
        }
    }
}

/// A single pass over a table's rows, in insertion order
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    inner: indexmap::map::Values<'a, Value, Tuple>,
}

impl<'a> Iterator for Scan<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Scan<'_> {}
