//! Table store for arclite
//!
//! Holds every table's rows and enforces primary-key and foreign-key
//! constraints. Batches of writes are applied atomically through an undo log.

use super::table::{conform_row, RowMutator, Scan, Table};
use super::tuple::{Tuple, Value};
use crate::catalog::TableDef;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a row mutator
pub type SharedMutator = Arc<dyn RowMutator + Send + Sync>;

/// A single write against the store
#[derive(Clone)]
pub enum WriteOp {
    Insert {
        table: String,
        row: Tuple,
    },
    Update {
        table: String,
        key: Value,
        mutator: SharedMutator,
    },
    Delete {
        table: String,
        key: Value,
    },
}

impl WriteOp {
    /// Name of the table this write targets
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Insert { table, .. }
            | WriteOp::Update { table, .. }
            | WriteOp::Delete { table, .. } => table,
        }
    }
}

impl fmt::Debug for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Insert { table, row } => f
                .debug_struct("Insert")
                .field("table", table)
                .field("row", row)
                .finish(),
            WriteOp::Update { table, key, .. } => f
                .debug_struct("Update")
                .field("table", table)
                .field("key", key)
                .finish_non_exhaustive(),
            WriteOp::Delete { table, key } => f
                .debug_struct("Delete")
                .field("table", table)
                .field("key", key)
                .finish(),
        }
    }
}

/// How to reverse one applied write
enum Undo {
    Insert {
        table: String,
        key: Value,
    },
    Replace {
        table: String,
        index: usize,
        new_key: Value,
        old_key: Value,
        old_row: Tuple,
    },
    Delete {
        table: String,
        index: usize,
        key: Value,
        row: Tuple,
    },
}

/// All tables of one database
#[derive(Debug)]
pub struct TableStore {
    tables: HashMap<String, Table>,
    /// Enforce foreign-key references on insert/update
    foreign_keys: bool,
    /// Bumped by every successful non-empty apply
    version: u64,
}

impl TableStore {
    pub fn new(foreign_keys: bool) -> Self {
        Self {
            tables: HashMap::new(),
            foreign_keys,
            version: 0,
        }
    }

    /// Current store version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Allocate storage for a newly defined table
    pub fn create_table(&mut self, def: Arc<TableDef>) -> Result<()> {
        if self.tables.contains_key(def.name()) {
            return Err(Error::DuplicateTable(def.name().to_string()));
        }
        self.tables.insert(def.name().to_string(), Table::new(def));
        Ok(())
    }

    /// Release a table's storage
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Get a table by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Insert one row
    pub fn insert(&mut self, table: &str, row: Tuple) -> Result<()> {
        self.apply(&[WriteOp::Insert {
            table: table.to_string(),
            row,
        }])
    }

    /// Update the row stored under `key`
    pub fn update<M>(&mut self, table: &str, key: Value, mutator: M) -> Result<()>
    where
        M: RowMutator + Send + Sync + 'static,
    {
        self.apply(&[WriteOp::Update {
            table: table.to_string(),
            key,
            mutator: Arc::new(mutator),
        }])
    }

    /// Delete the row stored under `key`
    pub fn delete(&mut self, table: &str, key: Value) -> Result<()> {
        self.apply(&[WriteOp::Delete {
            table: table.to_string(),
            key,
        }])
    }

    /// Scan a table's rows in insertion order
    pub fn scan(&self, table: &str) -> Result<Scan<'_>> {
        Ok(self.table(table)?.scan())
    }

    /// Apply a batch of writes atomically.
    ///
    /// On the first failing write every earlier write of the batch is undone
    /// and the failure is returned.
    pub fn apply(&mut self, writes: &[WriteOp]) -> Result<()> {
        let mut undo = Vec::with_capacity(writes.len());

        for op in writes {
            if let Err(err) = self.apply_one(op, &mut undo) {
                tracing::debug!(error = %err, applied = undo.len(), "undoing partial batch");
                self.undo(undo);
                return Err(err);
            }
        }

        if !writes.is_empty() {
            self.version += 1;
        }
        Ok(())
    }

    fn apply_one(&mut self, op: &WriteOp, undo: &mut Vec<Undo>) -> Result<()> {
        match op {
            WriteOp::Insert { table, row } => {
                let def = self.table(table)?.definition().clone();
                let row = conform_row(&def, row.clone())?;
                self.check_foreign_keys(&def, &row)?;
                let key = self.table_mut(table)?.insert(row)?;
                undo.push(Undo::Insert {
                    table: table.clone(),
                    key,
                });
            }
            WriteOp::Update {
                table,
                key,
                mutator,
            } => {
                let target = self.table(table)?;
                let def = target.definition().clone();
                let key = target.normalize_key(key.clone());
                let row = target.prepare_update(&key, mutator.as_ref())?;
                self.check_foreign_keys(&def, &row)?;
                let new_key = row.values()[def.primary_key].clone();
                let (index, old_row) = self.table_mut(table)?.replace(&key, row)?;
                undo.push(Undo::Replace {
                    table: table.clone(),
                    index,
                    new_key,
                    old_key: key,
                    old_row,
                });
            }
            WriteOp::Delete { table, key } => {
                let target = self.table_mut(table)?;
                let key = target.normalize_key(key.clone());
                let (index, row) = target.delete(&key)?;
                undo.push(Undo::Delete {
                    table: table.clone(),
                    index,
                    key,
                    row,
                });
            }
        }
        Ok(())
    }

    fn undo(&mut self, log: Vec<Undo>) {
        for entry in log.into_iter().rev() {
            match entry {
                Undo::Insert { table, key } => {
                    if let Some(t) = self.tables.get_mut(&table) {
                        t.remove_key(&key);
                    }
                }
                Undo::Replace {
                    table,
                    index,
                    new_key,
                    old_key,
                    old_row,
                } => {
                    if let Some(t) = self.tables.get_mut(&table) {
                        t.remove_key(&new_key);
                        t.restore(index, old_key, old_row);
                    }
                }
                Undo::Delete {
                    table,
                    index,
                    key,
                    row,
                } => {
                    if let Some(t) = self.tables.get_mut(&table) {
                        t.restore(index, key, row);
                    }
                }
            }
        }
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Every non-null referencing value must match a key in the referenced table
    fn check_foreign_keys(&self, def: &TableDef, row: &Tuple) -> Result<()> {
        if !self.foreign_keys {
            return Ok(());
        }

        let own_key = &row.values()[def.primary_key];
        for (col, fk) in def.foreign_keys() {
            let value = &row.values()[col.position];
            if value.is_null() {
                continue;
            }
            let target = self.table(&fk.table)?;
            let key = target.normalize_key(value.clone());
            // A row may reference itself
            if fk.table == def.name && &key == own_key {
                continue;
            }
            if !target.contains_key(&key) {
                return Err(Error::ForeignKeyViolation {
                    table: def.name.clone(),
                    column: col.name.clone(),
                    value: value.to_string(),
                    referenced_table: fk.table.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, DataType, TableBuilder};

    fn bank() -> TableStore {
        let catalog = Catalog::new();
        let user = TableBuilder::new("user")
            .primary_key("id")
            .column("firstName", DataType::Text)
            .build(&catalog)
            .unwrap();
        let account = TableBuilder::new("account")
            .primary_key("id")
            .foreign_key("owner", DataType::Integer, "user", "id")
            .column_not_null("balance", DataType::Integer)
            .build(&catalog)
            .unwrap();

        let mut store = TableStore::new(true);
        store.create_table(user).unwrap();
        store.create_table(account).unwrap();
        store
            .insert("user", Tuple::new(vec![1.into(), "Neha".into()]))
            .unwrap();
        store
    }

    fn account(id: i64, owner: i64, balance: i64) -> Tuple {
        Tuple::new(vec![id.into(), owner.into(), balance.into()])
    }

    fn balances(store: &TableStore) -> Vec<Value> {
        store
            .scan("account")
            .unwrap()
            .map(|row| row.get(2).cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_foreign_key_checked_on_insert() {
        let mut store = bank();
        store.insert("account", account(1, 1, 100)).unwrap();

        let err = store.insert("account", account(2, 9, 100)).unwrap_err();
        assert!(matches!(err, Error::ForeignKeyViolation { .. }));
        assert_eq!(store.table("account").unwrap().len(), 1);

        store
            .insert(
                "account",
                Tuple::new(vec![3.into(), Value::Null, 0.into()]),
            )
            .unwrap();
    }

    #[test]
    fn test_foreign_keys_not_enforced() {
        let mut store = bank();
        store.foreign_keys = false;
        store.insert("account", account(2, 9, 100)).unwrap();
    }

    #[test]
    fn test_update_and_delete_missing_key() {
        let mut store = bank();
        store.insert("account", account(1, 1, 100)).unwrap();

        let deposit = |row: &mut Tuple| -> Result<()> {
            let balance = row.get(2).and_then(Value::as_i64).unwrap_or(0);
            row.set(2, Value::Integer(balance + 50));
            Ok(())
        };
        store.update("account", Value::Integer(1), deposit).unwrap();
        assert_eq!(balances(&store), vec![Value::Integer(150)]);

        assert!(matches!(
            store.update("account", Value::Integer(7), deposit),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.delete("account", Value::Integer(7)),
            Err(Error::NotFound { .. })
        ));
        store.delete("account", Value::Integer(1)).unwrap();
        assert!(store.table("account").unwrap().is_empty());
    }

    #[test]
    fn test_apply_is_atomic() {
        let mut store = bank();
        store.insert("account", account(1, 1, 100)).unwrap();
        store.insert("account", account(2, 1, 100)).unwrap();
        let version = store.version();

        let add = |amount: i64| -> SharedMutator {
            Arc::new(move |row: &mut Tuple| -> Result<()> {
                let balance = row.get(2).and_then(Value::as_i64).unwrap_or(0);
                row.set(2, Value::Integer(balance + amount));
                Ok(())
            })
        };

        let batch = vec![
            WriteOp::Update {
                table: "account".into(),
                key: Value::Integer(2),
                mutator: add(-50),
            },
            WriteOp::Delete {
                table: "account".into(),
                key: Value::Integer(1),
            },
            WriteOp::Insert {
                table: "account".into(),
                row: account(1, 1, 7),
            },
            WriteOp::Update {
                table: "account".into(),
                key: Value::Integer(99),
                mutator: add(50),
            },
        ];

        let err = store.apply(&batch).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(store.version(), version);

        let rows: Vec<_> = store.scan("account").unwrap().cloned().collect();
        assert_eq!(rows, vec![account(1, 1, 100), account(2, 1, 100)]);

        store.apply(&batch[..3]).unwrap();
        assert_eq!(store.version(), version + 1);
        let rows: Vec<_> = store.scan("account").unwrap().cloned().collect();
        assert_eq!(rows, vec![account(2, 1, 50), account(1, 1, 7)]);
    }

    #[test]
    fn test_unknown_table() {
        let mut store = bank();
        assert!(matches!(
            store.insert("ghost", Tuple::new(vec![])),
            Err(Error::UnknownTable(_))
        ));
        assert!(store.scan("ghost").is_err());
        assert!(store.drop_table("ghost").is_err());
    }
}
