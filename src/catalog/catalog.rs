//! System Catalog for arclite
//!
//! This module manages table definitions and validates their constraints.

use super::schema::{Column, Schema, TableDef};
use super::types::DataType;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// System Catalog - manages all table metadata
#[derive(Debug)]
pub struct Catalog {
    /// Table definitions by name
    tables: RwLock<HashMap<String, Arc<TableDef>>>,
    /// Next table ID
    next_table_id: RwLock<u32>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_table_id: RwLock::new(1),
        }
    }

    /// Define a new table.
    ///
    /// Exactly one column must be the primary key. Foreign keys must point at
    /// the primary key of an existing table (or of this table itself).
    pub fn define_table(&self, name: &str, columns: Vec<Column>) -> Result<Arc<TableDef>> {
        let mut tables = self.tables.write();

        if tables.contains_key(name) {
            return Err(Error::DuplicateTable(name.to_string()));
        }

        if columns.is_empty() {
            return Err(Error::invalid_schema(name, "a table needs at least one column"));
        }

        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::invalid_schema(
                    name,
                    format!("duplicate column '{}'", col.name),
                ));
            }
        }

        let schema = Schema::from_columns(columns);
        let primary_key = match schema.primary_key_columns().as_slice() {
            [pk] => pk.position,
            [] => return Err(Error::invalid_schema(name, "no primary key column declared")),
            _ => {
                return Err(Error::invalid_schema(
                    name,
                    "composite primary keys are not supported",
                ))
            }
        };

        for col in schema.columns() {
            let Some(fk) = &col.references else {
                continue;
            };
            let (ref_schema, ref_pk) = if fk.table == name {
                (&schema, primary_key)
            } else {
                let target = tables
                    .get(&fk.table)
                    .ok_or_else(|| Error::UnknownTable(fk.table.clone()))?;
                (target.schema(), target.primary_key)
            };
            let ref_col = ref_schema.get_column(&fk.column).ok_or_else(|| {
                Error::UnknownColumn {
                    column: fk.column.clone(),
                    table: fk.table.clone(),
                }
            })?;
            if ref_col.position != ref_pk {
                return Err(Error::invalid_schema(
                    name,
                    format!("foreign key {} must reference a primary key", fk),
                ));
            }
            if !col.data_type.is_comparable_with(&ref_col.data_type) {
                return Err(Error::invalid_schema(
                    name,
                    format!(
                        "column '{}' of type {} cannot reference {} of type {}",
                        col.name, col.data_type, fk, ref_col.data_type
                    ),
                ));
            }
        }

        let mut next_id = self.next_table_id.write();
        let table_def = Arc::new(TableDef {
            name: name.to_string(),
            schema,
            id: *next_id,
            primary_key,
        });
        *next_id += 1;

        tables.insert(name.to_string(), table_def.clone());
        tracing::info!(table = name, id = table_def.id, "table defined");
        Ok(table_def)
    }

    /// Look up a table by name
    pub fn lookup(&self, name: &str) -> Result<Arc<TableDef>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Drop a table. Tables still referenced by another table's foreign key
    /// cannot be dropped.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.write();

        if !tables.contains_key(name) {
            return Err(Error::UnknownTable(name.to_string()));
        }

        let referrer = tables.values().find(|def| {
            def.name != name && def.foreign_keys().any(|(_, fk)| fk.table == name)
        });
        if let Some(referrer) = referrer {
            return Err(Error::invalid_schema(
                name,
                format!("table is referenced by '{}'", referrer.name),
            ));
        }

        tables.remove(name);
        tracing::info!(table = name, "table dropped");
        Ok(())
    }

    /// List all table names, sorted
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get table schema info as a formatted string (for .schema command)
    pub fn describe(&self, name: &str) -> Result<String> {
        let table = self.lookup(name)?;
        let mut info = format!("Table: {}\n", table.name());
        info.push_str("Columns:\n");

        for col in table.schema().columns() {
            let mut flags = Vec::new();
            if col.primary_key {
                flags.push("PRIMARY KEY".to_string());
            }
            if !col.nullable {
                flags.push("NOT NULL".to_string());
            }
            if let Some(fk) = &col.references {
                flags.push(format!("REFERENCES {}", fk));
            }

            let flags_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            info.push_str(&format!("  {} {}{}\n", col.name, col.data_type, flags_str));
        }

        Ok(info)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating tables with a fluent API
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
}

impl TableBuilder {
    /// Start building a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a nullable column
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    /// Add an INTEGER PRIMARY KEY column
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.columns
            .push(Column::new(name, DataType::Integer).primary_key(true));
        self
    }

    /// Add a NOT NULL column
    pub fn column_not_null(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns
            .push(Column::new(name, data_type).nullable(false));
        self
    }

    /// Add a column referencing another table's primary key
    pub fn foreign_key(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.columns
            .push(Column::new(name, data_type).references(table, column));
        self
    }

    /// The table name being built
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume the builder, yielding name and columns
    pub fn into_parts(self) -> (String, Vec<Column>) {
        (self.name, self.columns)
    }

    /// Build the table in the catalog
    pub fn build(self, catalog: &Catalog) -> Result<Arc<TableDef>> {
        catalog.define_table(&self.name, self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_columns() -> Vec<Column> {
        vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("firstName", DataType::Varchar(100)),
        ]
    }

    #[test]
    fn test_define_and_lookup_table() {
        let catalog = Catalog::new();

        let table = catalog.define_table("user", user_columns()).unwrap();
        assert_eq!(table.name(), "user");
        assert_eq!(table.schema().column_count(), 2);
        assert_eq!(table.primary_key, 0);

        let retrieved = catalog.lookup("user").unwrap();
        assert_eq!(retrieved.id, table.id);
    }

    #[test]
    fn test_duplicate_table() {
        let catalog = Catalog::new();
        catalog.define_table("user", user_columns()).unwrap();

        let result = catalog.define_table("user", user_columns());
        assert!(matches!(result, Err(Error::DuplicateTable(_))));
    }

    #[test]
    fn test_missing_primary_key() {
        let catalog = Catalog::new();
        let result = catalog.define_table("t", vec![Column::new("a", DataType::Text)]);
        assert!(matches!(result, Err(Error::InvalidSchema { .. })));
        assert!(!catalog.table_exists("t"));
    }

    #[test]
    fn test_invalid_schemas() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.define_table("t", vec![]),
            Err(Error::InvalidSchema { .. })
        ));
        assert!(matches!(
            catalog.define_table(
                "t",
                vec![
                    Column::new("a", DataType::Integer).primary_key(true),
                    Column::new("a", DataType::Text),
                ]
            ),
            Err(Error::InvalidSchema { .. })
        ));
        assert!(matches!(
            catalog.define_table(
                "t",
                vec![
                    Column::new("a", DataType::Integer).primary_key(true),
                    Column::new("b", DataType::Integer).primary_key(true),
                ]
            ),
            Err(Error::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_lookup_unknown() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.lookup("nope").unwrap_err(),
            Error::UnknownTable("nope".to_string())
        );
    }

    #[test]
    fn test_foreign_key_validation() {
        let catalog = Catalog::new();
        catalog.define_table("user", user_columns()).unwrap();

        let unknown = TableBuilder::new("account")
            .primary_key("id")
            .foreign_key("owner", DataType::Integer, "ghost", "id")
            .build(&catalog);
        assert!(matches!(unknown, Err(Error::UnknownTable(_))));

        let not_pk = TableBuilder::new("account")
            .primary_key("id")
            .foreign_key("owner", DataType::Varchar(100), "user", "firstName")
            .build(&catalog);
        assert!(matches!(not_pk, Err(Error::InvalidSchema { .. })));

        let wrong_type = TableBuilder::new("account")
            .primary_key("id")
            .foreign_key("owner", DataType::Text, "user", "id")
            .build(&catalog);
        assert!(matches!(wrong_type, Err(Error::InvalidSchema { .. })));

        let ok = TableBuilder::new("account")
            .primary_key("id")
            .foreign_key("owner", DataType::Integer, "user", "id")
            .build(&catalog)
            .unwrap();
        assert_eq!(ok.foreign_keys().count(), 1);
    }

    #[test]
    fn test_self_reference() {
        let catalog = Catalog::new();
        let def = TableBuilder::new("employee")
            .primary_key("id")
            .foreign_key("manager", DataType::Integer, "employee", "id")
            .build(&catalog)
            .unwrap();
        assert_eq!(def.foreign_keys().count(), 1);
    }

    #[test]
    fn test_drop_table() {
        let catalog = Catalog::new();
        catalog.define_table("user", user_columns()).unwrap();
        TableBuilder::new("account")
            .primary_key("id")
            .foreign_key("owner", DataType::Integer, "user", "id")
            .build(&catalog)
            .unwrap();

        assert!(matches!(
            catalog.drop_table("user"),
            Err(Error::InvalidSchema { .. })
        ));

        catalog.drop_table("account").unwrap();
        catalog.drop_table("user").unwrap();
        assert!(catalog.list_tables().is_empty());
        assert!(matches!(
            catalog.drop_table("user"),
            Err(Error::UnknownTable(_))
        ));
    }

    #[test]
    fn test_describe() {
        let catalog = Catalog::new();
        catalog.define_table("user", user_columns()).unwrap();

        let info = catalog.describe("user").unwrap();
        assert!(info.contains("id INTEGER [PRIMARY KEY, NOT NULL]"));
        assert!(info.contains("firstName VARCHAR(100)"));
    }
}
