//! Databases, connections and prepared statements

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::config::ConnectionConfig;
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::executor::{check_parameters, collect_bindings, Cursor, ExecutionEngine, Planner, QueryResult};
use crate::sql::{parse_statement, ParsedStatement, Statement};
use crate::storage::{TableStore, Value};
use crate::transaction::TransactionManager;

/// State shared by every connection to one database
#[derive(Debug)]
struct Shared {
    config: ConnectionConfig,
    catalog: Catalog,
    store: RwLock<TableStore>,
}

/// An in-memory database. Cloning yields another handle to the same data.
#[derive(Debug, Clone)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    /// Open a fresh database described by a connect target
    pub fn open(target: &str) -> Result<Self> {
        let config = ConnectionConfig::parse(target)?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        tracing::info!(
            database = %config.name,
            foreign_keys = config.foreign_keys,
            "database opened"
        );
        let store = TableStore::new(config.foreign_keys);
        Self {
            shared: Arc::new(Shared {
                config,
                catalog: Catalog::new(),
                store: RwLock::new(store),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.shared.catalog
    }

    /// Open a new connection with its own transaction state
    pub fn connect(&self) -> Connection {
        tracing::info!(database = %self.shared.config.name, "connection opened");
        Connection {
            database: self.clone(),
            session: RefCell::new(Session {
                transactions: TransactionManager::new(),
                auto_commit: self.shared.config.auto_commit,
            }),
            open: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Open a private database and connect to it
pub fn connect(target: &str) -> Result<Connection> {
    Ok(Database::open(target)?.connect())
}

/// Per-connection mutable state
#[derive(Debug)]
struct Session {
    transactions: TransactionManager,
    auto_commit: bool,
}

/// A connection to a [`Database`].
///
/// Statements run synchronously. A connection holds at most one transaction;
/// closing or dropping it rolls that transaction back.
pub struct Connection {
    database: Database,
    session: RefCell<Session>,
    open: Arc<AtomicBool>,
}

impl Connection {
    /// Execute one SQL statement with positional parameters
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        let parsed = parse_statement(sql)?;
        self.execute_statement(&parsed, params)
    }

    /// Execute an already parsed statement
    pub fn execute_statement(&self, parsed: &ParsedStatement, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        check_parameters(parsed.param_count, params)?;
        self.run(&parsed.statement, params)
    }

    /// Execute a statement that returns rows
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Cursor> {
        self.execute(sql, params)?
            .into_cursor()
            .ok_or_else(|| Error::InvalidOperation("statement does not return rows".to_string()))
    }

    /// Parse a statement once for repeated execution
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement<'_>> {
        self.ensure_open()?;
        let parsed = parse_statement(sql)?;
        Ok(PreparedStatement {
            connection: self,
            statement: parsed.statement,
            bindings: vec![None; parsed.param_count],
            closed: false,
        })
    }

    /// Start an explicit transaction, returning its id
    pub fn begin_transaction(&self) -> Result<u64> {
        self.ensure_open()?;
        let version = self.database.shared.store.read().version();
        self.session.borrow_mut().transactions.begin(version)
    }

    pub fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        let mut session = self.session.borrow_mut();
        let mut store = self.database.shared.store.write();
        session.transactions.commit(&mut store)?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        self.session.borrow_mut().transactions.rollback()?;
        Ok(())
    }

    /// Switch auto-commit. Turning it on commits an open transaction.
    pub fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        self.ensure_open()?;
        let mut session = self.session.borrow_mut();
        if auto_commit && !session.auto_commit && session.transactions.is_active() {
            let mut store = self.database.shared.store.write();
            session.transactions.commit(&mut store)?;
        }
        session.auto_commit = auto_commit;
        Ok(())
    }

    pub fn auto_commit(&self) -> bool {
        self.session.borrow().auto_commit
    }

    pub fn in_transaction(&self) -> bool {
        self.session.borrow().transactions.is_active()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.database.shared.catalog
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn is_closed(&self) -> bool {
        !self.open.load(Ordering::Acquire)
    }

    /// Close the connection, rolling back any open transaction.
    /// Cursors it produced stop working.
    pub fn close(&self) {
        if self.is_closed() {
            return;
        }
        let mut session = self.session.borrow_mut();
        if session.transactions.is_active() {
            session.transactions.rollback().ok();
        }
        self.open.store(false, Ordering::Release);
        tracing::info!(database = %self.database.shared.config.name, "connection closed");
    }

    fn run(&self, statement: &Statement, params: &[Value]) -> Result<QueryResult> {
        let shared = &self.database.shared;
        let plan = Planner::new(&shared.catalog, params).plan(statement)?;
        tracing::debug!(kind = ?statement.kind(), "executing statement");

        let mut guard = self.session.borrow_mut();
        let session = &mut *guard;
        ExecutionEngine::new(&shared.catalog, &shared.store, &mut session.transactions, &self.open)
            .auto_commit(session.auto_commit)
            .execute(plan)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ResourceClosed("connection"));
        }
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.database.shared.config.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        let session = self.session.get_mut();
        if let Some(id) = session.transactions.current().map(|txn| txn.id()) {
            tracing::warn!(txn = id, "connection dropped with an open transaction");
            session.transactions.rollback().ok();
        }
        self.open.store(false, Ordering::Release);
    }
}

/// A parsed statement with 1-based parameter slots
#[derive(Debug)]
pub struct PreparedStatement<'conn> {
    connection: &'conn Connection,
    statement: Statement,
    bindings: Vec<Option<Value>>,
    closed: bool,
}

impl<'conn> PreparedStatement<'conn> {
    /// Bind a value to parameter `index` (1-based)
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.ensure_open()?;
        let count = self.bindings.len();
        if index == 0 || index > count {
            return Err(Error::ParameterOutOfRange { index, count });
        }
        self.bindings[index - 1] = Some(value.into());
        Ok(())
    }

    pub fn clear_bindings(&mut self) {
        self.bindings.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn parameter_count(&self) -> usize {
        self.bindings.len()
    }

    /// Run the statement with the current bindings. Bindings persist.
    pub fn execute(&mut self) -> Result<QueryResult> {
        self.ensure_open()?;
        let params = collect_bindings(&self.bindings)?;
        self.connection.run(&self.statement, &params)
    }

    pub fn query(&mut self) -> Result<Cursor> {
        self.execute()?
            .into_cursor()
            .ok_or_else(|| Error::InvalidOperation("statement does not return rows".to_string()))
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.bindings.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed || self.connection.is_closed()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ResourceClosed("statement"));
        }
        self.connection.ensure_open()
    }
}
