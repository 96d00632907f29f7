//! Transaction Manager
//!
//! Handles transaction lifecycle (Begin, Commit, Rollback) for one connection.
//! Writes made while a transaction is active are staged in an overlay and
//! only reach the table store, all at once, on commit.

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};
use crate::storage::{conform_row, Table, TableStore, WriteOp};

/// Transaction State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => write!(f, "active"),
            TransactionState::Committed => write!(f, "committed"),
            TransactionState::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// Transaction Context
#[derive(Debug, Clone)]
pub struct Transaction {
    id: u64,
    state: TransactionState,
    /// Staged writes, in statement order
    overlay: Vec<WriteOp>,
    /// Store version observed at begin
    base_version: u64,
}

impl Transaction {
    fn new(id: u64, base_version: u64) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            overlay: Vec::new(),
            base_version,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Store version at the time the transaction began
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Staged writes
    pub fn writes(&self) -> &[WriteOp] {
        &self.overlay
    }

    /// Check whether any staged write targets `table`
    pub fn touches(&self, table: &str) -> bool {
        self.overlay.iter().any(|op| op.table() == table)
    }
}

/// Decides whether a transaction may commit against the current store.
///
/// Runs before the overlay is applied; an error aborts the commit.
pub trait ConflictCheck: fmt::Debug + Send {
    fn check(&self, txn: &Transaction, store: &TableStore) -> Result<()>;
}

/// Commits in arrival order; constraint checks at apply time are the only guard
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConflictCheck;

impl ConflictCheck for NoConflictCheck {
    fn check(&self, _txn: &Transaction, _store: &TableStore) -> Result<()> {
        Ok(())
    }
}

/// Transaction Manager
#[derive(Debug)]
pub struct TransactionManager {
    /// The active transaction, if any
    current: Option<Transaction>,
    /// Outcome of the most recently finished transaction
    last: Option<(u64, TransactionState)>,
    /// Next Transaction ID
    next_trans_id: u64,
    conflict_check: Box<dyn ConflictCheck>,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new() -> Self {
        Self::with_conflict_check(Box::new(NoConflictCheck))
    }

    /// Create a transaction manager with a custom commit guard
    pub fn with_conflict_check(conflict_check: Box<dyn ConflictCheck>) -> Self {
        Self {
            current: None,
            last: None,
            next_trans_id: 1,
            conflict_check,
        }
    }

    /// Begin a new transaction
    pub fn begin(&mut self, store_version: u64) -> Result<u64> {
        if let Some(txn) = &self.current {
            return Err(Error::TransactionAlreadyActive(txn.id));
        }

        let trans_id = self.next_trans_id;
        self.next_trans_id += 1;
        self.current = Some(Transaction::new(trans_id, store_version));

        tracing::debug!(txn = trans_id, version = store_version, "transaction started");
        Ok(trans_id)
    }

    /// Check if a transaction is active
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// The active transaction
    pub fn current(&self) -> Option<&Transaction> {
        self.current.as_ref()
    }

    /// Id and final state of the last finished transaction
    pub fn last_outcome(&self) -> Option<(u64, TransactionState)> {
        self.last
    }

    /// Stage a write in the active transaction
    pub fn stage(&mut self, op: WriteOp) -> Result<()> {
        let txn = self.current.as_mut().ok_or(Error::NoActiveTransaction)?;
        tracing::debug!(txn = txn.id, op = ?op, "write staged");
        txn.overlay.push(op);
        Ok(())
    }

    /// Commit the active transaction.
    ///
    /// The overlay is applied atomically. If the apply fails the transaction
    /// is rolled back and the failure returned.
    pub fn commit(&mut self, store: &mut TableStore) -> Result<u64> {
        let mut txn = self.current.take().ok_or(Error::NoActiveTransaction)?;

        let outcome = self
            .conflict_check
            .check(&txn, store)
            .and_then(|_| store.apply(&txn.overlay));

        match outcome {
            Ok(()) => {
                txn.state = TransactionState::Committed;
                tracing::info!(txn = txn.id, writes = txn.overlay.len(), "transaction committed");
            }
            Err(err) => {
                txn.state = TransactionState::RolledBack;
                tracing::warn!(txn = txn.id, error = %err, "commit failed, transaction rolled back");
                self.last = Some((txn.id, txn.state));
                return Err(err);
            }
        }

        self.last = Some((txn.id, txn.state));
        Ok(txn.id)
    }

    /// Discard the active transaction
    pub fn rollback(&mut self) -> Result<u64> {
        let mut txn = self.current.take().ok_or(Error::NoActiveTransaction)?;
        txn.state = TransactionState::RolledBack;
        self.last = Some((txn.id, txn.state));

        tracing::info!(txn = txn.id, discarded = txn.overlay.len(), "transaction rolled back");
        Ok(txn.id)
    }

    /// A table as seen from inside the active transaction.
    ///
    /// Staged writes are replayed over a copy of the stored table. Writes that
    /// would fail on commit are skipped here; they are reported when the
    /// transaction commits.
    pub fn view<'s>(&self, store: &'s TableStore, table: &str) -> Result<Cow<'s, Table>> {
        let base = store.table(table)?;
        let txn = match &self.current {
            Some(txn) if txn.touches(table) => txn,
            _ => return Ok(Cow::Borrowed(base)),
        };

        let mut view = base.clone();
        for op in txn.overlay.iter().filter(|op| op.table() == table) {
            replay(&mut view, op);
        }
        Ok(Cow::Owned(view))
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn replay(view: &mut Table, op: &WriteOp) {
    let result = match op {
        WriteOp::Insert { row, .. } => {
            conform_row(view.definition(), row.clone()).and_then(|row| view.insert(row).map(|_| ()))
        }
        WriteOp::Update { key, mutator, .. } => {
            let key = view.normalize_key(key.clone());
            view.prepare_update(&key, mutator.as_ref())
                .and_then(|row| view.replace(&key, row).map(|_| ()))
        }
        WriteOp::Delete { key, .. } => {
            let key = view.normalize_key(key.clone());
            view.delete(&key).map(|_| ())
        }
    };

    if let Err(err) = result {
        tracing::trace!(error = %err, "staged write skipped in view");
    }
}
