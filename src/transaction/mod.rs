//! Transaction module
//!
//! Per-connection transaction lifecycle and the staged write overlay.

pub mod transaction;

pub use transaction::{
    ConflictCheck, NoConflictCheck, Transaction, TransactionManager, TransactionState,
};
