//! Storage engine module
//!
//! This module contains the storage engine components:
//! - Values and tuples
//! - Per-table row storage in insertion order
//! - The table store with atomic batch application

pub mod store;
pub mod table;
pub mod tuple;

pub use store::{SharedMutator, TableStore, WriteOp};
pub use table::{conform_row, RowMutator, Scan, Table};
pub use tuple::{Tuple, Value};
