//! arclite - an embedded in-memory relational engine written in Rust
//!
//! This library provides:
//! - SQL parsing for a small statement subset (lexer, parser, AST)
//! - In-memory table storage keyed by primary key
//! - Query execution (planner, expression evaluation, cursors)
//! - Deferred-write transactions with atomic commit
//! - System catalog
//! - Connections, prepared statements and auto-commit

pub mod catalog;
pub mod connection;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;
pub mod transaction;

pub use connection::{connect, Connection, ConnectionConfig, Database, PreparedStatement};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{Cursor, CursorState, QueryOutput, QueryResult};
pub use storage::{Tuple, Value};
