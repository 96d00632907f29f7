//! Connection module
//!
//! This module contains connect targets, databases, connections and
//! prepared statements.

pub mod config;
pub mod connection;

pub use config::{ConnectionConfig, TargetUrl, MEMORY_TARGET};
pub use connection::{connect, Connection, Database, PreparedStatement};
