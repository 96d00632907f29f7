//! Query execution module
//!
//! This module contains the planner, expression evaluation, the executor and
//! result cursors.

pub mod cursor;
pub mod eval;
pub mod executor;
pub mod planner;

pub use cursor::{Cursor, CursorState, QueryOutput};
pub use eval::{Binder, BoundExpr};
pub use executor::{ExecutionEngine, QueryResult};
pub use planner::{check_parameters, collect_bindings, LogicalPlan, Planner};
