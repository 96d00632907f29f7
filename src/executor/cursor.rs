//! Result cursors
//!
//! A cursor owns a snapshot of the rows a query produced and walks it once,
//! front to back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::{Tuple, Value};

/// Where a cursor stands in its row snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    BeforeFirst,
    Positioned(usize),
    Exhausted,
    Closed,
}

/// Column names plus rows, detached from any cursor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Tuple>,
}

/// Single-pass, forward-only result set
#[derive(Debug)]
pub struct Cursor {
    columns: Vec<String>,
    rows: Vec<Tuple>,
    state: CursorState,
    /// Cleared when the owning connection closes
    connection_open: Arc<AtomicBool>,
}

impl Cursor {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Tuple>, connection_open: Arc<AtomicBool>) -> Self {
        Self {
            columns,
            rows,
            state: CursorState::BeforeFirst,
            connection_open,
        }
    }

    pub fn state(&self) -> CursorState {
        if self.state != CursorState::Closed && !self.connection_open.load(Ordering::Acquire) {
            return CursorState::Closed;
        }
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state() == CursorState::Closed
    }

    /// Result column names
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Move to the next row.
    ///
    /// Returns false once the rows run out, and keeps returning false after.
    pub fn advance(&mut self) -> Result<bool> {
        self.ensure_open()?;

        let next = match self.state {
            CursorState::BeforeFirst => 0,
            CursorState::Positioned(i) => i + 1,
            _ => return Ok(false),
        };

        if next < self.rows.len() {
            self.state = CursorState::Positioned(next);
            Ok(true)
        } else {
            self.state = CursorState::Exhausted;
            Ok(false)
        }
    }

    /// The row the cursor is positioned on
    pub fn current_row(&self) -> Result<&Tuple> {
        self.ensure_open()?;
        match self.state {
            CursorState::Positioned(i) => self.rows.get(i).ok_or_else(|| {
                Error::Internal(format!("cursor position {} past {} rows", i, self.rows.len()))
            }),
            _ => Err(Error::CursorNotPositioned),
        }
    }

    /// A value of the current row by column index (0-based)
    pub fn current_value(&self, column_index: usize) -> Result<&Value> {
        let row = self.current_row()?;
        row.get(column_index).ok_or(Error::ColumnIndexOutOfRange {
            index: column_index,
            width: row.len(),
        })
    }

    /// A value of the current row by column name
    pub fn value_by_name(&self, column: &str) -> Result<&Value> {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::UnknownColumn {
                column: column.to_string(),
                table: "result set".to_string(),
            })?;
        self.current_value(index)
    }

    /// Release the row snapshot
    pub fn close(&mut self) {
        self.state = CursorState::Closed;
        self.rows = Vec::new();
    }

    /// Drain the rows not yet visited
    pub fn into_output(mut self) -> Result<QueryOutput> {
        self.ensure_open()?;
        let start = match self.state {
            CursorState::BeforeFirst => 0,
            CursorState::Positioned(i) => i + 1,
            _ => self.rows.len(),
        };
        let rows = self.rows.split_off(start.min(self.rows.len()));
        Ok(QueryOutput {
            columns: self.columns,
            rows,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ResourceClosed("cursor"));
        }
        Ok(())
    }
}

impl Iterator for Cursor {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(true) => self.current_row().ok().cloned(),
            _ => None,
        }
    }
}
