//! Data types for arclite
//!
//! This module defines the SQL data types a column can declare and how
//! values are checked against them.

use crate::storage::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL Data Types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean type
    Boolean,
    /// Integer (64-bit)
    Integer,
    /// Double-precision floating point
    Float,
    /// Variable-length character string with max length
    Varchar(usize),
    /// Unlimited text
    Text,
}

impl DataType {
    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Check if this type is a string type
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Varchar(_) | DataType::Text)
    }

    /// Check if this type is comparable with another type
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (a, b) if a.is_string() && b.is_string() => true,
            _ => false,
        }
    }

    /// Convert a non-null value into this type's representation.
    ///
    /// Integers widen to floats; every other mismatch yields `None`.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (DataType::Boolean, v @ Value::Boolean(_)) => Some(v),
            (DataType::Integer, v @ Value::Integer(_)) => Some(v),
            (DataType::Float, v @ Value::Float(_)) => Some(v),
            (DataType::Float, Value::Integer(i)) => Some(Value::Float(i as f64)),
            (DataType::Varchar(_) | DataType::Text, v @ Value::String(_)) => Some(v),
            _ => None,
        }
    }

    /// Maximum character length, for bounded types
    pub fn max_length(&self) -> Option<usize> {
        match self {
            DataType::Varchar(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::Text => write!(f, "TEXT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_comparison() {
        assert!(DataType::Integer.is_comparable_with(&DataType::Float));
        assert!(DataType::Varchar(50).is_comparable_with(&DataType::Text));
        assert!(!DataType::Integer.is_comparable_with(&DataType::Text));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(
            DataType::Float.coerce(Value::Integer(3)),
            Some(Value::Float(3.0))
        );
        assert_eq!(
            DataType::Text.coerce(Value::String("x".into())),
            Some(Value::String("x".into()))
        );
        assert_eq!(DataType::Integer.coerce(Value::Float(1.5)), None);
        assert_eq!(DataType::Boolean.coerce(Value::Integer(1)), None);
    }
}
