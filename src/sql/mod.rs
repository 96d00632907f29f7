//! SQL front end
//!
//! This module contains the lexer, tokens, AST and parser for the SQL
//! subset arclite accepts.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Statement, StatementKind};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::Token;

/// A parsed statement and the number of parameter slots it declares
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub statement: Statement,
    pub param_count: usize,
}

/// Parse exactly one statement
pub fn parse_statement(sql: &str) -> crate::Result<ParsedStatement> {
    let mut parser = Parser::new(sql)?;
    let statement = parser.parse()?;
    Ok(ParsedStatement {
        statement,
        param_count: parser.param_count(),
    })
}
