//! SQL Token definitions
//!
//! This module defines all tokens that can appear in SQL statements.

use std::fmt;

/// SQL Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    // DDL Keywords
    Create,
    Drop,
    Table,
    If,
    Exists,

    // DML Keywords
    Select,
    Insert,
    Update,
    Delete,
    Into,
    Values,
    Set,
    From,
    Where,

    // Clauses
    And,
    Or,
    Not,
    As,
    Is,

    // Ordering
    Order,
    By,
    Asc,
    Desc,
    Limit,

    // Constraints
    Primary,
    Foreign,
    Key,
    References,
    Null,

    // Data Types
    Int,
    Integer,
    BigInt,
    SmallInt,
    Float,
    Real,
    Double,
    Varchar,
    Text,
    Boolean,

    // Boolean Literals
    True,
    False,

    // Transaction control
    Begin,
    Commit,
    Rollback,
    Transaction,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single-quoted)
    StringLiteral(String),
    /// Identifier (table name, column name, etc.)
    Identifier(String),
    /// Positional parameter: `?` or `?N`
    Placeholder(Option<usize>),

    // ========== Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Asterisk,
    /// /
    Slash,
    /// %
    Percent,
    /// ||
    Concat,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,

    // ========== Special ==========
    /// End of input
    Eof,
}

/// Keyword spellings
const KEYWORDS: &[(&str, Token)] = &[
    ("CREATE", Token::Create),
    ("DROP", Token::Drop),
    ("TABLE", Token::Table),
    ("IF", Token::If),
    ("EXISTS", Token::Exists),
    ("SELECT", Token::Select),
    ("INSERT", Token::Insert),
    ("UPDATE", Token::Update),
    ("DELETE", Token::Delete),
    ("INTO", Token::Into),
    ("VALUES", Token::Values),
    ("SET", Token::Set),
    ("FROM", Token::From),
    ("WHERE", Token::Where),
    ("AND", Token::And),
    ("OR", Token::Or),
    ("NOT", Token::Not),
    ("AS", Token::As),
    ("IS", Token::Is),
    ("ORDER", Token::Order),
    ("BY", Token::By),
    ("ASC", Token::Asc),
    ("DESC", Token::Desc),
    ("LIMIT", Token::Limit),
    ("PRIMARY", Token::Primary),
    ("FOREIGN", Token::Foreign),
    ("KEY", Token::Key),
    ("REFERENCES", Token::References),
    ("NULL", Token::Null),
    ("INT", Token::Int),
    ("INTEGER", Token::Integer),
    ("BIGINT", Token::BigInt),
    ("SMALLINT", Token::SmallInt),
    ("FLOAT", Token::Float),
    ("REAL", Token::Real),
    ("DOUBLE", Token::Double),
    ("VARCHAR", Token::Varchar),
    ("TEXT", Token::Text),
    ("BOOLEAN", Token::Boolean),
    ("TRUE", Token::True),
    ("FALSE", Token::False),
    ("BEGIN", Token::Begin),
    ("COMMIT", Token::Commit),
    ("ROLLBACK", Token::Rollback),
    ("TRANSACTION", Token::Transaction),
];

impl Token {
    /// The keyword's spelling, if this token is a keyword
    pub fn keyword(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, token)| token == self)
            .map(|(word, _)| *word)
    }

    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        self.keyword().is_some()
    }

    /// Keywords that may still be used as table or column names
    pub fn is_unreserved(&self) -> bool {
        matches!(
            self,
            Token::Key
                | Token::Transaction
                | Token::Int
                | Token::Integer
                | Token::BigInt
                | Token::SmallInt
                | Token::Float
                | Token::Real
                | Token::Double
                | Token::Varchar
                | Token::Text
                | Token::Boolean
        )
    }

    /// Look up a keyword, ignoring case
    pub fn from_keyword(s: &str) -> Option<Token> {
        KEYWORDS
            .iter()
            .find(|(word, _)| word.eq_ignore_ascii_case(s))
            .map(|(_, token)| token.clone())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "'{}'", s),
            Token::Identifier(s) => f.write_str(s),
            Token::Placeholder(None) => f.write_str("?"),
            Token::Placeholder(Some(n)) => write!(f, "?{}", n),
            Token::Eq => f.write_str("="),
            Token::Neq => f.write_str("<>"),
            Token::Lt => f.write_str("<"),
            Token::Gt => f.write_str(">"),
            Token::Lte => f.write_str("<="),
            Token::Gte => f.write_str(">="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Asterisk => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Concat => f.write_str("||"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Eof => f.write_str("end of input"),
            keyword => f.write_str(keyword.keyword().unwrap_or("<keyword>")),
        }
    }
}
