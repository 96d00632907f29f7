//! SQL Lexer (Tokenizer)
//!
//! This module converts SQL strings into a stream of tokens.

use super::token::Token;
use crate::error::{Error, Result};

/// Highest accepted `?N` parameter number
pub const MAX_PARAMETER_INDEX: usize = 32766;

/// A token and the character offset where it starts
pub type Spanned = (Token, usize);

/// SQL Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        Ok(self
            .tokenize_spanned()?
            .into_iter()
            .map(|(token, _)| token)
            .collect())
    }

    /// Tokenize the entire input, keeping each token's start offset
    pub fn tokenize_spanned(&mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            let start = self.position;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, start));
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();

        // Single character tokens
        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Asterisk),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '=' => Some(Token::Eq),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '<' => {
                self.advance();
                match self.peek_current() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::Lte)
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::Neq)
                    }
                    _ => Ok(Token::Lt),
                }
            }
            '>' => {
                self.advance();
                if self.peek_current() == Some('=') {
                    self.advance();
                    return Ok(Token::Gte);
                }
                Ok(Token::Gt)
            }
            '!' => self.read_pair('!', '=', Token::Neq),
            '|' => self.read_pair('|', '|', Token::Concat),
            '?' => self.read_placeholder(),
            '\'' => self.read_string(),
            '"' => self.read_quoted_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c => Err(Error::syntax(
                format!("unexpected character '{}'", c),
                self.position,
            )),
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek at the next character
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) {
        loop {
            while !self.is_at_end() && self.current_char().is_whitespace() {
                self.advance();
            }
            if !self.skip_comment() {
                break;
            }
        }
    }

    /// Skip one SQL comment (-- or /* */); returns whether one was found
    fn skip_comment(&mut self) -> bool {
        match (self.peek_current(), self.peek_char()) {
            (Some('-'), Some('-')) => {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
                true
            }
            (Some('/'), Some('*')) => {
                self.advance(); // skip /
                self.advance(); // skip *
                while !self.is_at_end() {
                    if self.current_char() == '*' && self.peek_char() == Some('/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                true
            }
            _ => false,
        }
    }

    /// Read a two-character operator whose first character is not a token on its own
    fn read_pair(&mut self, first: char, second: char, token: Token) -> Result<Token> {
        let start = self.position;
        self.advance();
        if self.peek_current() == Some(second) {
            self.advance();
            return Ok(token);
        }
        Err(Error::syntax(format!("unexpected character '{}'", first), start))
    }

    /// Read `?` or `?N`
    fn read_placeholder(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // skip ?

        let mut digits = String::new();
        while let Some(ch) = self.peek_current().filter(char::is_ascii_digit) {
            digits.push(ch);
            self.advance();
        }
        if digits.is_empty() {
            return Ok(Token::Placeholder(None));
        }

        match digits.parse::<usize>() {
            Ok(index) if (1..=MAX_PARAMETER_INDEX).contains(&index) => {
                Ok(Token::Placeholder(Some(index)))
            }
            _ => Err(Error::syntax(
                format!("invalid parameter index '?{}'", digits),
                start,
            )),
        }
    }

    /// Read a string literal (single-quoted)
    fn read_string(&mut self) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == '\'' {
                // Check for escaped quote ''
                if self.peek_char() == Some('\'') {
                    value.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(Token::StringLiteral(value));
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::syntax("unterminated string literal", start_pos))
    }

    /// Read a quoted identifier (double-quoted)
    fn read_quoted_identifier(&mut self) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == '"' {
                if self.peek_char() == Some('"') {
                    value.push('"');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    if value.is_empty() {
                        return Err(Error::syntax("empty quoted identifier", start_pos));
                    }
                    return Ok(Token::Identifier(value));
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::syntax("unterminated quoted identifier", start_pos))
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> Result<Token> {
        let start_pos = self.position;
        let mut value = String::new();
        let mut is_float = false;

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                value.push(ch);
                self.advance();
            } else if ch == 'e' || ch == 'E' {
                // Scientific notation
                is_float = true;
                value.push(ch);
                self.advance();

                if let Some(sign @ ('+' | '-')) = self.peek_current() {
                    value.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        let invalid = || Error::syntax(format!("invalid number '{}'", value), start_pos);
        if is_float {
            value
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| invalid())
        } else {
            value
                .parse::<i64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| invalid())
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Result<Token> {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Check if it's a keyword
        if let Some(keyword) = Token::from_keyword(&value) {
            Ok(keyword)
        } else {
            Ok(Token::Identifier(value))
        }
    }
}
