//! SQL Parser
//!
//! This module parses SQL tokens into an AST.

use super::ast::*;
use super::lexer::{Lexer, Spanned, MAX_PARAMETER_INDEX};
use super::token::Token;
use crate::catalog::DataType;
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    /// Highest parameter index seen in the current statement
    param_count: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize_spanned()?;

        Ok(Self {
            tokens,
            position: 0,
            param_count: 0,
        })
    }

    /// Number of parameter slots in the statement parsed last
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Parse exactly one SQL statement, with an optional trailing semicolon
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_one()?;
        if !self.is_at_end() {
            return Err(self.unexpected("end of statement"));
        }
        Ok(stmt)
    }

    /// Parse multiple SQL statements separated by semicolons
    pub fn parse_all(&mut self) -> Result<Vec<(Statement, usize)>> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(&Token::Semicolon) {
                self.advance();
                continue;
            }
            let stmt = self.parse_one()?;
            statements.push((stmt, self.param_count));
        }

        Ok(statements)
    }

    fn parse_one(&mut self) -> Result<Statement> {
        self.param_count = 0;
        let stmt = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        } else if !self.is_at_end() {
            return Err(self.unexpected("';' or end of input"));
        }

        Ok(stmt)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Create => self.parse_create_table().map(Statement::CreateTable),
            Token::Drop => self.parse_drop().map(Statement::DropTable),
            Token::Begin => self.parse_transaction_control(Token::Begin, Statement::BeginTransaction),
            Token::Commit => self.parse_transaction_control(Token::Commit, Statement::Commit),
            Token::Rollback => {
                self.parse_transaction_control(Token::Rollback, Statement::Rollback)
            }
            _ => Err(self.unexpected(
                "SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, BEGIN, COMMIT or ROLLBACK",
            )),
        }
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let mut stmt = SelectStatement {
            columns: self.parse_select_list()?,
            ..SelectStatement::default()
        };

        self.expect(&Token::From)?;
        stmt.from = self.expect_identifier()?;

        // WHERE clause
        stmt.where_clause = self.parse_where()?;

        // ORDER BY clause
        if self.check(&Token::Order) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.order_by = self.parse_order_by_list()?;
        }

        // LIMIT clause
        if self.check(&Token::Limit) {
            self.advance();
            stmt.limit = Some(self.parse_expr()?);
        }

        Ok(stmt)
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();

        loop {
            items.push(self.parse_select_item()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }

        let expr = self.parse_expr()?;
        let alias = if self.check(&Token::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };

        Ok(SelectItem::Expr { expr, alias })
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();

        loop {
            let expr = self.parse_expr()?;
            let ascending = if self.check(&Token::Desc) {
                self.advance();
                false
            } else {
                if self.check(&Token::Asc) {
                    self.advance();
                }
                true
            };

            items.push(OrderByItem { expr, ascending });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    fn parse_where(&mut self) -> Result<Option<Expr>> {
        if self.check(&Token::Where) {
            self.advance();
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        // Optional column list
        let columns = if self.check(&Token::LParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect(&Token::RParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect(&Token::Values)?;

        // Parse value rows
        let mut values = Vec::new();
        loop {
            self.expect(&Token::LParen)?;
            let row = self.parse_expr_list()?;
            self.expect(&Token::RParen)?;
            values.push(row);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_expr()?;
            assignments.push(Assignment { column, value });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_where()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_where()?;

        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    // ========== CREATE / DROP ==========

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let if_not_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Not)?;
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        loop {
            // Check for table constraint
            if self.check(&Token::Primary) || self.check(&Token::Foreign) {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
            constraints,
            if_not_exists,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let mut column = ColumnDef::new(name, self.parse_data_type()?);

        // Parse column constraints
        loop {
            match self.current() {
                Token::Not => {
                    self.advance();
                    self.expect(&Token::Null)?;
                    column.not_null = true;
                }
                Token::Null => {
                    // NULL is allowed (default)
                    self.advance();
                }
                Token::Primary => {
                    self.advance();
                    self.expect(&Token::Key)?;
                    column.primary_key = true;
                    column.not_null = true;
                }
                Token::References => {
                    let (table, column_name) = self.parse_references()?;
                    column.references = Some((table, column_name));
                }
                _ => break,
            }
        }

        Ok(column)
    }

    /// REFERENCES table (column)
    fn parse_references(&mut self) -> Result<(String, String)> {
        self.expect(&Token::References)?;
        let table = self.expect_identifier()?;
        self.expect(&Token::LParen)?;
        let column = self.expect_identifier()?;
        self.expect(&Token::RParen)?;
        Ok((table, column))
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current() {
            Token::Boolean => DataType::Boolean,
            Token::Int | Token::Integer | Token::BigInt | Token::SmallInt => DataType::Integer,
            Token::Float | Token::Real | Token::Double => DataType::Float,
            Token::Text => DataType::Text,
            Token::Varchar => {
                self.advance();
                self.expect(&Token::LParen)?;
                let position = self.current_position();
                let length = self.expect_integer()?;
                self.expect(&Token::RParen)?;
                let length = usize::try_from(length)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| Error::syntax("VARCHAR length must be positive", position))?;
                return Ok(DataType::Varchar(length));
            }
            _ => return Err(self.unexpected("data type")),
        };
        self.advance();
        Ok(data_type)
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        if self.check(&Token::Primary) {
            self.advance();
            self.expect(&Token::Key)?;
            self.expect(&Token::LParen)?;
            let columns = self.parse_identifier_list()?;
            self.expect(&Token::RParen)?;
            return Ok(TableConstraint::PrimaryKey { columns });
        }

        self.expect(&Token::Foreign)?;
        self.expect(&Token::Key)?;
        self.expect(&Token::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::References)?;
        let ref_table = self.expect_identifier()?;
        self.expect(&Token::LParen)?;
        let ref_columns = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;

        Ok(TableConstraint::ForeignKey {
            columns,
            ref_table,
            ref_columns,
        })
    }

    fn parse_drop(&mut self) -> Result<DropTableStatement> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;

        let if_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.expect_identifier()?;
        Ok(DropTableStatement {
            table_name,
            if_exists,
        })
    }

    // ========== Transaction Statements ==========

    fn parse_transaction_control(&mut self, keyword: Token, stmt: Statement) -> Result<Statement> {
        self.expect(&keyword)?;
        if self.check(&Token::Transaction) {
            self.advance();
        }
        Ok(stmt)
    }

    // ========== Expressions ==========

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::binary(left, BinaryOperator::Or, right);
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_not_expr()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::binary(left, BinaryOperator::And, right);
        }

        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr> {
        if self.check(&Token::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            })
        } else {
            self.parse_comparison_expr()
        }
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let left = self.parse_additive_expr()?;

        // IS NULL / IS NOT NULL
        if self.check(&Token::Is) {
            self.advance();
            if self.check(&Token::Not) {
                self.advance();
                self.expect(&Token::Null)?;
                return Ok(Expr::IsNotNull(Box::new(left)));
            }
            self.expect(&Token::Null)?;
            return Ok(Expr::IsNull(Box::new(left)));
        }

        // Comparison operators
        let op = match self.current() {
            Token::Eq => Some(BinaryOperator::Eq),
            Token::Neq => Some(BinaryOperator::Neq),
            Token::Lt => Some(BinaryOperator::Lt),
            Token::Gt => Some(BinaryOperator::Gt),
            Token::Lte => Some(BinaryOperator::Lte),
            Token::Gte => Some(BinaryOperator::Gte),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive_expr()?;
            Ok(Expr::binary(left, op, right))
        } else {
            Ok(left)
        }
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                Token::Concat => BinaryOperator::Concat,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Token::Asterisk => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        match self.current() {
            Token::Minus => {
                self.advance();
                // Fold negative literals
                match self.current().clone() {
                    Token::IntegerLiteral(n) => {
                        self.advance();
                        return Ok(Expr::Literal(Literal::Integer(-n)));
                    }
                    Token::FloatLiteral(n) => {
                        self.advance();
                        return Ok(Expr::Literal(Literal::Float(-n)));
                    }
                    _ => {}
                }
                let expr = self.parse_unary_expr()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: Box::new(expr),
                })
            }
            Token::Plus => {
                self.advance();
                self.parse_unary_expr()
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let expr = match self.current().clone() {
            // Literals
            Token::IntegerLiteral(n) => Expr::Literal(Literal::Integer(n)),
            Token::FloatLiteral(n) => Expr::Literal(Literal::Float(n)),
            Token::StringLiteral(s) => Expr::Literal(Literal::String(s)),
            Token::True => Expr::Literal(Literal::Boolean(true)),
            Token::False => Expr::Literal(Literal::Boolean(false)),
            Token::Null => Expr::Literal(Literal::Null),

            // Parameters
            Token::Placeholder(index) => {
                let index = match index {
                    Some(index) => index,
                    None => self
                        .param_count
                        .checked_add(1)
                        .filter(|next| *next <= MAX_PARAMETER_INDEX)
                        .ok_or_else(|| {
                            Error::syntax("too many parameters", self.current_position())
                        })?,
                };
                self.param_count = self.param_count.max(index);
                Expr::Parameter(index)
            }

            // Parenthesized expression
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(Expr::Nested(Box::new(inner)));
            }

            // Column reference
            _ => return self.expect_identifier().map(Expr::Column),
        };

        self.advance();
        Ok(expr)
    }

    // ========== Helper functions ==========

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();

        loop {
            exprs.push(self.parse_expr()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(exprs)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|(token, _)| token)
            .unwrap_or(&Token::Eof)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|(_, pos)| *pos)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    /// Accept an identifier, or an unreserved keyword used as a name
    fn expect_identifier(&mut self) -> Result<String> {
        let name = match self.current() {
            Token::Identifier(name) => name.clone(),
            token if token.is_unreserved() => token.to_string().to_lowercase(),
            _ => return Err(self.unexpected("identifier")),
        };
        self.advance();
        Ok(name)
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.current() {
            Token::IntegerLiteral(n) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::syntax(
            format!("expected {}, found {}", expected, self.current()),
            self.current_position(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        Parser::new(sql).unwrap().parse().unwrap()
    }

    #[test]
    fn test_parse_simple_select() {
        match parse("SELECT * FROM users") {
            Statement::Select(s) => {
                assert_eq!(s.columns, vec![SelectItem::Wildcard]);
                assert_eq!(s.from, "users");
                assert!(s.where_clause.is_none());
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_select_clauses() {
        let stmt = parse(
            "SELECT firstName AS name, balance * 2 FROM account \
             WHERE balance > 10 AND owner IS NOT NULL ORDER BY balance DESC, id LIMIT 5;",
        );
        let Statement::Select(s) = stmt else {
            panic!("expected SELECT");
        };

        assert_eq!(s.columns.len(), 2);
        assert!(matches!(
            &s.columns[0],
            SelectItem::Expr { alias: Some(a), .. } if a == "name"
        ));
        assert!(matches!(
            s.where_clause,
            Some(Expr::BinaryOp { op: BinaryOperator::And, .. })
        ));
        assert_eq!(s.order_by.len(), 2);
        assert!(!s.order_by[0].ascending);
        assert!(s.order_by[1].ascending);
        assert_eq!(s.limit, Some(Expr::Literal(Literal::Integer(5))));
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse(
            "CREATE TABLE IF NOT EXISTS account (\
                id INTEGER PRIMARY KEY, \
                owner INT REFERENCES user (id), \
                balance BIGINT NOT NULL, \
                note VARCHAR(20) NULL)",
        );
        let Statement::CreateTable(ct) = stmt else {
            panic!("expected CREATE TABLE");
        };

        assert!(ct.if_not_exists);
        assert_eq!(ct.table_name, "account");
        assert_eq!(ct.columns.len(), 4);
        assert!(ct.columns[0].primary_key && ct.columns[0].not_null);
        assert_eq!(
            ct.columns[1].references,
            Some(("user".to_string(), "id".to_string()))
        );
        assert!(ct.columns[2].not_null);
        assert_eq!(ct.columns[3].data_type, DataType::Varchar(20));
        assert!(!ct.columns[3].not_null);
    }

    #[test]
    fn test_parse_table_constraints() {
        let stmt = parse(
            "CREATE TABLE t (a INTEGER, b INTEGER, \
             PRIMARY KEY (a), FOREIGN KEY (b) REFERENCES t (a))",
        );
        let Statement::CreateTable(ct) = stmt else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(
            ct.constraints,
            vec![
                TableConstraint::PrimaryKey {
                    columns: vec!["a".into()]
                },
                TableConstraint::ForeignKey {
                    columns: vec!["b".into()],
                    ref_table: "t".into(),
                    ref_columns: vec!["a".into()],
                },
            ]
        );
    }

    #[test]
    fn test_parse_insert() {
        let mut parser = Parser::new("INSERT INTO user (id, firstName) VALUES (?, ?), (?3, 'x')").unwrap();
        let stmt = parser.parse().unwrap();
        assert_eq!(parser.param_count(), 3);

        let Statement::Insert(ins) = stmt else {
            panic!("expected INSERT");
        };
        assert_eq!(ins.columns, Some(vec!["id".into(), "firstName".into()]));
        assert_eq!(ins.values.len(), 2);
        assert_eq!(ins.values[0][1], Expr::Parameter(2));
        assert_eq!(ins.values[1][0], Expr::Parameter(3));
    }

    #[test]
    fn test_parse_update_and_delete() {
        let stmt = parse("UPDATE account SET balance = balance-50 WHERE id = 2");
        let Statement::Update(up) = stmt else {
            panic!("expected UPDATE");
        };
        assert_eq!(up.assignments[0].column, "balance");
        assert_eq!(
            up.assignments[0].value,
            Expr::binary(
                Expr::Column("balance".into()),
                BinaryOperator::Sub,
                Expr::Literal(Literal::Integer(50))
            )
        );

        let stmt = parse("DELETE FROM account");
        assert!(matches!(
            stmt,
            Statement::Delete(DeleteStatement { where_clause: None, .. })
        ));
    }

    #[test]
    fn test_operator_precedence() {
        let Statement::Select(s) = parse("SELECT 1 + 2 * 3 FROM t") else {
            panic!("expected SELECT");
        };
        let SelectItem::Expr { expr, .. } = &s.columns[0] else {
            panic!("expected expression");
        };
        assert_eq!(expr.to_string(), "1 + 2 * 3");
        assert!(matches!(
            expr,
            Expr::BinaryOp { op: BinaryOperator::Add, .. }
        ));
    }

    #[test]
    fn test_parse_transaction_control() {
        assert_eq!(parse("BEGIN"), Statement::BeginTransaction);
        assert_eq!(parse("begin transaction;"), Statement::BeginTransaction);
        assert_eq!(parse("COMMIT"), Statement::Commit);
        assert_eq!(parse("ROLLBACK TRANSACTION"), Statement::Rollback);
        assert_eq!(parse("DROP TABLE IF EXISTS t").kind(), StatementKind::Ddl);
    }

    #[test]
    fn test_parameter_limit() {
        let mut parser = Parser::new(&format!("SELECT ?{} + ?", MAX_PARAMETER_INDEX)).unwrap();
        let err = parser.parse().unwrap_err();
        assert!(matches!(err, Error::Syntax { position: 16, .. }));

        let mut parser = Parser::new("SELECT ?32765 + ?").unwrap();
        parser.parse().unwrap();
        assert_eq!(parser.param_count(), MAX_PARAMETER_INDEX);
    }

    #[test]
    fn test_parse_all() {
        let mut parser = Parser::new("BEGIN; UPDATE t SET a = ? WHERE id = ?; COMMIT;").unwrap();
        let stmts = parser.parse_all().unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[1].1, 2);
        assert_eq!(stmts[2], (Statement::Commit, 0));
    }

    #[test]
    fn test_syntax_errors() {
        let err = Parser::new("SELEC * FROM t").unwrap().parse().unwrap_err();
        assert!(matches!(err, Error::Syntax { position: 0, .. }));

        let err = Parser::new("SELECT * FROM").unwrap().parse().unwrap_err();
        assert!(matches!(err, Error::Syntax { position: 13, .. }));

        assert!(Parser::new("SELECT * FROM t; SELECT * FROM t")
            .unwrap()
            .parse()
            .is_err());
        assert!(Parser::new("CREATE TABLE t (a VARCHAR(0))")
            .unwrap()
            .parse()
            .is_err());
        assert!(Parser::new("SELECT * FROM t JOIN u").unwrap().parse().is_err());
    }
}
