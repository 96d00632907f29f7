//! arclite - CLI Client

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use arclite::connection::MEMORY_TARGET;
use arclite::sql::{Lexer, ParsedStatement, Parser, Token};
use arclite::{Connection, Error, QueryOutput, QueryResult};

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Table,
    Json,
}

/// Print welcome banner
fn print_banner(conn: &Connection) {
    println!(
        r#"
                 _ _ _
   __ _ _ __ ___| (_) |_ ___
  / _` | '__/ __| | | __/ _ \
 | (_| | | | (__| | | ||  __/
  \__,_|_|  \___|_|_|\__\___|

 An embedded in-memory relational engine in Rust
 Connected to '{}'. Type '.help' for help, '.quit' to exit
"#,
        conn.database().config().name
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help                  Show this help message
  .quit, .exit           Exit arclite
  .tables                List all tables
  .schema [table]        Show table schema
  .mode table|json       Set the output format
  .autocommit on|off     Commit each statement on its own

SQL Commands:
  CREATE TABLE ...       Create a new table
  DROP TABLE ...         Drop a table
  INSERT INTO ...        Insert rows
  SELECT ...             Query data
  UPDATE ...             Update rows
  DELETE FROM ...        Delete rows
  BEGIN / COMMIT / ROLLBACK

Statements end with ';' and may span several lines.

Examples:
  CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(100));
  INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob');
  SELECT * FROM users WHERE id = 1;
"#
    );
}

/// Format query results as a table
fn format_results(output: &QueryOutput) -> String {
    let columns = &output.columns;
    let rows = &output.rows;

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (i, value) in row.values().iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(value.to_string().chars().count());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut out = String::new();
    out.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    out.push_str(&format!("|{}|\n", header));
    out.push_str(&separator);

    for row in rows {
        let row_str: String = row
            .values()
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", v.to_string(), width = *w))
            .collect::<Vec<_>>()
            .join("|");
        out.push_str(&format!("|{}|\n", row_str));
    }

    if !rows.is_empty() {
        out.push_str(&separator);
    }

    out.push_str(&format!("{} row(s) returned\n", rows.len()));
    out
}

fn print_result(result: QueryResult, format: OutputFormat) {
    let affected = result.affected_rows();
    match result.into_cursor() {
        Some(cursor) => match cursor.into_output() {
            Ok(output) if format == OutputFormat::Json => match serde_json::to_string(&output) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Serialization error: {}", e),
            },
            Ok(output) => print!("{}", format_results(&output)),
            Err(e) => eprintln!("Error: {}", e),
        },
        None if affected > 0 => println!("{} row(s) affected", affected),
        None => println!("OK"),
    }
}

/// Execute every statement in a buffer, stopping at the first error
fn execute_sql(sql: &str, conn: &Connection, format: OutputFormat) {
    let statements = match Parser::new(sql).and_then(|mut p| p.parse_all()) {
        Ok(statements) => statements,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return;
        }
    };

    for (statement, param_count) in statements {
        let parsed = ParsedStatement {
            statement,
            param_count,
        };
        match conn.execute_statement(&parsed, &[]) {
            Ok(result) => print_result(result, format),
            Err(e) => {
                eprintln!("Error: {}", e);
                return;
            }
        }
    }
}

/// What the REPL should do after a dot command
enum Flow {
    Continue,
    Quit,
}

/// Handle special dot commands
fn handle_special_command(cmd: &str, conn: &Connection, format: &mut OutputFormat) -> Flow {
    let parts: Vec<&str> = cmd.split_whitespace().collect();

    match parts.first().copied() {
        Some(".help") => print_help(),
        Some(".quit") | Some(".exit") => return Flow::Quit,
        Some(".tables") => {
            let tables = conn.catalog().list_tables();
            if tables.is_empty() {
                println!("No tables found.");
            } else {
                println!("Tables:");
                for table in tables {
                    println!("  {}", table);
                }
            }
        }
        Some(".schema") => {
            let names = match parts.get(1) {
                Some(name) => vec![name.to_string()],
                None => conn.catalog().list_tables(),
            };
            for name in names {
                match conn.catalog().describe(&name) {
                    Ok(info) => println!("{}", info),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
        }
        Some(".mode") => match parts.get(1).copied() {
            Some("table") => *format = OutputFormat::Table,
            Some("json") => *format = OutputFormat::Json,
            _ => eprintln!("Usage: .mode table|json"),
        },
        Some(".autocommit") => {
            let setting = match parts.get(1).copied() {
                Some("on") => Some(true),
                Some("off") => Some(false),
                _ => None,
            };
            match setting {
                Some(on) => {
                    if let Err(e) = conn.set_auto_commit(on) {
                        eprintln!("Error: {}", e);
                    }
                }
                None => println!(
                    "autocommit is {}",
                    if conn.auto_commit() { "on" } else { "off" }
                ),
            }
        }
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Type '.help' for available commands.");
        }
        None => {}
    }
    Flow::Continue
}

/// Main REPL loop
fn run_repl(conn: &Connection) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut format = OutputFormat::Table;
    let mut buffer = String::new();

    print_banner(conn);

    loop {
        let prompt = if !buffer.is_empty() {
            "   ...> "
        } else if conn.in_transaction() {
            "arclite*> "
        } else {
            "arclite> "
        };

        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        editor.add_history_entry(trimmed)?;

        if buffer.is_empty() && trimmed.starts_with('.') {
            match handle_special_command(trimmed, conn, &mut format) {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }

        buffer.push_str(&line);
        buffer.push('\n');

        if statement_complete(&buffer) {
            execute_sql(&buffer, conn, format);
            buffer.clear();
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// True once the buffered input ends with a `;` outside any literal
fn statement_complete(buffer: &str) -> bool {
    match Lexer::new(buffer).tokenize() {
        Ok(tokens) => matches!(
            tokens.iter().rev().find(|token| **token != Token::Eof),
            Some(Token::Semicolon)
        ),
        // A quote may still be closed on a later line
        Err(Error::Syntax { message, .. }) if message.starts_with("unterminated") => false,
        Err(_) => buffer.trim_end().ends_with(';'),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| MEMORY_TARGET.to_string());
    let conn = arclite::connect(&target)?;

    run_repl(&conn)?;
    conn.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_complete() {
        assert!(statement_complete("SELECT * FROM t;\n"));
        assert!(statement_complete("SELECT *\nFROM t; -- done\n"));
        assert!(!statement_complete("SELECT * FROM t\n"));

        assert!(!statement_complete("INSERT INTO t VALUES (1, 'a;\n"));
        assert!(statement_complete("INSERT INTO t VALUES (1, 'a;\nb');\n"));
        assert!(!statement_complete("SELECT 1 /* ; \n"));

        // Lexer errors are left for execution to report
        assert!(statement_complete("SELECT @;\n"));
    }
}
