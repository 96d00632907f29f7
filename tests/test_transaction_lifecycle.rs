use arclite::{connect, Connection, Error, Value};

fn bank() -> Connection {
    let conn = connect(":memory:").unwrap();
    conn.execute(
        "CREATE TABLE account (id INTEGER PRIMARY KEY, owner VARCHAR(20), balance INTEGER NOT NULL)",
        &[],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO account VALUES (1, 'Neha', 100), (2, 'Carlos', 100)",
        &[],
    )
    .unwrap();
    conn
}

fn balances(conn: &Connection) -> Vec<i64> {
    conn.query("SELECT balance FROM account ORDER BY id", &[])
        .unwrap()
        .filter_map(|row| row.get(0).and_then(Value::as_i64))
        .collect()
}

fn transfer(conn: &Connection, from: i64, to: i64, amount: i64) -> arclite::Result<()> {
    conn.begin_transaction()?;
    conn.execute(
        "UPDATE account SET balance = balance - ? WHERE id = ?",
        &[amount.into(), from.into()],
    )?;
    conn.execute(
        "UPDATE account SET balance = balance + ? WHERE id = ?",
        &[amount.into(), to.into()],
    )?;
    conn.commit()
}

#[test]
fn test_transaction_lifecycle() {
    let conn = connect(":memory:").unwrap();

    let first = conn.begin_transaction().unwrap();
    assert!(conn.in_transaction());
    assert_eq!(conn.begin_transaction(), Err(Error::TransactionAlreadyActive(first)));
    conn.commit().unwrap();
    assert!(!conn.in_transaction());

    let second = conn.begin_transaction().unwrap();
    assert!(second > first);
    conn.rollback().unwrap();
    assert_eq!(conn.commit(), Err(Error::NoActiveTransaction));
}

#[test]
fn test_transfer_commits() {
    let conn = bank();
    transfer(&conn, 2, 1, 50).unwrap();
    assert_eq!(balances(&conn), vec![150, 50]);
}

#[test]
fn test_transfer_to_missing_account_rolls_back() {
    let conn = bank();

    let err = transfer(&conn, 2, 3, 50).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(!conn.in_transaction());
    assert_eq!(balances(&conn), vec![100, 100]);
}

#[test]
fn test_double_rollback() {
    let conn = bank();
    conn.begin_transaction().unwrap();
    conn.execute("DELETE FROM account WHERE id = 1", &[]).unwrap();

    conn.rollback().unwrap();
    assert_eq!(conn.rollback(), Err(Error::NoActiveTransaction));
    assert_eq!(balances(&conn), vec![100, 100]);
}

#[test]
fn test_sql_transaction_control() {
    let conn = bank();
    conn.execute("BEGIN TRANSACTION", &[]).unwrap();
    conn.execute("INSERT INTO account VALUES (3, 'Josh', 5)", &[])
        .unwrap();
    assert_eq!(balances(&conn), vec![100, 100, 5]);
    conn.execute("ROLLBACK", &[]).unwrap();
    assert_eq!(balances(&conn), vec![100, 100]);

    conn.execute("BEGIN", &[]).unwrap();
    conn.execute("UPDATE account SET balance = 0 WHERE owner = 'Neha'", &[])
        .unwrap();
    conn.execute("COMMIT", &[]).unwrap();
    assert_eq!(balances(&conn), vec![0, 100]);
}

#[test]
fn test_failed_statement_keeps_transaction_open() {
    let conn = bank();
    conn.begin_transaction().unwrap();
    conn.execute("UPDATE account SET balance = 1 WHERE id = 1", &[])
        .unwrap();

    let err = conn
        .execute("UPDATE account SET balance = balance / 0", &[])
        .unwrap_err();
    assert_eq!(err, Error::DivisionByZero);
    assert!(conn.in_transaction());

    conn.commit().unwrap();
    assert_eq!(balances(&conn), vec![1, 100]);
}

#[test]
fn test_auto_commit_off() {
    let conn = bank();
    conn.set_auto_commit(false).unwrap();
    assert!(!conn.auto_commit());

    conn.execute("UPDATE account SET balance = balance + 1", &[])
        .unwrap();
    assert!(conn.in_transaction());
    conn.rollback().unwrap();
    assert_eq!(balances(&conn), vec![100, 100]);

    conn.execute("UPDATE account SET balance = balance + 1", &[])
        .unwrap();
    conn.commit().unwrap();
    assert_eq!(balances(&conn), vec![101, 101]);
}

#[test]
fn test_commit_rechecks_constraints() {
    let conn = bank();
    conn.begin_transaction().unwrap();
    conn.execute("INSERT INTO account VALUES (3, 'Josh', 0)", &[])
        .unwrap();

    // Key 3 is taken in the transaction's view
    let err = conn
        .execute("INSERT INTO account VALUES (3, 'Josh', 0)", &[])
        .unwrap_err();
    assert!(matches!(err, Error::PrimaryKeyViolation { .. }));

    conn.commit().unwrap();
    assert_eq!(balances(&conn), vec![100, 100, 0]);
}

#[test]
fn test_commit_foreign_key_violation_rolls_back() {
    let conn = bank();
    conn.execute(
        "CREATE TABLE payment (id INTEGER PRIMARY KEY, account_id INTEGER REFERENCES account(id))",
        &[],
    )
    .unwrap();

    conn.begin_transaction().unwrap();
    conn.execute("UPDATE account SET balance = 0 WHERE id = 1", &[])
        .unwrap();
    conn.execute("INSERT INTO payment VALUES (1, 9)", &[]).unwrap();

    let err = conn.commit().unwrap_err();
    assert!(matches!(
        err,
        Error::ForeignKeyViolation { ref referenced_table, .. } if referenced_table == "account"
    ));
    assert!(!conn.in_transaction());
    assert_eq!(balances(&conn), vec![100, 100]);
    assert_eq!(conn.query("SELECT * FROM payment", &[]).unwrap().count(), 0);
}
