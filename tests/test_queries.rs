use arclite::{connect, Connection, CursorState, Database, Error, Value};

fn users() -> Connection {
    let conn = connect(":memory:").unwrap();
    conn.execute(
        "CREATE TABLE user (id INTEGER PRIMARY KEY, firstName VARCHAR(20))",
        &[],
    )
    .unwrap();
    let mut insert = conn.prepare("INSERT INTO user VALUES (?, ?)").unwrap();
    for (id, name) in [(32, "Neha"), (40, "Carlos"), (47, "Josh")] {
        insert.bind(1, id).unwrap();
        insert.bind(2, name).unwrap();
        assert_eq!(insert.execute().unwrap().affected_rows(), 1);
    }
    conn
}

fn names(conn: &Connection) -> Vec<String> {
    conn.query("SELECT firstName FROM user", &[])
        .unwrap()
        .filter_map(|row| row.get(0).and_then(Value::as_str).map(str::to_string))
        .collect()
}

#[test]
fn test_scan_in_insertion_order() {
    let conn = users();
    let mut cursor = conn.query("SELECT * FROM user", &[]).unwrap();
    assert_eq!(cursor.column_names(), ["id", "firstName"]);

    let mut seen = Vec::new();
    while cursor.advance().unwrap() {
        let id = cursor.current_value(0).unwrap().clone();
        let name = cursor.value_by_name("firstName").unwrap().clone();
        seen.push((id, name));
    }
    assert_eq!(
        seen,
        vec![
            (Value::Integer(32), Value::from("Neha")),
            (Value::Integer(40), Value::from("Carlos")),
            (Value::Integer(47), Value::from("Josh")),
        ]
    );
    assert_eq!(cursor.state(), CursorState::Exhausted);
    assert!(!cursor.advance().unwrap());
}

#[test]
fn test_duplicate_key_leaves_table_unchanged() {
    let conn = users();
    let err = conn
        .execute("INSERT INTO user VALUES (40, 'Carla')", &[])
        .unwrap_err();
    assert!(matches!(err, Error::PrimaryKeyViolation { .. }));
    assert_eq!(names(&conn), vec!["Neha", "Carlos", "Josh"]);
}

#[test]
fn test_cursor_is_a_snapshot() {
    let conn = users();
    let cursor = conn
        .query("SELECT id FROM user WHERE id > ?", &[Value::Integer(35)])
        .unwrap();

    conn.execute("DELETE FROM user", &[]).unwrap();
    conn.execute("INSERT INTO user VALUES (99, 'Late')", &[])
        .unwrap();

    assert_eq!(cursor.count(), 2);
    assert_eq!(names(&conn), vec!["Late"]);
}

#[test]
fn test_update_where_and_order() {
    let conn = users();
    let result = conn
        .execute(
            "UPDATE user SET firstName = firstName || '!' WHERE id <> 40",
            &[],
        )
        .unwrap();
    assert_eq!(result.affected_rows(), 2);

    let rows: Vec<_> = conn
        .query("SELECT id AS pos FROM user ORDER BY pos DESC LIMIT 2", &[])
        .unwrap()
        .map(|row| row.into_values())
        .collect();
    assert_eq!(rows, vec![vec![Value::Integer(47)], vec![Value::Integer(40)]]);
    assert_eq!(names(&conn), vec!["Neha!", "Carlos", "Josh!"]);
}

#[test]
fn test_parameter_errors() {
    let conn = users();
    assert_eq!(
        conn.execute("SELECT * FROM user WHERE id = ?", &[]).unwrap_err(),
        Error::UnboundParameter(1)
    );
    assert_eq!(
        conn.execute("SELECT * FROM user", &[Value::Integer(1)])
            .unwrap_err(),
        Error::ParameterOutOfRange { index: 1, count: 0 }
    );

    let mut stmt = conn
        .prepare("SELECT firstName FROM user WHERE id = ?1 OR id = ?2")
        .unwrap();
    stmt.bind(2, 47).unwrap();
    assert_eq!(stmt.query().unwrap_err(), Error::UnboundParameter(1));
    stmt.bind(1, 32).unwrap();
    assert_eq!(stmt.query().unwrap().count(), 2);
}

#[test]
fn test_statement_errors() {
    let conn = users();
    assert!(matches!(
        conn.execute("SELEC * FROM user", &[]),
        Err(Error::Syntax { .. })
    ));
    assert!(matches!(
        conn.execute("SELECT nickname FROM user", &[]),
        Err(Error::UnknownColumn { .. })
    ));
    assert!(matches!(
        conn.execute("SELECT * FROM users", &[]),
        Err(Error::UnknownTable(_))
    ));
    assert!(matches!(
        conn.execute("INSERT INTO user VALUES (1, 'ThisNameIsFarTooLongToFit')", &[]),
        Err(Error::ValueTooLarge { .. })
    ));
    assert!(matches!(
        conn.query("DELETE FROM user WHERE id = 32", &[]),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn test_foreign_keys() {
    let conn = users();
    conn.execute(
        "CREATE TABLE post (id INTEGER PRIMARY KEY, author INTEGER REFERENCES user(id), body TEXT)",
        &[],
    )
    .unwrap();

    conn.execute("INSERT INTO post VALUES (1, 32, 'hello')", &[])
        .unwrap();
    conn.execute("INSERT INTO post VALUES (2, NULL, 'anonymous')", &[])
        .unwrap();
    assert!(matches!(
        conn.execute("INSERT INTO post VALUES (3, 7, 'nobody')", &[]),
        Err(Error::ForeignKeyViolation { .. })
    ));
    assert!(matches!(
        conn.execute("DROP TABLE user", &[]),
        Err(Error::InvalidSchema { .. })
    ));

    let relaxed = connect("memory://?foreign_keys=off").unwrap();
    relaxed
        .execute("CREATE TABLE a (id INTEGER PRIMARY KEY)", &[])
        .unwrap();
    relaxed
        .execute(
            "CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id))",
            &[],
        )
        .unwrap();
    relaxed
        .execute("INSERT INTO b VALUES (1, 5)", &[])
        .unwrap();
}

#[test]
fn test_whole_float_keys() {
    let conn = users();
    conn.execute(
        "CREATE TABLE score (id INTEGER PRIMARY KEY, user_id FLOAT REFERENCES user(id))",
        &[],
    )
    .unwrap();
    assert_eq!(
        conn.execute("INSERT INTO score VALUES (1, 32)", &[])
            .unwrap()
            .affected_rows(),
        1
    );
    assert!(matches!(
        conn.execute("INSERT INTO score VALUES (2, 32.5)", &[]),
        Err(Error::ForeignKeyViolation { .. })
    ));

    conn.execute("UPDATE user SET firstName = 'Carl' WHERE id = 40.0", &[])
        .unwrap();
    conn.execute("DELETE FROM user WHERE id = 47.0", &[]).unwrap();
    assert_eq!(names(&conn), vec!["Neha", "Carl"]);
}

#[test]
fn test_closed_resources() {
    let db = Database::open("memory://closing").unwrap();
    let conn = db.connect();
    conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
        .unwrap();
    conn.execute("INSERT INTO t VALUES (1)", &[]).unwrap();

    let mut cursor = conn.query("SELECT * FROM t", &[]).unwrap();
    cursor.close();
    assert!(cursor.is_closed());
    assert_eq!(cursor.advance(), Err(Error::ResourceClosed("cursor")));

    let mut stmt = conn.prepare("SELECT * FROM t").unwrap();
    conn.close();
    assert_eq!(stmt.execute().unwrap_err(), Error::ResourceClosed("connection"));
    assert_eq!(
        conn.begin_transaction(),
        Err(Error::ResourceClosed("connection"))
    );

    // Data outlives the closed connection
    let other = db.connect();
    assert_eq!(other.query("SELECT * FROM t", &[]).unwrap().count(), 1);
}

#[test]
fn test_connect_errors() {
    for target in ["", "file:///tmp/db", "memory://x?autocommit=sometimes"] {
        assert!(matches!(connect(target), Err(Error::Connection(_))));
    }
    let conn = connect("memory://ledger?autocommit=off").unwrap();
    assert!(!conn.auto_commit());
    assert_eq!(conn.database().config().name, "ledger");
}

#[test]
fn test_output_serializes() {
    let conn = users();
    let output = conn
        .query("SELECT id, firstName FROM user WHERE id = 32", &[])
        .unwrap()
        .into_output()
        .unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["columns"], serde_json::json!(["id", "firstName"]));
    assert_eq!(json["rows"].as_array().map(Vec::len), Some(1));
}
