/// Integration tests for the SQLite engine handle
use pretty_assertions::assert_eq;
use tabstage_core::{Connection, EngineError, SchemaIntrospection, Value};
use tabstage_driver_sqlite::{SqliteConnection, SqliteOptions};

async fn setup_people() -> SqliteConnection {
    let conn = SqliteConnection::open(":memory:").expect("Failed to open in-memory database");
    conn.execute(
        r#"CREATE TABLE "people" ("name" TEXT, "age" INTEGER NOT NULL)"#,
        &[],
    )
    .await
    .expect("Failed to create table");
    conn
}

async fn count(conn: &SqliteConnection, table: &str) -> i64 {
    conn.query(&format!("SELECT COUNT(*) FROM \"{}\"", table), &[])
        .await
        .expect("count query")
        .scalar()
        .and_then(Value::as_i64)
        .expect("integer count")
}

#[tokio::test]
async fn execute_each_inserts_in_order() {
    let conn = setup_people().await;
    let tx = conn.begin_transaction().await.unwrap();
    let rows = vec![
        vec![Value::String("ada".into()), Value::String("36".into())],
        vec![Value::String("grace".into()), Value::String("45".into())],
        vec![Value::Null, Value::String("1".into())],
    ];
    let affected = tx
        .execute_each(
            r#"INSERT INTO "people" ("name", "age") VALUES (?1, ?2)"#,
            &rows,
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(affected, 3);
    let result = conn
        .query(r#"SELECT "name" FROM "people" ORDER BY rowid"#, &[])
        .await
        .unwrap();
    let names: Vec<Value> = result.rows.iter().map(|r| r.values[0].clone()).collect();
    assert_eq!(
        names,
        vec![
            Value::String("ada".into()),
            Value::String("grace".into()),
            Value::Null
        ]
    );
}

#[tokio::test]
async fn execute_each_reports_failing_row_and_rolls_back() {
    let conn = setup_people().await;
    let tx = conn.begin_transaction().await.unwrap();
    let rows = vec![
        vec![Value::String("ada".into()), Value::String("36".into())],
        vec![Value::String("nobody".into()), Value::Null],
        vec![Value::String("grace".into()), Value::String("45".into())],
    ];
    let err = tx
        .execute_each(
            r#"INSERT INTO "people" ("name", "age") VALUES (?1, ?2)"#,
            &rows,
        )
        .await
        .unwrap_err();
    match err {
        EngineError::Row { index, .. } => assert_eq!(index, 1),
        other => panic!("expected row error, got {other:?}"),
    }
    tx.rollback().await.unwrap();

    assert_eq!(count(&conn, "people").await, 0);
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let conn = setup_people().await;
    {
        let tx = conn.begin_transaction().await.unwrap();
        tx.execute(
            r#"INSERT INTO "people" ("name", "age") VALUES ('x', 1)"#,
            &[],
        )
        .await
        .unwrap();
    }
    assert_eq!(count(&conn, "people").await, 0);
}

#[tokio::test]
async fn list_tables_excludes_internal_tables() {
    let conn = setup_people().await;
    conn.execute(
        "CREATE TABLE auto (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT)",
        &[],
    )
    .await
    .unwrap();
    conn.execute("INSERT INTO auto (v) VALUES ('a')", &[])
        .await
        .unwrap();

    let names: Vec<String> = conn
        .list_tables(None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["auto".to_string(), "people".to_string()]);
    assert!(conn.table_exists(None, "people").await.unwrap());
    assert!(conn.table_exists(None, "PEOPLE").await.unwrap());
    assert!(!conn.table_exists(None, "sqlite_sequence").await.unwrap());
}

#[tokio::test]
async fn get_columns_preserves_declaration_order() {
    let conn = setup_people().await;
    let columns = conn.get_columns(None, "people").await.unwrap();
    let described: Vec<(String, String)> = columns
        .into_iter()
        .map(|c| (c.name, c.data_type))
        .collect();
    assert_eq!(
        described,
        vec![
            ("name".to_string(), "TEXT".to_string()),
            ("age".to_string(), "INTEGER".to_string()),
        ]
    );
}

#[tokio::test]
async fn export_produces_sqlite_image() {
    let conn = setup_people().await;
    conn.execute(
        r#"INSERT INTO "people" ("name", "age") VALUES ('ada', 36)"#,
        &[],
    )
    .await
    .unwrap();

    let bytes = conn.export_database().await.unwrap();
    assert!(bytes.starts_with(b"SQLite format 3\0"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.sqlite");
    std::fs::write(&path, &bytes).unwrap();
    let copy = SqliteConnection::open_with_options(
        path.to_str().unwrap(),
        &SqliteOptions {
            journal_mode: None,
            foreign_keys: true,
        },
    )
    .unwrap();
    assert_eq!(count(&copy, "people").await, 1);
}

#[tokio::test]
async fn file_database_in_missing_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("db.sqlite");
    let err = SqliteConnection::open(path.to_str().unwrap()).err();
    assert!(matches!(err, Some(EngineError::Connection(_))));
}
