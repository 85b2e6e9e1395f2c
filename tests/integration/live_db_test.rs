//! Live database tests.
//!
//! Need a reachable server: set MYSQL_HOST (plus MYSQL_USER, MYSQL_PASSWORD,
//! MYSQL_DATABASE) or MSSQL_HOST (plus the MSSQL_* equivalents). Each test
//! skips itself when its host variable is not set.

use login_e2e::config::{DbConfig, HarnessConfig};
use login_e2e::db::{scoped_query, MssqlDriver, MysqlDriver, QueryDispatcher, Value};
use login_e2e::error::HarnessError;
use std::sync::Arc;

/// Helper to load the harness database settings with the given backend selected.
fn live_config(backend: &str, host_var: &str) -> Option<DbConfig> {
    std::env::var(host_var).ok()?;
    let mut db = HarnessConfig::from_env().ok()?.db;
    db.backend = backend.to_string();
    Some(db)
}

#[tokio::test]
async fn test_mysql_select_literal() {
    let Some(config) = live_config("mysql", "MYSQL_HOST") else {
        eprintln!("Skipping test: MYSQL_HOST not set");
        return;
    };

    let dispatcher = QueryDispatcher::new(Arc::new(config));
    let rows = dispatcher
        .execute("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("num"), Some(&Value::Int(1)));
    assert_eq!(rows[0].get("greeting").and_then(Value::as_str), Some("hello"));
}

#[tokio::test]
async fn test_mysql_syntax_error_is_query_error() {
    let Some(config) = live_config("mysql", "MYSQL_HOST") else {
        eprintln!("Skipping test: MYSQL_HOST not set");
        return;
    };

    let driver = MysqlDriver::new(config.mysql);
    let err = scoped_query(&driver, "SELEC 1").await.unwrap_err();
    assert!(matches!(err, HarnessError::Query(_)));

    // The pool from the failed call is gone; a new call still works.
    let rows = scoped_query(&driver, "SELECT 2 AS two").await.unwrap();
    assert_eq!(rows[0].get("two"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn test_mssql_select_literal() {
    let Some(config) = live_config("mssql", "MSSQL_HOST") else {
        eprintln!("Skipping test: MSSQL_HOST not set");
        return;
    };

    let dispatcher = QueryDispatcher::new(Arc::new(config));
    let rows = dispatcher
        .execute("SELECT 1 AS num, N'hello' AS greeting, NULL AS nothing")
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("num"), Some(&Value::Int(1)));
    assert_eq!(rows[0].get("greeting").and_then(Value::as_str), Some("hello"));
    assert_eq!(rows[0].get("nothing"), Some(&Value::Null));
}

#[tokio::test]
async fn test_mssql_missing_table_is_query_error() {
    let Some(config) = live_config("mssql", "MSSQL_HOST") else {
        eprintln!("Skipping test: MSSQL_HOST not set");
        return;
    };

    let driver = MssqlDriver::new(config.mssql);
    let err = scoped_query(&driver, "SELECT * FROM no_such_table_xyz")
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Query(_)));
}
