//! Query executor integration tests.
//!
//! Runs guarded SQL against a real PostgreSQL server.

use std::sync::Arc;

use health_agent::config::ConnectionConfig;
use health_agent::db::{PostgresConnector, Value};
use health_agent::query::QueryExecutor;
use health_agent::safety::ReadOnlyGuard;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create an executor against the test database.
fn get_test_executor(strict: bool) -> Option<QueryExecutor> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    let connector = PostgresConnector::new(&config).ok()?;
    Some(QueryExecutor::new(
        ReadOnlyGuard::new(strict),
        Arc::new(connector),
    ))
}

#[tokio::test]
async fn test_select_one() {
    let Some(executor) = get_test_executor(false) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor.execute("SELECT 1 AS x").await;

    assert!(result.success, "unexpected error: {:?}", result.error);
    assert_eq!(result.row_count, 1);
    assert_eq!(
        serde_json::to_value(&result.data).unwrap(),
        serde_json::json!([{"x": 1}])
    );
}

#[tokio::test]
async fn test_column_order_is_preserved() {
    let Some(executor) = get_test_executor(false) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor
        .execute("SELECT 'b' AS second_letter, 'a' AS first_letter, NULL::text AS nothing")
        .await;

    assert!(result.success);
    let names: Vec<&str> = result.data[0].column_names().collect();
    assert_eq!(names, vec!["second_letter", "first_letter", "nothing"]);
    assert_eq!(result.data[0].get("nothing"), Some(&Value::Null));
}

#[tokio::test]
async fn test_cte_with_glucose_extraction() {
    let Some(executor) = get_test_executor(false) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let sql = "WITH readings AS (SELECT 'Glucose Level: 126' AS bs_rslt_cn) \
               SELECT CAST(SUBSTRING(bs_rslt_cn FROM 'Glucose Level: ([0-9]+)') AS INTEGER) AS glucose_value \
               FROM readings";
    let result = executor.execute(sql).await;

    assert!(result.success, "unexpected error: {:?}", result.error);
    assert_eq!(result.data[0].get("glucose_value"), Some(&Value::Int(126)));
}

#[tokio::test]
async fn test_non_scalar_types_are_never_reported_as_null() {
    let Some(executor) = get_test_executor(false) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let sql = "SELECT '11111111-2222-3333-4444-555555555555'::uuid AS id, \
               interval '2 days' AS span, \
               '{\"a\":1}'::jsonb AS doc, \
               'NaN'::numeric AS n, \
               1e40::numeric AS big, \
               ARRAY[1,2] AS arr, \
               '10:00+02'::timetz AS tz, \
               NULL::uuid AS missing";
    let result = executor.execute(sql).await;

    assert!(result.success, "unexpected error: {:?}", result.error);
    assert_eq!(
        serde_json::to_value(&result.data).unwrap(),
        serde_json::json!([{
            "id": "11111111-2222-3333-4444-555555555555",
            "span": "2 days",
            "doc": {"a": 1},
            "n": "NaN",
            "big": format!("1{}", "0".repeat(40)),
            "arr": [1, 2],
            "tz": "10:00:00+02:00",
            "missing": null
        }])
    );
}

#[tokio::test]
async fn test_unreadable_type_fails_with_cast_hint() {
    let Some(executor) = get_test_executor(false) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor
        .execute("SELECT '192.168.0.1'::inet AS addr")
        .await;

    assert!(!result.success);
    assert!(result.data.is_empty());
    let error = result.error.unwrap();
    assert!(error.contains("\"addr\""), "{}", error);
    assert!(error.contains("addr::text"), "{}", error);

    let result = executor
        .execute("SELECT '192.168.0.1'::inet::text AS addr")
        .await;
    assert!(result.success);
    assert_eq!(result.data[0].get("addr"), Some(&Value::from("192.168.0.1/32")));
}

#[tokio::test]
async fn test_same_read_twice_returns_same_row_count() {
    let Some(executor) = get_test_executor(false) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let sql = "SELECT n FROM generate_series(1, 5) AS n";
    let first = executor.execute(sql).await;
    let second = executor.execute(sql).await;

    assert_eq!(first.row_count, 5);
    assert_eq!(first.row_count, second.row_count);
}

#[tokio::test]
async fn test_missing_table_is_reported() {
    let Some(executor) = get_test_executor(false) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor
        .execute("SELECT * FROM agent.nonexistent_table_xyz")
        .await;

    assert!(!result.success);
    assert!(result.data.is_empty());
    assert!(result.error.unwrap().contains("does not exist"));
}

#[tokio::test]
async fn test_strict_mode_allows_plain_reads() {
    let Some(executor) = get_test_executor(true) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor.execute("SELECT 1 AS x").await;
    assert!(result.success);

    let result = executor.execute("SELECT 1 AS x; SELECT 2 AS y").await;
    assert!(!result.success);
}

#[tokio::test]
async fn test_unreachable_database() {
    let config = ConnectionConfig {
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        database: Some("health".to_string()),
        user: Some("agent".to_string()),
        ..Default::default()
    };
    let connector = PostgresConnector::new(&config).unwrap();
    let executor = QueryExecutor::new(ReadOnlyGuard::new(false), Arc::new(connector));

    let result = executor.execute("SELECT 1 AS x").await;

    assert!(!result.success);
    assert!(!result.error.unwrap_or_default().is_empty());
    assert_eq!(result.row_count, 0);
}
