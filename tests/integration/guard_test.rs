//! Read-only guard behaviour over families of inputs.

use std::sync::Arc;

use health_agent::db::MockConnectionFactory;
use health_agent::query::QueryExecutor;
use health_agent::safety::{classify_text, ReadOnlyGuard, Verdict, DENYLIST};

const LEADING_WORDS: &[&str] = &[
    "explain", "show", "values", "table", "copy", "grant", "vacuum", "set", "begin", "call",
    "drop", "delete", "update", "insert", "alter", "create", "truncate", "(select",
];

#[test]
fn test_anything_not_starting_with_select_or_with_is_rejected() {
    for word in LEADING_WORDS {
        for prefix in ["", "  ", "\n\t"] {
            for variant in [word.to_string(), word.to_uppercase()] {
                let sql = format!("{}{} 1", prefix, variant);
                assert!(
                    !classify_text(&sql).is_allowed(),
                    "expected rejection for {:?}",
                    sql
                );
            }
        }
    }
}

#[test]
fn test_with_without_select_is_rejected() {
    for sql in [
        "WITH",
        "with x as (values (1)) table x",
        "  With t AS (VALUES (1)) TABLE t",
    ] {
        assert!(!classify_text(sql).is_allowed(), "{:?}", sql);
    }
}

#[test]
fn test_denylisted_tokens_are_rejected_in_any_case() {
    for keyword in DENYLIST {
        for variant in [
            keyword.to_string(),
            keyword.to_uppercase(),
            capitalize(keyword),
        ] {
            let middle = format!("SELECT 1 FROM t WHERE {} = 1", variant);
            let end = format!("SELECT 1 {}", variant);

            for sql in [middle, end] {
                match classify_text(&sql) {
                    Verdict::Reject(reason) => {
                        assert_eq!(reason.keyword(), Some(keyword), "{:?}", sql)
                    }
                    Verdict::Allow => panic!("expected rejection for {:?}", sql),
                }
            }
        }
    }
}

#[test]
fn test_keywords_inside_identifiers_are_allowed() {
    for sql in [
        "SELECT created_at FROM agent.tb_user_info",
        "SELECT * FROM agent.tb_user_info WHERE flnm LIKE '%User_1%' LIMIT 10",
        "SELECT updated_by, deleted_flag FROM t",
        "WITH recent AS (SELECT * FROM agent.tb_sensor_log) SELECT COUNT(*) FROM recent",
    ] {
        assert_eq!(classify_text(sql), Verdict::Allow, "{:?}", sql);
    }
}

#[test]
fn test_drop_table_names_drop() {
    let verdict = ReadOnlyGuard::new(false).classify("DROP TABLE agent.tb_user_info");
    assert_eq!(verdict.reason().and_then(|r| r.keyword()), Some("drop"));
}

#[tokio::test]
async fn test_rejections_never_open_connections() {
    let factory = MockConnectionFactory::new();
    let executor = QueryExecutor::new(ReadOnlyGuard::new(true), Arc::new(factory.clone()));

    for keyword in DENYLIST {
        executor
            .execute(&format!("{} TABLE agent.tb_user_info", keyword))
            .await;
        executor
            .execute(&format!("SELECT 1; {} TABLE agent.tb_user_info", keyword))
            .await;
    }
    executor.execute("WITH x AS (VALUES (1)) TABLE x").await;
    executor.execute("SELECT * INTO backup FROM agent.tb_user_info").await;

    assert_eq!(factory.connect_count(), 0);
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
