//! End-to-end agent tests with scripted model turns.
//!
//! The model is always mocked; the database is mocked unless DATABASE_URL is set.

use std::sync::Arc;

use health_agent::agent::{ChatSession, HealthTools, ToolHost, ToolLoopRuntime};
use health_agent::catalog::SchemaCatalog;
use health_agent::config::ConnectionConfig;
use health_agent::db::{ConnectionFactory, MockConnectionFactory, PostgresConnector, Row};
use health_agent::llm::{
    LlmResponse, MockLlmClient, Role, ToolCall, EXECUTE_SQL_QUERY, GET_DATABASE_SCHEMA,
};
use health_agent::query::QueryExecutor;
use health_agent::safety::ReadOnlyGuard;

fn tools_over(factory: Arc<dyn ConnectionFactory>) -> HealthTools {
    let executor = QueryExecutor::new(ReadOnlyGuard::new(false), factory);
    HealthTools::new(Arc::new(SchemaCatalog::health()), Arc::new(executor))
}

fn sql_call(id: &str, sql: &str) -> LlmResponse {
    LlmResponse::with_tool_calls(
        "",
        vec![ToolCall::new(
            id,
            EXECUTE_SQL_QUERY,
            serde_json::json!({ "sql_query": sql }).to_string(),
        )],
    )
}

#[tokio::test]
async fn test_agent_recovers_from_rejected_query() {
    let factory = MockConnectionFactory::new().with_rows(
        "tb_user_info",
        vec![Row::new()
            .with("user_uuid", "u-1")
            .with("flnm", "User_1")],
    );
    let client = MockLlmClient::new().with_script(vec![
        LlmResponse::with_tool_calls(
            "Let me look at the schema.",
            vec![ToolCall::new("c1", GET_DATABASE_SCHEMA, "{}")],
        ),
        sql_call("c2", "DELETE FROM agent.tb_user_info WHERE flnm = 'User_1'"),
        sql_call(
            "c3",
            "SELECT user_uuid, flnm FROM agent.tb_user_info WHERE flnm LIKE '%User_1%' LIMIT 10",
        ),
        LlmResponse::text("User_1 has the UUID u-1."),
    ]);
    let probe = client.clone();

    let mut session = ChatSession::new(
        Box::new(ToolLoopRuntime::new(Box::new(client))),
        Box::new(tools_over(Arc::new(factory.clone()))),
    );

    let answer = session.chat("Find the user named User_1").await.unwrap();

    assert_eq!(answer, "User_1 has the UUID u-1.");
    assert_eq!(factory.connect_count(), 1);

    let requests = probe.requests();
    assert_eq!(requests.len(), 4);

    let schema_result = &requests[1].last().unwrap().content;
    assert!(schema_result.contains("agent.tb_glucose_msrmt"));

    let rejection: serde_json::Value =
        serde_json::from_str(&requests[2].last().unwrap().content).unwrap();
    assert_eq!(rejection["success"], false);

    let rows: serde_json::Value =
        serde_json::from_str(&requests[3].last().unwrap().content).unwrap();
    assert_eq!(rows["data"][0]["flnm"], "User_1");
}

#[tokio::test]
async fn test_history_carries_across_questions_until_reset() {
    let client = MockLlmClient::new().with_script(vec![
        LlmResponse::text("First answer."),
        LlmResponse::text("Second answer."),
        LlmResponse::text("Fresh answer."),
    ]);
    let probe = client.clone();
    let mut session = ChatSession::new(
        Box::new(ToolLoopRuntime::new(Box::new(client))),
        Box::new(tools_over(Arc::new(MockConnectionFactory::new()))),
    );

    session.chat("first").await.unwrap();
    session.chat("second").await.unwrap();
    session.reset();
    session.chat("third").await.unwrap();

    let requests = probe.requests();
    let user_turns = |i: usize| {
        requests[i]
            .iter()
            .filter(|m| m.role == Role::User)
            .count()
    };
    assert_eq!(user_turns(0), 1);
    assert_eq!(user_turns(1), 2);
    assert_eq!(user_turns(2), 1);
}

#[tokio::test]
async fn test_default_mock_workflow_against_database() {
    let Some(url) = std::env::var("DATABASE_URL").ok() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let config = ConnectionConfig::from_connection_string(&url).unwrap();
    let connector = PostgresConnector::new(&config).unwrap();

    let client = MockLlmClient::new()
        .with_sql("numbers", "SELECT n FROM generate_series(1, 3) AS n");
    let tools = tools_over(Arc::new(connector));
    let mut session = ChatSession::new(
        Box::new(ToolLoopRuntime::new(Box::new(client))),
        Box::new(tools),
    );

    let answer = session.chat("List three numbers").await.unwrap();
    assert_eq!(answer, "The query returned 3 rows.");
}

#[tokio::test]
async fn test_tool_host_is_usable_as_trait_object() {
    let host: Box<dyn ToolHost> = Box::new(tools_over(Arc::new(MockConnectionFactory::new())));
    let output = host.call(GET_DATABASE_SCHEMA, "{}").await;
    assert!(output.contains("Glucose Level: 126"));
}
