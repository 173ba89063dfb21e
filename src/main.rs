//! health-agent - ask questions about a health database in plain language.

use std::sync::Arc;

use health_agent::agent::{ChatSession, HealthTools, ToolLoopRuntime};
use health_agent::catalog::SchemaCatalog;
use health_agent::cli::Cli;
use health_agent::config::Config;
use health_agent::db::PostgresConnector;
use health_agent::error::{AgentError, Result};
use health_agent::llm::{create_client, LlmProvider};
use health_agent::logging;
use health_agent::query::QueryExecutor;
use health_agent::repl::{Mode, Repl};
use health_agent::safety::ReadOnlyGuard;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    if cli.is_one_shot() {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    if let Err(e) = run(cli).await {
        error!(category = e.category(), "{}", e);
        eprintln!("{}", e.report());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let connection = cli.resolve_connection(&config.database)?;
    info!("Connection: {}", connection.display_string());

    let catalog = Arc::new(match &config.agent.catalog_path {
        Some(path) => SchemaCatalog::from_file(path)?,
        None => SchemaCatalog::health(),
    });

    let guard = ReadOnlyGuard::new(cli.strict || config.guard.strict);
    info!(strict = guard.is_strict(), "Query guard ready");
    let connector = PostgresConnector::new(&connection)?;
    let executor = Arc::new(QueryExecutor::new(guard, Arc::new(connector)));

    let provider_name = cli.llm.as_deref().unwrap_or(&config.llm.provider);
    let provider: LlmProvider = provider_name.parse().map_err(AgentError::config)?;
    let mut llm_settings = config.llm.clone();
    if let Some(model) = &cli.model {
        llm_settings.model = model.clone();
    }
    let client = create_client(provider, &llm_settings, None)?;
    info!(provider = %provider, model = %llm_settings.model, "LLM client ready");

    let runtime = ToolLoopRuntime::new(client)
        .with_max_iterations(config.agent.max_iterations)
        .with_max_exchanges(config.agent.max_exchanges);
    let tools = HealthTools::new(Arc::clone(&catalog), executor)
        .with_max_rows(config.agent.max_rows_for_model);
    let mut session = ChatSession::new(Box::new(runtime), Box::new(tools));

    if let Some(question) = &cli.ask {
        let answer = session.chat(question).await?;
        println!("{}", answer);
        return Ok(());
    }

    let mode = if cli.interactive {
        Mode::Interactive
    } else {
        Mode::Simple
    };
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    Repl::new(mode, catalog)
        .run(&mut session, stdin, &mut stdout)
        .await
}
