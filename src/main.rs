use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use murmuration::api::{self, AppState};
use murmuration::pipeline::PipelineCell;
use murmuration::runner::engine::ChatEngine;
use murmuration::runner::session::InMemorySessionStore;
use murmuration::runner::{RunLoop, RunStatus, TurnAction};
use murmuration::tools::ToolRegistry;
use murmuration::Config;

#[derive(Parser)]
#[command(name = "murmuration")]
#[command(about = "Public-opinion analysis agent pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        #[arg(long, help = "Port to listen on (default from API_PORT)")]
        port: Option<u16>,
    },
    /// Run one analysis request from the terminal
    Run {
        #[arg(help = "Natural-language analysis request")]
        request: String,
        #[arg(long, help = "Session id to resume")]
        session: Option<String>,
        #[arg(long, help = "Turn budget override")]
        max_turns: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.api_port);
            let state = build_state(config)?;
            api::serve(state, port).await?;
        }
        Commands::Run {
            request,
            session,
            max_turns,
        } => run_request(config, &request, session, max_turns).await?,
    }

    Ok(())
}

fn build_state(config: Config) -> Result<AppState> {
    let api_key = match &config.openai_api_key {
        Some(key) => key.clone(),
        None => {
            log::warn!("OPENAI_API_KEY not set; agent runs will fail until it is");
            String::new()
        }
    };

    let registry = Arc::new(ToolRegistry::from_config(&config)?);
    let runner = Arc::new(RunLoop::new(
        registry,
        Arc::new(ChatEngine::new(api_key)),
        Arc::new(InMemorySessionStore::new()),
    ));

    Ok(AppState {
        pipeline: Arc::new(PipelineCell::new(config.clone())),
        runner,
        config: Arc::new(config),
    })
}

async fn run_request(
    config: Config,
    request: &str,
    session: Option<String>,
    max_turns: Option<usize>,
) -> Result<()> {
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let session_id = session.unwrap_or_else(|| format!("session_{}", uuid::Uuid::new_v4()));
    let max_turns = max_turns.unwrap_or(config.max_turns);

    let registry = Arc::new(ToolRegistry::from_config(&config)?);
    let runner = RunLoop::new(
        registry,
        Arc::new(ChatEngine::new(api_key)),
        Arc::new(InMemorySessionStore::new()),
    );

    let cell = PipelineCell::new(config);
    let pipeline = cell.get_or_build();

    println!("Running request in session {}", session_id);

    let outcome = runner.run(&pipeline, &session_id, request, max_turns).await;

    for record in &outcome.trace {
        match &record.action {
            TurnAction::ToolCalls(tools) => {
                println!("[{}] tools: {}", record.agent, tools.join(", "))
            }
            TurnAction::Handoff(target) => println!("[{}] handoff -> {}", record.agent, target),
            TurnAction::Final => println!("[{}] final answer", record.agent),
        }
    }

    match outcome.status {
        RunStatus::Completed => {
            let output = outcome.output.unwrap_or_default();
            println!("\nCompleted:\n{}", serde_json::to_string_pretty(&output)?);
        }
        RunStatus::Failed | RunStatus::TurnBudgetExceeded => {
            let reason = outcome
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown failure".to_string());
            anyhow::bail!("run failed: {}", reason);
        }
    }

    Ok(())
}
