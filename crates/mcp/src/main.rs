mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fanout_core::config::{load_dotenv, Config};
use fanout_core::ListStore;
use fanout_engine::Engine;
use fanout_mcp::{McpServer, StdioTransport};
use fanout_tool_runtime::ToolRegistry;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout carries the protocol, so logs must go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    load_dotenv();
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(dir) = args.results_dir {
        config.engine.results_dir = dir;
    }
    if let Some(width) = args.concurrency {
        config.engine.concurrency = width;
    }
    config.log_summary();

    let working_dir = match args.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    info!(working_dir = %working_dir.display(), "commands run here");

    let store = Arc::new(ListStore::new());
    let engine = Arc::new(Engine::new(config.engine, config.agents, working_dir));
    let registry = ToolRegistry::builtin(store, engine).context("failed to register tools")?;

    let server = McpServer::new(registry).with_name(config.server.name);
    let mut transport = StdioTransport::new();
    server.run(&mut transport).await?;

    info!("fanout-mcp stopped");
    Ok(())
}
