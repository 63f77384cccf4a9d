use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

/// MCP server that fans a shell command or coding agent out over a list of items.
///
/// Speaks JSON-RPC on stdin/stdout; logs go to stderr. Settings come from the
/// environment (and an optional `.env`); flags override them.
#[derive(Parser, Debug)]
#[command(name = "fanout-mcp", version, about = "Batched parallel execution over MCP")]
pub struct CliArgs {
    /// Root directory for per-run output (overrides FANOUT_RESULTS_DIR)
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Invocations per group (overrides FANOUT_CONCURRENCY)
    #[arg(long, value_parser = parse_width)]
    pub concurrency: Option<NonZeroUsize>,

    /// Directory commands and agents run in (default: current directory)
    #[arg(long)]
    pub working_dir: Option<PathBuf>,
}

fn parse_width(value: &str) -> Result<NonZeroUsize, String> {
    fanout_core::config::parse_concurrency("--concurrency", value).map_err(|e| e.to_string())
}
