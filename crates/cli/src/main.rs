mod error;

use std::path::PathBuf;

use bridge::{Config, DEFAULT_CONFIG_PATH, OllamaClient, ToolRegistry};
use clap::Parser;
use tracing::info;

use error::Result;

#[derive(Parser)]
#[command(name = "ollama-mcp")]
#[command(about = "MCP tool server backed by a local Ollama instance", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Stdout carries protocol frames; logs go to stderr only.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(&cli.config)?;
    let base_url = config.base_url()?;
    let client = OllamaClient::new(base_url)?;

    info!(
        backend = %client,
        model = %config.model,
        max_tokens = config.max_tokens,
        "starting ollama-mcp v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = ToolRegistry::with_default_tools(config, client);
    mcp::Server::new(registry).serve_stdio().await?;

    info!("stopped");
    Ok(())
}
