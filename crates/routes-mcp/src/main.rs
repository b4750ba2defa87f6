//! Rails Routes MCP Server
//!
//! Exposes Rails route introspection to Claude and other AI assistants via
//! the Model Context Protocol (MCP).
//!
//! Usage:
//!   rails-routes-mcp [--app-path DIR] [--rails-command CMD]
//!
//! The server communicates over stdio using JSON-RPC 2.0.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use routes_core::{Config, Paths};
use routes_mcp::{McpServer, ToolHandler};

#[derive(Parser)]
#[command(name = "rails-routes-mcp")]
#[command(about = "MCP server for Rails route inspection")]
#[command(version)]
#[command(after_help = r#"CONFIGURATION:
    Settings are read from ~/.config/rails-routes/config.json, then from the
    environment, then from these flags.

    RAILS_APP_PATH        Rails application root (default: current directory)
    RAILS_COMMAND         Command used to invoke rails (default: <root>/bin/rails)
    RAILS_ROUTES_TIMEOUT  Seconds before a route command is abandoned (0 = never)
    RUST_LOG              Log filter; logs go to stderr
"#)]
struct Cli {
    /// Rails application root
    #[arg(long)]
    app_path: Option<PathBuf>,

    /// Command used to invoke rails, e.g. "bundle exec rails"
    #[arg(long)]
    rails_command: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds before a route command is abandoned (0 disables)
    #[arg(long)]
    timeout: Option<u64>,

    /// Maximum number of route commands running at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Skip the `rails --version` check at startup
    #[arg(long)]
    skip_verify: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_default(&Paths::new())?,
        };

        config.apply_process_env()?;

        if let Some(app_path) = &self.app_path {
            config.app_path = app_path.clone();
        }
        if let Some(cmd) = &self.rails_command {
            config.rails_command = Some(cmd.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if let Some(n) = self.max_concurrent {
            config.max_concurrent = n;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config().context("Failed to load configuration")?;

    tracing::info!("Starting Rails Routes MCP server");
    tracing::info!("Rails app path: {}", config.app_path.display());
    match &config.rails_command {
        Some(cmd) => tracing::info!("Rails command: {}", cmd),
        None => tracing::info!("Rails command: {}", config.binstub().display()),
    }

    let handler = ToolHandler::new(config);
    if !cli.skip_verify {
        handler.verify().await;
    }

    let mut server = McpServer::new(handler);
    server.run().await?;

    Ok(())
}
