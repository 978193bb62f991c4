//! Docweave MCP server binary.
//!
//! Exposes the document engine to MCP clients over stdio.
//!
//! Usage:
//!   # In-memory mode (ephemeral)
//!   cargo run -p docweave-mcp
//!
//!   # Google Docs, token read from $DOCWEAVE_ACCESS_TOKEN
//!   cargo run -p docweave-mcp -- --backend google
//!
//! Test with MCP inspector:
//!   npx @modelcontextprotocol/inspector cargo run -p docweave-mcp

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::{EnvFilter, fmt};

use docweave_kernel::{DocEngine, DocsApi, GoogleDocsApi, MemoryDocs};
use docweave_mcp::DocweaveMcp;
use docweave_mcp::config::{BackendKind, Config};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// MCP server exposing the docweave document engine.
#[derive(Parser, Debug)]
#[command(name = "docweave-mcp")]
#[command(about = "MCP server for index-consistent document editing")]
struct Args {
    /// Config file (default: <config dir>/docweave/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document backend: memory or google
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// API root for the google backend
    #[arg(long)]
    api_base: Option<String>,

    /// Environment variable holding the access token
    #[arg(long)]
    token_env: Option<String>,
}

impl Args {
    /// CLI flags win over the config file.
    fn merge(self, mut config: Config) -> Config {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(api_base) = self.api_base {
            config.api_base = api_base;
        }
        if let Some(token_env) = self.token_env {
            config.token_env = token_env;
        }
        config
    }
}

fn backend(config: &Config) -> Result<Arc<dyn DocsApi>> {
    match config.backend {
        BackendKind::Memory => {
            tracing::info!("Starting with in-memory documents");
            Ok(Arc::new(MemoryDocs::new()))
        }
        BackendKind::Google => {
            let token = std::env::var(&config.token_env)
                .with_context(|| format!("access token not set: export {}", config.token_env))?;
            tracing::info!(api_base = %config.api_base, "Using Google Docs backend");
            Ok(Arc::new(GoogleDocsApi::with_base(&config.api_base, token, HTTP_TIMEOUT)?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let config = args.merge(config);

    // Logs go to stderr; stdout carries the protocol
    let filter = match &config.log_filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log_filter '{directives}'"))?,
        None => EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let engine = DocEngine::new(backend(&config)?, config.engine_config());
    let mcp = DocweaveMcp::new(Arc::new(engine));

    let service = mcp
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("Failed to start MCP server: {}", e))?;

    service.waiting().await?;
    Ok(())
}
