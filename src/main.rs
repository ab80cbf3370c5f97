//! arXiv LaTeX MCP Server - Rust Implementation
//!
//! Serves the Model Context Protocol on stdin/stdout. Logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use arxiv_latex_mcp::arxiv::ArxivProcessor;
use arxiv_latex_mcp::config::Config;
use arxiv_latex_mcp::mcp::server::McpServer;
use arxiv_latex_mcp::mcp::tools;

/// arXiv LaTeX MCP Server
#[derive(Parser)]
#[command(name = "arxiv-latex-mcp")]
#[command(author, version, about = "MCP server providing flattened LaTeX sources of arXiv papers")]
struct Cli {
    /// arXiv mirror to download sources from
    #[arg(long)]
    base_url: Option<String>,

    /// Download timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Strip LaTeX comments from the flattened source
    #[arg(long)]
    strip_comments: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs must stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let mut config = Config::new().context("loading configuration")?;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(secs);
    }
    if cli.strip_comments {
        config = config.with_strip_comments(true);
    }
    config.validate().context("validating configuration")?;

    tracing::info!(base_url = %config.base_url, strip_comments = config.strip_comments, "Starting arXiv LaTeX MCP server");

    let registry = tools::default_registry().context("building tool registry")?;
    let processor = Arc::new(ArxivProcessor::new(&config).context("creating arXiv client")?);

    let server = McpServer::new(registry, processor);
    server.run_stdio().await.context("serving on stdio")?;

    tracing::info!("Server stopped");
    Ok(())
}
