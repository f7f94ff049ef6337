use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use webrig_cli::tools::ToolResponse;
use webrig_cli::{dispatch, AppContext, RigConfig};
use webrig_core_types::RigError;

#[derive(Parser, Debug)]
#[command(name = "webrig", about = "Multi-participant browser test orchestration")]
struct Cli {
    /// Root directory for screenshots and other per-session artifacts.
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,
    /// Launch sessions with a visible browser window by default.
    #[arg(long)]
    headed: bool,
    /// Budget for navigation and wait operations, in milliseconds.
    #[arg(long)]
    nav_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireRequest {
    tool: String,
    #[serde(default)]
    args: Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = RigConfig::from_env();
    if let Some(dir) = cli.artifacts_dir {
        config.artifacts_root = dir;
    }
    if cli.headed {
        config.headless = false;
    }
    if let Some(timeout) = cli.nav_timeout_ms {
        config.navigation_timeout_ms = timeout;
    }

    // The stub backend keeps the tool surface runnable without a browser; a
    // real adapter plugs in through AppContext::new with its own factory.
    let ctx = AppContext::with_stub(config);
    serve(ctx).await
}

/// One JSON request per line on stdin, one JSON response per line on stdout.
async fn serve(ctx: AppContext) -> Result<()> {
    let mut lines = BufReader::new(stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("termination signal, sweeping sessions");
                ctx.cleanup.shutdown_all().await;
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    ctx.cleanup.shutdown_all().await;
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<WireRequest>(&line) {
                    Ok(request) => dispatch(&ctx, &request.tool, request.args).await,
                    Err(err) => ToolResponse::failure(&RigError::validation(
                        "request",
                        format!("malformed request line: {err}"),
                    )),
                };
                println!("{}", serde_json::to_string(&response)?);
            }
        }
    }
    Ok(())
}
