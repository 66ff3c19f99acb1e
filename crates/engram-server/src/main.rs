//! Engram LTM server
//!
//! Persists, indexes, and retrieves the structured experience of a fleet of
//! cooperating research agents: episodic, semantic, temporal, procedural,
//! and evaluator memory behind one role-gated HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use engram_core::{LtmConfig, LtmService};
use engram_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Args {
    host: String,
    port: u16,
    json_logs: bool,
}

/// Parse command-line arguments. Exits the process for `--help`/`--version`.
fn parse_args() -> Args {
    let mut parsed = Args {
        host: "127.0.0.1".to_string(),
        port: 8321,
        json_logs: false,
    };

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("Engram LTM server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Long-term memory service for cooperating research agents.");
                println!();
                println!("USAGE:");
                println!("    engram-server [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help         Print help information");
                println!("    -V, --version      Print version information");
                println!("    --host <ADDR>      Bind address (default 127.0.0.1)");
                println!("    --port <PORT>      Bind port (default 8321)");
                println!("    --json-logs        Emit logs as JSON");
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG                      Log level filter");
                println!("    LTM_TTL_DAYS                  Forgetting TTL (default 30)");
                println!("    LTM_FORGET_ALPHA/BETA/GAMMA   Utility weights");
                println!("    LTM_FORGET_THRESHOLD          Removal threshold (default 0)");
                println!("    EMBED_CACHE_SIZE              Embedding LRU entries (default 1024)");
                println!("    LTM_REQUEST_TIMEOUT_SECONDS   Request deadline (default 30)");
                println!("    WEAVIATE_URL, NEO4J_URI       External store endpoints");
                println!("    LTM_DATA_DIR                  Sqlite key-value store directory");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("engram-server {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--host" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --host requires an address argument");
                    std::process::exit(1);
                }
                parsed.host = args[i].clone();
            }
            "--port" => {
                i += 1;
                let value = args.get(i).and_then(|v| v.parse().ok());
                match value {
                    Some(port) => parsed.port = port,
                    None => {
                        eprintln!("error: --port requires a port number");
                        std::process::exit(1);
                    }
                }
            }
            "--json-logs" => parsed.json_logs = true,
            arg => {
                eprintln!("error: unknown argument '{arg}'");
                eprintln!("Try 'engram-server --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    init_tracing(args.json_logs);

    let config = LtmConfig::from_env();
    let forget_interval = config.forget_interval;
    let service = Arc::new(LtmService::from_config(config).context("assembling LTM service")?);

    engram_server::scheduler::spawn_forgetting_ticker(service.forgetting.clone(), forget_interval);

    let state = AppState::new(service);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding listener")?;
    info!("engram LTM server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("engram LTM server shutting down");
    Ok(())
}

/// Graceful shutdown on ctrl-c or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl+c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
