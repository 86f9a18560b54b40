use anyhow::Result;
use clap::Parser;
use codedeck::config::DaemonConfig;
use codedeck::{ipc, AppContext};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "codedeckd",
    about = "CodeDeck Host — local backend daemon for the CodeDeck browser editor",
    version
)]
struct Args {
    /// JSON-RPC WebSocket server port
    #[arg(long, env = "CODEDECK_PORT")]
    port: Option<u16>,

    /// Data directory for config.toml
    #[arg(long, env = "CODEDECK_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CODEDECK_LOG")]
    log: Option<String>,

    /// Bind address for the WebSocket server (default: 127.0.0.1)
    #[arg(long, env = "CODEDECK_BIND")]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = DaemonConfig::new(args.port, args.data_dir, args.log, args.bind_address);

    init_tracing(&config.log, &config.log_format);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        "codedeckd starting"
    );

    let ctx = Arc::new(AppContext::new(config));
    ipc::run(ctx).await
}

fn init_tracing(level: &str, format: &str) {
    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(level.to_string())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(level.to_string())
            .compact()
            .init();
    }
}
