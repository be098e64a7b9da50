//! mockyaml — HTTP mock server driven by declarative YAML scenarios.

use clap::Parser;
use mockyaml::cli::Cli;
use mockyaml::logging::{self, LogFormat};
use mockyaml::server;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, LogFormat::Human);

    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_cancel.cancel();
        }
    });

    let default_engine = cli.default_engine.as_str().to_string();
    if let Err(e) = server::run(cli.root, cli.port, default_engine, cli.trace_size, cancel).await {
        eprintln!("mockyaml: {e}");
        std::process::exit(1);
    }
}
