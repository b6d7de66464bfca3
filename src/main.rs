//! Stream adapter echo server.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                  ECHO SERVER                     │
//!                    │                                                  │
//!   TCP connection   │  ┌─────────┐   ┌─────────────────┐   ┌────────┐  │
//!   ─────────────────┼─▶│   net   │──▶│ AdaptedPipeline │──▶│  echo  │  │
//!                    │  │listener │   │ ReadPump  Input │   │  app   │  │
//!   ◀────────────────┼──│         │◀──│ WritePump Output│◀──│        │  │
//!                    │  └─────────┘   └─────────────────┘   └────────┘  │
//!                    │                                                  │
//!                    │  config (TOML, hot reload) · lifecycle (signals, │
//!                    │  drain) · observability (tracing, prometheus)    │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use stream_adapter::config::loader::load_config;
use stream_adapter::config::watcher::ConfigWatcher;
use stream_adapter::config::ServerConfig;
use stream_adapter::lifecycle::{signals, Shutdown};
use stream_adapter::net::listener::Listener;
use stream_adapter::observability::{logging, metrics};
use stream_adapter::server::EchoServer;

#[derive(Parser)]
#[command(name = "stream-adapter")]
#[command(about = "Echo server built on a backpressured stream adapter", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload pipeline settings when the config file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    let mut config = file_config.clone();
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("stream-adapter v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        input_bound = config.pipeline.input_pause_threshold,
        output_bound = config.pipeline.output_pause_threshold,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for as long as the server runs.
    let mut _watcher = None;
    let mut updates = None;
    if cli.watch {
        if let Some(path) = &cli.config {
            let (watcher, rx) = ConfigWatcher::new(path, file_config);
            _watcher = Some(watcher.run()?);
            updates = Some(rx);
        }
    }

    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server = EchoServer::new(config);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe(), updates));

    tokio::select! {
        _ = signals::wait_for_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => result??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
