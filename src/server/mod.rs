//! Echo server built on the transport adapter.
//!
//! # Responsibilities
//! - Accept connections within the listener's limits
//! - Wrap every connection in an `AdaptedPipeline` and hand the application view to the echo app
//! - Apply reloaded pipeline settings to connections accepted afterwards
//! - Drain open connections on shutdown, bounded by the drain timeout
//!
//! # Connection Flow
//! ```text
//! accept → track → AdaptedPipeline::run(stream) ─┐
//!                  run_echo(application view) ───┤ select: run done | write side closed + linger
//!                                                │         | shutdown (complete Input, keep waiting)
//!                                                └─▶ dispose → stream.shutdown() → await app
//! ```

pub mod echo;

pub use echo::run_echo;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::lifecycle::ShutdownListener;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::pipeline::{AdaptedPipeline, PipelineOptions};

/// Errors that stop the accept loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),
}

/// Accepts connections and echoes every byte back through a pipeline.
pub struct EchoServer {
    config: ServerConfig,
    options: Arc<ArcSwap<PipelineOptions>>,
    tracker: ConnectionTracker,
}

impl EchoServer {
    pub fn new(config: ServerConfig) -> Self {
        let options = PipelineOptions::from(&config.pipeline);
        Self {
            config,
            options: Arc::new(ArcSwap::from_pointee(options)),
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Settings the next accepted connection will use.
    pub fn pipeline_options(&self) -> PipelineOptions {
        **self.options.load()
    }

    /// Swap in reloaded pipeline settings. Open connections keep theirs.
    pub fn apply_config(&self, config: &ServerConfig) {
        if config.listener != self.config.listener {
            tracing::warn!("Listener settings changed; restart to apply them");
        }
        let options = PipelineOptions::from(&config.pipeline);
        if options == self.pipeline_options() {
            tracing::debug!("Reloaded config leaves pipeline settings unchanged");
            return;
        }
        self.options.store(Arc::new(options));
        tracing::info!(
            min_alloc = options.min_alloc_buffer_size,
            input_bound = options.pipe.input.pause_threshold,
            output_bound = options.pipe.output.pause_threshold,
            flush_on_idle_read = options.flush_on_idle_read,
            "Pipeline settings reloaded"
        );
    }

    /// Run the accept loop until `shutdown` fires, then drain.
    ///
    /// `updates` carries validated configs from the file watcher, if any.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: ShutdownListener,
        mut updates: Option<mpsc::UnboundedReceiver<ServerConfig>>,
    ) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Echo server starting");
        }
        let linger = Duration::from_secs(self.config.listener.linger_secs);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                Some(config) = next_update(&mut updates) => self.apply_config(&config),
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        let guard = self.tracker.track();
                        let span = tracing::info_span!(
                            "connection",
                            connection_id = %guard.id(),
                            peer_addr = %peer_addr,
                        );
                        let conn = Connection {
                            options: self.pipeline_options(),
                            linger,
                            shutdown: shutdown.clone(),
                            _guard: guard,
                            _permit: permit,
                        };
                        tokio::spawn(conn.serve(stream, peer_addr).instrument(span));
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                    }
                    Err(e) => return Err(e.into()),
                },
            }
        }

        self.drain().await;
        Ok(())
    }

    async fn drain(&self) {
        let timeout = Duration::from_secs(self.config.shutdown.drain_timeout_secs);
        tracing::info!(
            active_connections = self.tracker.active_count(),
            timeout_secs = timeout.as_secs(),
            "Draining connections"
        );
        match tokio::time::timeout(timeout, self.tracker.wait_for_shutdown()).await {
            Ok(()) => tracing::info!("All connections closed"),
            Err(_) => tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed, abandoning connections"
            ),
        }
    }
}

/// Next config from the watcher; pends forever once there is none.
async fn next_update(
    updates: &mut Option<mpsc::UnboundedReceiver<ServerConfig>>,
) -> Option<ServerConfig> {
    let Some(rx) = updates.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Some(config) => Some(config),
        None => {
            tracing::debug!("Config watcher stopped");
            *updates = None;
            std::future::pending().await
        }
    }
}

/// One accepted connection and the resources it holds until it ends.
struct Connection {
    options: PipelineOptions,
    linger: Duration,
    shutdown: ShutdownListener,
    _guard: ConnectionGuard,
    _permit: ConnectionPermit,
}

impl Connection {
    async fn serve(mut self, mut stream: TcpStream, peer_addr: SocketAddr) {
        tracing::debug!(%peer_addr, "Serving connection");

        let mut pipeline = AdaptedPipeline::with_tracing(self.options);
        let Some(app) = pipeline.application() else {
            return;
        };
        let app_task = tokio::spawn(run_echo(app).in_current_span());

        let input = pipeline.input().clone();
        let mut transport = pipeline.transport_watch();
        let linger = self.linger;
        {
            let run = pipeline.run(&mut stream);
            tokio::pin!(run);
            // The peer may never close its side; stop reading a while after writes end.
            let lingered = async move {
                transport.writes_closed().await;
                tokio::time::sleep(linger).await;
            };
            tokio::pin!(lingered);

            let mut draining = false;
            loop {
                tokio::select! {
                    _ = &mut run => break,
                    _ = &mut lingered => {
                        tracing::debug!(linger_secs = linger.as_secs(), "Peer idle after write side closed");
                        break;
                    }
                    _ = self.shutdown.recv(), if !draining => {
                        tracing::debug!("Shutdown requested, ending inbound stream");
                        draining = true;
                        input.complete_writer(None);
                    }
                }
            }
        }

        pipeline.dispose();
        if let Err(e) = stream.shutdown().await {
            tracing::trace!(error = %e, "Socket shutdown failed");
        }

        match app_task.await {
            Ok(Ok(echoed)) => tracing::debug!(bytes_echoed = echoed, "Connection finished"),
            Ok(Err(e)) => tracing::debug!(error = %e, "Echo ended early"),
            Err(e) => tracing::warn!(error = %e, "Echo task failed"),
        }
    }
}
