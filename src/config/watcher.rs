//! Configuration file watcher for hot reload.
//!
//! # Design Decisions
//! - Watches the parent directory: editors that save by rename replace the
//!   file's inode, which a watch on the file itself would lose
//! - Only configs that validate and differ from the last delivered one are sent
//! - Runs on notify's own thread; the server consumes updates from an mpsc channel

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ServerConfig;

/// Sends validated configuration changes for one file.
pub struct ConfigWatcher {
    path: PathBuf,
    current: ServerConfig,
    update_tx: mpsc::UnboundedSender<ServerConfig>,
}

impl ConfigWatcher {
    /// Watch `path`, whose contents are currently `current`.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path, current: ServerConfig) -> (Self, mpsc::UnboundedReceiver<ServerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive for updates to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &file) => {
                    if let Some(config) = reload(&file, &mut current) {
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` created or modified `file`.
fn touches(event: &Event, file: &Path) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    let Some(name) = file.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

/// Load `file`; return it if it validates and differs from `current`.
fn reload(file: &Path, current: &mut ServerConfig) -> Option<ServerConfig> {
    match load_config(file) {
        Ok(config) if config == *current => {
            tracing::debug!("Config file touched without changes");
            None
        }
        Ok(config) => {
            tracing::info!(path = %file.display(), "Config reloaded");
            *current = config.clone();
            Some(config)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}
