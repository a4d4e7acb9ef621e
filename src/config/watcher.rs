//! Config hot reload
//!
//! [`ConfigWatcher`] yields each parsed revision of the config file;
//! [`apply_reload`] merges the CLI flags back in and pushes the keyer
//! section to the running interpreter.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;
use crate::cli::Args;
use crate::interpreter::CommandInterpreter;
use crate::transport::Transport;

/// Delay before re-reading, so editors can finish writing.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Revisions queued between event loop turns.
const RELOAD_QUEUE: usize = 10;

/// Watches the config file and yields each successfully parsed revision
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

/// Re-read `path` after the debounce delay and queue the result.
///
/// A revision that fails to parse is skipped; the daemon keeps running
/// with what it has.
async fn reload_after_debounce(path: String, tx: mpsc::Sender<AppConfig>) {
    tokio::time::sleep(DEBOUNCE).await;

    match AppConfig::load(&path).await {
        Ok(config) => {
            debug!("Config file {} parsed", path);
            if tx.send(config).await.is_err() {
                debug!("Config reload receiver gone");
            }
        }
        Err(e) => warn!("Ignoring unreadable config revision: {:#}", e),
    }
}

impl ConfigWatcher {
    /// Start watching `config_path`.
    pub fn new(config_path: String) -> Result<Self> {
        let (tx, rx) = mpsc::channel(RELOAD_QUEUE);
        let path = config_path.clone();

        // notify calls back on its own thread
        let runtime = tokio::runtime::Handle::current();

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                match res {
                    Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
                        runtime.spawn(reload_after_debounce(path.clone(), tx.clone()));
                    }
                    Ok(_) => {}
                    Err(e) => error!("Config watch error: {}", e),
                }
            })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path))?;

        info!("Watching {} for keyer setting changes", config_path);

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Next parsed revision, or None once the watcher is gone.
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

/// Apply a reloaded config file to a running interpreter.
///
/// CLI flags still take precedence over the file. A revision that fails
/// validation leaves the keyer untouched and returns a plain anyhow error;
/// keyer write failures keep their [`crate::Error`] so callers can treat them
/// as a lost link.
pub async fn apply_reload<T: Transport>(
    interpreter: &mut CommandInterpreter<T>,
    args: &Args,
    running: &AppConfig,
    mut revision: AppConfig,
) -> Result<()> {
    revision.apply_cli(args);
    revision.validate()?;

    if revision.device != running.device
        || revision.port != running.port
        || revision.accept_remote_hosts != running.accept_remote_hosts
    {
        warn!("Device, port and remote access changes take effect after a restart");
    }

    interpreter
        .apply_device_config(revision.device_config())
        .await?;
    Ok(())
}
