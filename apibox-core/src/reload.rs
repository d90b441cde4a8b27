//! Hot reload of the gateway configuration
//!
//! Watches configuration files, recompiles them when they settle, and
//! publishes the result into a [`ConfigStore`]. A file that fails to load or
//! compile never replaces the live snapshot.

use crate::config::load_main_config;
use crate::error::{ApiBoxError, Result};
use crate::store::ConfigStore;
use crate::watcher::{ChangeKind, ConfigWatcher, EventDebouncer};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Emitted after every reload attempt
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    /// File that triggered the reload
    pub path: PathBuf,
    /// Outcome
    pub result: ReloadResult,
    /// When the attempt finished
    pub timestamp: Instant,
}

/// Outcome of a reload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadResult {
    /// New snapshot published with this generation
    Success(u64),
    /// Load failed; the previous snapshot stays live
    Failed(String),
    /// Nothing to do (e.g. the file was removed)
    Skipped(String),
}

impl ReloadResult {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadResult::Success(_) => "success",
            ReloadResult::Failed(_) => "failed",
            ReloadResult::Skipped(_) => "skipped",
        }
    }
}

/// Reload coordinator settings
#[derive(Debug, Clone)]
pub struct ReloadConfig {
    /// Quiet period before a changed file is reloaded
    pub debounce_duration: Duration,
    /// Delay between polls of the watcher
    pub poll_interval: Duration,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        ReloadConfig {
            debounce_duration: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Drives file watching and snapshot publication
pub struct ReloadCoordinator {
    store: ConfigStore,
    watcher: ConfigWatcher,
    debouncer: EventDebouncer,
    config: ReloadConfig,
    event_tx: Option<mpsc::UnboundedSender<ReloadEvent>>,
}

impl ReloadCoordinator {
    /// Create a coordinator publishing into `store`
    pub fn new(store: ConfigStore) -> Result<Self> {
        Self::with_config(store, ReloadConfig::default())
    }

    /// Create a coordinator with custom settings
    pub fn with_config(store: ConfigStore, config: ReloadConfig) -> Result<Self> {
        Ok(ReloadCoordinator {
            store,
            watcher: ConfigWatcher::new()?,
            debouncer: EventDebouncer::new(config.debounce_duration),
            config,
            event_tx: None,
        })
    }

    /// Watch a configuration file
    pub fn watch_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ApiBoxError::ConfigError(format!(
                "File does not exist: {:?}",
                path
            )));
        }
        self.watcher.watch(path)
    }

    /// Subscribe to reload events
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ReloadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_tx = Some(tx);
        rx
    }

    /// Files being watched
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.watcher.watched_files()
    }

    /// Run until the task is dropped
    pub async fn run(mut self) -> Result<()> {
        info!(files = ?self.watched_files(), "Reload coordinator started");

        loop {
            // Drain without blocking the runtime thread
            while let Some(event) = self.watcher.try_recv() {
                debug!("File change event: {:?}", event);
                self.debouncer.add_event(event);
            }

            for event in self.debouncer.get_settled_events() {
                let result = if event.kind == ChangeKind::Removed {
                    warn!("Configuration file removed: {:?}", event.path);
                    ReloadResult::Skipped("file removed".to_string())
                } else {
                    reload_into(&self.store, &event.path).await
                };
                self.notify(event.path, result);
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Load `path` and publish it if it compiles
    pub async fn manual_reload(&self, path: &Path) -> ReloadResult {
        reload_into(&self.store, path).await
    }

    fn notify(&self, path: PathBuf, result: ReloadResult) {
        if let Some(tx) = &self.event_tx {
            let event = ReloadEvent {
                path,
                result,
                timestamp: Instant::now(),
            };
            if tx.send(event).is_err() {
                warn!("Failed to send reload event (no subscribers)");
            }
        }
    }
}

async fn reload_into(store: &ConfigStore, path: &Path) -> ReloadResult {
    let owned = path.to_path_buf();
    let loaded = tokio::task::spawn_blocking(move || load_main_config(&owned)).await;

    match loaded {
        Ok(Ok(config)) => {
            let generation = store.publish(config);
            info!(generation, "Reloaded configuration from {:?}", path);
            ReloadResult::Success(generation)
        }
        Ok(Err(e)) => {
            error!("Failed to reload {:?}: {}. Keeping current configuration.", path, e);
            ReloadResult::Failed(e.to_string())
        }
        Err(e) => {
            error!("Reload task for {:?} failed: {}", path, e);
            ReloadResult::Failed(format!("reload task failed: {}", e))
        }
    }
}
