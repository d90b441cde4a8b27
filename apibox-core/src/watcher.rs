//! Configuration file watching
//!
//! Editors often save by writing a temp file and renaming it over the
//! original, which drops a watch placed on the file itself. The watcher
//! therefore observes the parent directory and filters events down to the
//! configuration files it was asked about.

use crate::error::{ApiBoxError, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// A change to a watched configuration file
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    /// File that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: ChangeKind,
    /// When the change was observed
    pub timestamp: Instant,
}

/// Type of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File was created (including rename-into-place)
    Created,
    /// File contents changed
    Modified,
    /// File was removed
    Removed,
}

/// Watches configuration files for changes
pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
    event_rx: Receiver<FileChangeEvent>,
    /// Files we report on
    files: Arc<RwLock<HashSet<PathBuf>>>,
    /// Directories registered with notify
    directories: HashSet<PathBuf>,
}

impl ConfigWatcher {
    /// Create a watcher with no files registered
    pub fn new() -> Result<Self> {
        let (tx, rx) = channel();
        let files: Arc<RwLock<HashSet<PathBuf>>> = Arc::new(RwLock::new(HashSet::new()));
        let filter = files.clone();

        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    let watched = match filter.read() {
                        Ok(files) => files,
                        Err(_) => return,
                    };
                    for change in classify_event(event, &watched) {
                        if let Err(e) = tx.send(change) {
                            error!("Failed to forward file change event: {}", e);
                        }
                    }
                }
                Err(e) => error!("File watch error: {}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| ApiBoxError::ConfigError(format!("Failed to create watcher: {}", e)))?;

        Ok(ConfigWatcher {
            watcher,
            event_rx: rx,
            files,
            directories: HashSet::new(),
        })
    }

    /// Start reporting changes to `path`
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = absolute(path.as_ref())?;

        if !is_config_file(&path) {
            return Err(ApiBoxError::ConfigError(format!(
                "Not a TOML configuration file: {:?}",
                path
            )));
        }

        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ApiBoxError::ConfigError(format!("No parent directory: {:?}", path)))?;

        if !self.directories.contains(&dir) {
            self.watcher
                .watch(&dir, RecursiveMode::NonRecursive)
                .map_err(|e| ApiBoxError::ConfigError(format!("Failed to watch {:?}: {}", dir, e)))?;
            self.directories.insert(dir);
        }

        let inserted = self
            .files
            .write()
            .map_err(|_| ApiBoxError::ConfigError("watch list lock poisoned".into()))?
            .insert(path.clone());

        if inserted {
            info!("Now watching: {:?}", path);
        } else {
            debug!("Already watching: {:?}", path);
        }
        Ok(())
    }

    /// Stop watching every file and directory
    pub fn clear(&mut self) -> Result<()> {
        for dir in self.directories.drain() {
            self.watcher
                .unwatch(&dir)
                .map_err(|e| ApiBoxError::ConfigError(format!("Failed to unwatch {:?}: {}", dir, e)))?;
        }
        if let Ok(mut files) = self.files.write() {
            files.clear();
        }
        Ok(())
    }

    /// Receive with timeout
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FileChangeEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Try to receive a file change event (non-blocking)
    pub fn try_recv(&self) -> Option<FileChangeEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Files currently watched
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.files
            .read()
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Whether `path` looks like a configuration file
pub fn is_config_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

fn classify_event(event: Event, watched: &HashSet<PathBuf>) -> Vec<FileChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            ChangeKind::Modified
        }
        // Rename-into-place arrives as a name modification on the target
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .filter(|path| {
            let relevant = watched.contains(path);
            if !relevant {
                trace!("Ignoring unrelated file: {:?}", path);
            }
            relevant
        })
        .map(|path| FileChangeEvent {
            path,
            kind,
            timestamp: Instant::now(),
        })
        .collect()
}

/// Coalesces bursts of events per file.
///
/// A save may produce several events; a path is released only after no new
/// event has arrived for `duration`.
pub struct EventDebouncer {
    duration: Duration,
    pending: HashMap<PathBuf, (FileChangeEvent, Instant)>,
}

impl EventDebouncer {
    /// Create a new debouncer with specified duration
    pub fn new(duration: Duration) -> Self {
        EventDebouncer {
            duration,
            pending: HashMap::new(),
        }
    }

    /// Record an event, restarting the quiet period for its path
    pub fn add_event(&mut self, event: FileChangeEvent) {
        self.pending
            .insert(event.path.clone(), (event, Instant::now()));
    }

    /// Remove and return events whose quiet period has elapsed
    pub fn get_settled_events(&mut self) -> Vec<FileChangeEvent> {
        let now = Instant::now();
        let settled: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, last))| now.duration_since(*last) >= self.duration)
            .map(|(path, _)| path.clone())
            .collect();

        settled
            .into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|(event, _)| event))
            .collect()
    }

    /// Check if any events are pending
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_watch_file_once() {
        let mut watcher = ConfigWatcher::new().unwrap();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        fs::write(&file, "[remotes.a]").unwrap();

        watcher.watch(&file).unwrap();
        watcher.watch(&file).unwrap();
        assert_eq!(watcher.watched_files().len(), 1);

        watcher.clear().unwrap();
        assert!(watcher.watched_files().is_empty());
    }

    #[test]
    fn test_rejects_non_toml() {
        let mut watcher = ConfigWatcher::new().unwrap();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.yaml");
        fs::write(&file, "").unwrap();
        assert!(watcher.watch(&file).is_err());
    }

    #[test]
    fn test_is_config_file() {
        assert!(is_config_file(Path::new("gateway.toml")));
        assert!(!is_config_file(Path::new("readme.md")));
        assert!(!is_config_file(Path::new("toml")));
    }

    #[test]
    fn test_classify_filters_paths() {
        let target = PathBuf::from("/etc/apibox/config.toml");
        let watched: HashSet<PathBuf> = [target.clone()].into_iter().collect();

        let event = Event::new(EventKind::Modify(ModifyKind::Data(
            notify::event::DataChange::Content,
        )))
        .add_path(target.clone())
        .add_path(PathBuf::from("/etc/apibox/other.toml"));

        let changes = classify_event(event, &watched);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, target);
        assert_eq!(changes[0].kind, ChangeKind::Modified);

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(target);
        assert!(classify_event(access, &watched).is_empty());
    }

    #[test]
    fn test_debouncer() {
        let mut debouncer = EventDebouncer::new(Duration::from_millis(100));

        let event = FileChangeEvent {
            path: PathBuf::from("config.toml"),
            kind: ChangeKind::Modified,
            timestamp: Instant::now(),
        };

        debouncer.add_event(event.clone());
        debouncer.add_event(event.clone());
        assert!(debouncer.has_pending());
        assert!(debouncer.get_settled_events().is_empty());

        std::thread::sleep(Duration::from_millis(150));
        let settled = debouncer.get_settled_events();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].path, event.path);
        assert!(!debouncer.has_pending());
    }
}
