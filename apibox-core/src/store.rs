//! Atomic configuration snapshots
//!
//! Readers grab the current `Arc<MainConfig>` and keep using it for the whole
//! decision; a reload publishes a complete new snapshot in one pointer swap,
//! so no reader ever sees a half-updated configuration. The generation number
//! is swapped together with the configuration it describes.

use crate::config::MainConfig;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// A published configuration and its generation number
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Starts at 1 and grows by one per publish
    pub generation: u64,
    /// The configuration
    pub config: Arc<MainConfig>,
}

/// Shared handle to the live configuration
#[derive(Clone)]
pub struct ConfigStore {
    current: Arc<ArcSwap<Snapshot>>,
}

impl ConfigStore {
    /// Publish an initial configuration (generation 1)
    pub fn new(config: MainConfig) -> Self {
        ConfigStore {
            current: Arc::new(ArcSwap::from_pointee(Snapshot {
                generation: 1,
                config: Arc::new(config),
            })),
        }
    }

    /// Current configuration
    pub fn load(&self) -> Arc<MainConfig> {
        self.current.load().config.clone()
    }

    /// Current configuration together with its generation
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the snapshot, returning the new generation number.
    ///
    /// Concurrent publishers each get a distinct generation, and the number
    /// returned is the one stored alongside `config`.
    pub fn publish(&self, config: MainConfig) -> u64 {
        let config = Arc::new(config);
        let previous = self.current.rcu(|current| Snapshot {
            generation: current.generation + 1,
            config: config.clone(),
        });
        previous.generation + 1
    }

    /// Number of snapshots published so far
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("ConfigStore")
            .field("generation", &snapshot.generation)
            .field("remotes", &snapshot.config.remotes.len())
            .finish()
    }
}
