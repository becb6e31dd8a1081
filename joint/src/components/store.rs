//! In-memory key/value store.
//!
//! Joined under [`STORE_KEY`] as `dyn DataStore` with the close capability.
//! When a data directory is configured, setup creates it and close writes a
//! JSON snapshot there; the next start loads it back.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use joint_common::config::ConfigError;
use joint_common::options::Options;
use joint_runtime::{
    BoxError, Close, Context, InterfaceKey, Joinable, RegistryView, Starter, StarterError,
};
use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Well-known key of the primary store.
pub const STORE_KEY: InterfaceKey = InterfaceKey::from_static("store");

/// Snapshot file written inside the data directory.
pub const SNAPSHOT_FILE: &str = "store.json";

/// Key/value storage capability.
pub trait DataStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or replace, returning the previous value.
    fn put(&self, key: &str, value: String) -> Option<String>;

    fn remove(&self, key: &str) -> Option<String>;

    /// All keys, sorted.
    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `DataStore` backed by a map behind a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Store that is never persisted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store persisted to `path`, preloaded from it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            entries: RwLock::new(entries),
            snapshot: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Write the snapshot file, if this store has one.
    pub fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let content = {
            let entries = self.entries.read();
            serde_json::to_string_pretty(&*entries).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?
        };
        fs::write(path, content).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}

impl DataStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) -> Option<String> {
        self.entries.write().insert(key.to_string(), value)
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl Close for MemoryStore {
    fn close(&self) -> Result<(), BoxError> {
        self.flush()?;
        if let Some(path) = &self.snapshot {
            info!(path = %path.display(), entries = self.len(), "store snapshot written");
        }
        Ok(())
    }
}

// ─── Starter ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreSection {
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    seed: BTreeMap<String, String>,
}

/// Starter for [`MemoryStore`].
///
/// Options: `section` (default `"store"`), `path` (data directory, overrides
/// the section), `interface_key` (default [`STORE_KEY`]).
#[derive(Debug)]
pub struct StoreStarter {
    dir: Option<PathBuf>,
    seed: BTreeMap<String, String>,
    interface_key: InterfaceKey,
}

pub fn starter() -> StoreStarter {
    StoreStarter {
        dir: None,
        seed: BTreeMap::new(),
        interface_key: STORE_KEY,
    }
}

impl Starter for StoreStarter {
    fn name(&self) -> &str {
        "store"
    }

    fn init(&mut self, ctx: &Context<'_>, options: &Options) -> Result<Vec<Options>, StarterError> {
        let section_name = options.string_or("section", "store");
        let section: StoreSection = ctx.config.section(&section_name)?.unwrap_or_default();

        self.dir = options.string("path").map(PathBuf::from).or(section.path);
        if self.dir.as_ref().is_some_and(|dir| dir.as_os_str().is_empty()) {
            return Err(ConfigError::InvalidOption {
                name: "path".to_string(),
                reason: "data directory cannot be empty".to_string(),
            }
            .into());
        }
        self.seed = section.seed;
        self.interface_key = options
            .string("interface_key")
            .map(InterfaceKey::from)
            .unwrap_or(STORE_KEY);

        debug!(
            section = %section_name,
            dir = ?self.dir,
            seed = self.seed.len(),
            "store configured"
        );
        Ok(Vec::new())
    }

    fn setup(&mut self, ctx: &Context<'_>) -> Result<(), StarterError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        ctx.cancel.check()?;
        fs::create_dir_all(dir).map_err(|e| {
            StarterError::provision_with(format!("cannot create data directory {}", dir.display()), e)
        })?;
        debug!(dir = %dir.display(), "data directory ready");
        Ok(())
    }

    fn run(&mut self, _ctx: &Context<'_>, registry: &RegistryView<'_>) -> Result<(), StarterError> {
        let store = match &self.dir {
            Some(dir) => MemoryStore::open(dir.join(SNAPSHOT_FILE)).map_err(StarterError::other)?,
            None => MemoryStore::new(),
        };
        for (key, value) in &self.seed {
            if store.get(key).is_none() {
                store.put(key, value.clone());
            }
        }

        let store = Arc::new(store);
        registry.join(
            Joinable::new(store.clone())
                .provide::<dyn DataStore>(store.clone())
                .with_close(store.clone()),
            self.interface_key.clone(),
        )?;
        info!(key = %self.interface_key, entries = store.len(), "store joined");
        Ok(())
    }
}
