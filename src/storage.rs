//! Opaque key-value sinks for the editor state.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;

/// Key-value sink the editor persists its graph into.
pub trait StateStore: Send + Sync {
    /// Returns stored value or `None` if nothing is stored or it can't be read.
    fn load(&self, key: &str) -> Option<String>;

    fn store(&self, key: &str, value: &str) -> io::Result<()>;
}

/// In-memory store, handy for tests and for hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.values.lock().insert(key.into(), value.into());
        store
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> io::Result<()> {
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stores every key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn store(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        // atomic replace
        let tmp = self.path(&format!("{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(tmp, self.path(key))
    }
}
