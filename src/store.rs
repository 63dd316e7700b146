//! Small string key/value persistence for gloss caching and reading position.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const STORE_FILE: &str = "store.json";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);

    /// Persists pending writes. Stores without a backing file have none.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// A JSON object of strings kept in memory and written back on [`flush`].
///
/// [`flush`]: KeyValueStore::flush
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl FileStore {
    /// Opens `<dir>/store.json`. A missing file starts an empty store.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(STORE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            entries,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        if self.entries.get(key) != Some(&value) {
            self.entries.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content =
            serde_json::to_string_pretty(&self.entries).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPosition {
    pub chapter: usize,
    pub scroll: usize,
}

impl ReadingPosition {
    fn key(book_id: &str) -> String {
        format!("position:{book_id}")
    }

    /// Last saved position for `book_id`. Unreadable entries count as unset.
    pub fn load(store: &dyn KeyValueStore, book_id: &str) -> Option<Self> {
        let raw = store.get(&Self::key(book_id))?;
        match serde_json::from_str(&raw) {
            Ok(position) => Some(position),
            Err(err) => {
                warn!("ignoring stored position for {book_id}: {err}");
                None
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore, book_id: &str) {
        match serde_json::to_string(self) {
            Ok(raw) => store.set(&Self::key(book_id), raw),
            Err(err) => warn!("failed to encode reading position: {err}"),
        }
    }
}
