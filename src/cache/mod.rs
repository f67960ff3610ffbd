//! `Cache` (C6): transcription -> `(best_parse, ranked_candidates)`,
//! backed by a bounded in-memory LRU tier plus a durable backend.

use crate::core::error::{ParserError, Result};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// The maximum number of bytes a serialized cache value may occupy before
/// its candidate list is truncated on persist.
const MAX_SERIALIZED_BYTES: usize = 65_000;

/// The number of candidates kept when a value's serialized form would
/// exceed [`MAX_SERIALIZED_BYTES`].
///
/// This resolves the ambiguous truncation behavior flagged as a design
/// note: rather than serializing only the first N *bytes* of the
/// serialized candidate list (which produces data that cannot be
/// correctly round-tripped), the candidate *list itself* is truncated to
/// its first `MAX_PERSISTED_CANDIDATES` entries before serialization.
const MAX_PERSISTED_CANDIDATES: usize = 500;

/// One cache entry's value: the best parse (if any candidates survived)
/// and the full ranked candidate list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CacheValue {
    pub best: Option<String>,
    pub candidates: Vec<String>,
}

/// A row as it would be stored in a table-backed persistence layer: see
/// `spec.md` §3's "Parse (persistent, optional)".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedParse {
    pub parser_id: u64,
    pub transcription: String,
    pub parse: Option<String>,
    pub candidates: Vec<String>,
}

/// A durable backing store for a parser's cache. A host application that
/// wants a relational table instead of the bundled file backend implements
/// this trait itself — this is the narrow persistence seam referenced by
/// the subsystem's external interfaces.
pub trait CacheBackend: std::fmt::Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheValue>>;
    /// Write through entries not already present in the backing store.
    /// Implementations must never remove existing rows here — persistence
    /// is append-only with respect to the parser's lifetime.
    fn set_many(&self, entries: &[(String, CacheValue)]) -> Result<()>;
    /// Delete every row belonging to this parser.
    fn clear(&self) -> Result<()>;
    /// Every row belonging to this parser.
    fn all(&self) -> Result<HashMap<String, CacheValue>>;
}

/// A single bincode-encoded file holding the full transcription -> value
/// map for one parser.
#[derive(Debug)]
pub struct FileCacheBackend {
    path: PathBuf,
}

impl FileCacheBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<HashMap<String, CacheValue>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = std::fs::read(&self.path)?;
        if bytes.is_empty() {
            return Ok(HashMap::new());
        }
        bincode::deserialize(&bytes).map_err(|e| ParserError::Serialization(e.to_string()))
    }

    fn write_all(&self, map: &HashMap<String, CacheValue>) -> Result<()> {
        let encoded = bincode::serialize(map).map_err(|e| ParserError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, encoded)?;
        Ok(())
    }
}

impl CacheBackend for FileCacheBackend {
    fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(String, CacheValue)]) -> Result<()> {
        let mut map = self.read_all()?;
        for (key, value) in entries {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self.write_all(&map)
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn all(&self) -> Result<HashMap<String, CacheValue>> {
        self.read_all()
    }
}

/// The in-memory + durable cache a [`crate::parser::MorphologicalParser`]
/// owns.
#[derive(Debug)]
pub struct Cache {
    memory: LruCache<String, CacheValue>,
    backend: Box<dyn CacheBackend>,
    updated: bool,
}

impl Cache {
    pub fn new(backend: Box<dyn CacheBackend>, capacity: NonZeroUsize) -> Self {
        Self {
            memory: LruCache::new(capacity),
            backend,
            updated: false,
        }
    }

    /// Open a cache backed by a single file at `path`.
    pub fn with_file_backend(path: &Path, capacity: NonZeroUsize) -> Self {
        Self::new(Box::new(FileCacheBackend::new(path)), capacity)
    }

    /// In-memory first; on miss, fall through to the durable backend; on
    /// miss again, return `None`.
    pub fn get(&mut self, key: &str) -> Result<Option<CacheValue>> {
        if let Some(value) = self.memory.get(key) {
            return Ok(Some(value.clone()));
        }
        if let Some(value) = self.backend.get(key)? {
            self.memory.put(key.to_string(), value.clone());
            return Ok(Some(value));
        }
        Ok(None)
    }

    /// Write `value` into the in-memory tier, marking the cache updated if
    /// `key` was not already known (in memory or durably).
    pub fn set(&mut self, key: String, value: CacheValue) -> Result<()> {
        let already_known = self.memory.contains(&key) || self.backend.get(&key)?.is_some();
        self.memory.put(key, value);
        if !already_known {
            self.updated = true;
        }
        Ok(())
    }

    /// If the cache has been updated since the last persist, write through
    /// every in-memory entry not already present in the backend,
    /// truncating oversized candidate lists first, then clear the
    /// `updated` flag.
    pub fn persist(&mut self) -> Result<()> {
        if !self.updated {
            return Ok(());
        }

        let mut entries = Vec::with_capacity(self.memory.len());
        for (key, value) in self.memory.iter() {
            entries.push((key.clone(), truncate_if_oversized(value)));
        }
        self.backend.set_many(&entries)?;
        self.updated = false;
        Ok(())
    }

    /// Empty the in-memory tier; if `persist` is true, also delete every
    /// backing row for this parser.
    pub fn clear(&mut self, persist: bool) -> Result<()> {
        self.memory.clear();
        self.updated = false;
        if persist {
            self.backend.clear()?;
        }
        Ok(())
    }

    /// Merge the backing store into memory and return the full map.
    pub fn export(&mut self) -> Result<HashMap<String, CacheValue>> {
        let mut all = self.backend.all()?;
        for (key, value) in self.memory.iter() {
            all.insert(key.clone(), value.clone());
        }
        Ok(all)
    }
}

fn truncate_if_oversized(value: &CacheValue) -> CacheValue {
    let Ok(encoded) = bincode::serialize(value) else {
        return value.clone();
    };
    if encoded.len() <= MAX_SERIALIZED_BYTES || value.candidates.len() <= MAX_PERSISTED_CANDIDATES {
        return value.clone();
    }
    tracing::warn!(
        dropped = value.candidates.len() - MAX_PERSISTED_CANDIDATES,
        "truncating oversized cache entry before persist"
    );
    CacheValue {
        best: value.best.clone(),
        candidates: value.candidates[..MAX_PERSISTED_CANDIDATES].to_vec(),
    }
}
