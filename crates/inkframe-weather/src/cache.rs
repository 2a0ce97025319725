//! Time-bounded caching for weather snapshots.
//!
//! Expiry policy: an entry older than the TTL is returned as
//! [`CacheLookup::Stale`] without being evicted, so the caller can keep
//! serving the old value when a refresh fails. A save always overwrites the
//! entry and resets its timestamp.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::Weather;

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    /// Entry younger than the TTL.
    Fresh(T),
    /// Entry past the TTL; still usable as a fallback.
    Stale(T),
    /// No entry, or an unreadable persistent blob.
    Miss,
}

impl<T> CacheLookup<T> {
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// In-memory key → (value, stored-at) store with a fixed TTL.
///
/// The mutex keeps last-writer-wins semantics if the cache is ever shared
/// across tasks; the single-cycle driver never contends on it.
#[derive(Debug)]
pub struct TimedCache<T> {
    entries: Mutex<HashMap<String, (T, Instant)>>,
    ttl: Duration,
}

impl<T: Clone> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn load(&self, key: &str) -> CacheLookup<T> {
        self.load_at(key, Instant::now())
    }

    fn load_at(&self, key: &str, now: Instant) -> CacheLookup<T> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some((value, stored_at)) if now.duration_since(*stored_at) < self.ttl => {
                CacheLookup::Fresh(value.clone())
            }
            Some((value, _)) => CacheLookup::Stale(value.clone()),
            None => CacheLookup::Miss,
        }
    }

    pub fn save(&self, key: &str, value: T) {
        self.entries
            .lock()
            .insert(key.to_string(), (value, Instant::now()));
    }
}

/// Single-blob JSON cache file; staleness is measured against the file's
/// modification time, so it survives process restarts.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Read the blob. A missing, corrupt, or otherwise unreadable file is a
    /// miss, never an error.
    pub fn load<T: DeserializeOwned>(&self) -> CacheLookup<T> {
        let age = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified.elapsed().unwrap_or(Duration::ZERO),
            Err(e) => {
                tracing::debug!("cache miss for {}: {}", self.path.display(), e);
                return CacheLookup::Miss;
            }
        };

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("cache miss for {}: {}", self.path.display(), e);
                return CacheLookup::Miss;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) if age < self.ttl => CacheLookup::Fresh(value),
            Ok(value) => CacheLookup::Stale(value),
            Err(e) => {
                tracing::debug!("corrupt cache blob at {}: {}", self.path.display(), e);
                CacheLookup::Miss
            }
        }
    }

    pub fn save<T: Serialize>(&self, value: &T) -> std::io::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, bytes)
    }
}

/// Cache in front of the weather provider, in-memory or persistent.
#[derive(Debug)]
pub enum WeatherCache {
    Memory(TimedCache<Weather>),
    /// One blob file per key under `dir`.
    File { dir: PathBuf, ttl: Duration },
}

impl WeatherCache {
    pub fn memory(ttl: Duration) -> Self {
        Self::Memory(TimedCache::new(ttl))
    }

    pub fn file(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::File {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn load(&self, key: &str) -> CacheLookup<Weather> {
        match self {
            Self::Memory(cache) => cache.load(key),
            Self::File { dir, ttl } => FileCache::new(blob_path(dir, key), *ttl).load(),
        }
    }

    /// Store a snapshot. Persistence failures are logged and swallowed; the
    /// cache is an optimization, never a reason to fail a cycle.
    pub fn save(&self, key: &str, value: &Weather) {
        match self {
            Self::Memory(cache) => cache.save(key, value.clone()),
            Self::File { dir, ttl } => {
                let file = FileCache::new(blob_path(dir, key), *ttl);
                if let Err(e) = file.save(value) {
                    tracing::warn!("failed to persist weather cache: {}", e);
                }
            }
        }
    }
}

fn blob_path(dir: &Path, key: &str) -> PathBuf {
    let sanitized: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    dir.join(format!("weather-{sanitized}.json"))
}
