// src/cache/store.rs — TTL result store
//
// One mutex guards the in-memory map and serialises disk writes. Disk
// entries are written to a unique temp file and renamed into place, so a
// reader sees either the old entry or the new one, never a partial file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::{normalize_target, CacheKey};
use crate::infra::errors::ReconError;
use crate::modules::ExecutionResult;

/// What is stored per fingerprint, in memory and on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: CacheKey,
    expires_at: DateTime<Utc>,
    result: ExecutionResult,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Execution results keyed by `CacheKey`, each valid until its expiry.
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    dir: Option<PathBuf>,
}

impl ResultCache {
    /// Cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            dir: None,
        }
    }

    /// Cache persisted as one JSON file per entry under `dir`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Result<Self, ReconError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            dir: Some(dir),
        })
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stored result for `key` if it has not expired, marked `from_cache`.
    pub fn get(&self, key: &CacheKey) -> Option<ExecutionResult> {
        let now = Utc::now();
        let mut entries = self.lock();

        if !entries.contains_key(&key.fingerprint) {
            let entry = self
                .dir
                .as_deref()
                .and_then(|dir| read_entry(&dir.join(key.file_name())))
                .filter(|e| e.key == *key)?;
            entries.insert(key.fingerprint.clone(), entry);
        }

        let entry = entries.get(&key.fingerprint)?;
        if !entry.is_live(now) {
            tracing::debug!("Cache entry {} expired at {}", key, entry.expires_at);
            entries.remove(&key.fingerprint);
            self.remove_file(key);
            return None;
        }

        tracing::debug!("Cache hit for {}", key);
        let mut result = entry.result.clone();
        result.from_cache = true;
        Some(result)
    }

    /// Store `result` until now + `ttl`, replacing any previous entry.
    pub fn put(
        &self,
        key: &CacheKey,
        result: &ExecutionResult,
        ttl: Duration,
    ) -> Result<(), ReconError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ReconError::Cache(format!("invalid TTL {ttl:?}: {e}")))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut stored = result.clone();
        stored.from_cache = false;
        let entry = CacheEntry {
            key: key.clone(),
            expires_at,
            result: stored,
        };

        let mut entries = self.lock();
        if let Some(dir) = &self.dir {
            write_entry(dir, &entry)?;
        }
        entries.insert(key.fingerprint.clone(), entry);
        tracing::debug!("Cached {} until {}", key, expires_at);
        Ok(())
    }

    /// Drop one entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut entries = self.lock();
        let in_memory = entries.remove(&key.fingerprint).is_some();
        in_memory | self.remove_file(key)
    }

    /// Drop every entry for `target`, across modules and profiles.
    pub fn invalidate_target(&self, target: &str) -> usize {
        let target = normalize_target(target);
        self.remove_where(|entry| entry.key.target == target)
    }

    /// Drop every entry whose TTL has passed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        self.remove_where(|entry| !entry.is_live(now))
    }

    /// Drop everything, including unreadable files in the cache directory.
    pub fn clear(&self) -> Result<usize, ReconError> {
        let mut entries = self.lock();
        let mut removed = entries.len();
        entries.clear();

        if let Some(dir) = &self.dir {
            removed = 0;
            for path in entry_files(dir)? {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        match &self.dir {
            Some(dir) => entry_files(dir).map(|files| files.len()).unwrap_or(0),
            None => self.lock().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_where(&self, matches: impl Fn(&CacheEntry) -> bool) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !matches(entry));
        let mut removed = before - entries.len();

        if let Some(dir) = &self.dir {
            removed = 0;
            for path in entry_files(dir).unwrap_or_default() {
                // Unreadable files are left for `clear`
                if read_entry(&path).is_some_and(|e| matches(&e))
                    && std::fs::remove_file(&path).is_ok()
                {
                    removed += 1;
                }
            }
        }
        removed
    }

    fn remove_file(&self, key: &CacheKey) -> bool {
        let Some(dir) = &self.dir else {
            return false;
        };
        match std::fs::remove_file(dir.join(key.file_name())) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Failed to remove cache entry {}: {}", key, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Corrupt or unreadable entries count as misses.
fn read_entry(path: &Path) -> Option<CacheEntry> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::debug!("Ignoring unreadable cache file {}: {}", path.display(), e);
            None
        }
    }
}

fn write_entry(dir: &Path, entry: &CacheEntry) -> Result<(), ReconError> {
    let json = serde_json::to_string_pretty(entry)
        .map_err(|e| ReconError::Cache(format!("failed to serialize {}: {e}", entry.key)))?;

    let tmp = dir.join(format!(
        ".{}.{}.tmp",
        entry.key.fingerprint,
        uuid::Uuid::new_v4().simple()
    ));
    std::fs::write(&tmp, json)?;
    if let Err(e) = std::fs::rename(&tmp, dir.join(entry.key.file_name())) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn entry_files(dir: &Path) -> Result<Vec<PathBuf>, ReconError> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in read_dir {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}
