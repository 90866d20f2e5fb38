//! File-backed result cache
//!
//! Each response is stored as `<key>.json`, where the key is the SHA-256
//! of the rule book version and the canonical request. Entries expire by
//! file modification time. There is no locking: every writer stages its
//! own temp file and renames it into place, so concurrent writers of the
//! same key race only over which complete entry survives.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use ulid::Ulid;

use crate::core::error::{DfmError, DfmResult};
use crate::entities::request::AnalyzeRequest;
use crate::entities::response::AnalysisResponse;

/// Directory of cached analysis responses
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
}

/// Snapshot of cache contents
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub total_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<DateTime<Utc>>,
}

impl ResultCache {
    /// Open (and create) a cache directory
    pub fn open(dir: impl Into<PathBuf>, ttl: Duration) -> DfmResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key covering every field of the request and the rule book version
    pub fn key(request: &AnalyzeRequest, rules_version: u32) -> DfmResult<String> {
        // serde_json::Value keeps object keys sorted, which makes this canonical
        let canonical = serde_json::to_value(request)?.to_string();
        Ok(compute_hash(&format!("v{}:{}", rules_version, canonical)))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Fresh entry for `key`; corrupt entries count as a miss
    pub fn get(&self, key: &str) -> Option<AnalysisResponse> {
        match self.read(key) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Treating unreadable cache entry as a miss");
                None
            }
        }
    }

    fn read(&self, key: &str) -> DfmResult<Option<AnalysisResponse>> {
        let path = self.entry_path(key);
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(corruption(&path, e)),
        };

        if self.is_expired(&metadata) {
            tracing::debug!(key, "Cache entry expired");
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| corruption(&path, e))?;
        let response = serde_json::from_str(&contents).map_err(|e| corruption(&path, e))?;
        Ok(Some(response))
    }

    /// Store a response, replacing any previous entry
    pub fn put(&self, key: &str, response: &AnalysisResponse) -> DfmResult<()> {
        let path = self.entry_path(key);
        let tmp = self.dir.join(format!(".{}.{}.tmp", key, Ulid::new()));
        fs::write(&tmp, serde_json::to_vec(response)?)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove every entry, returning how many were deleted
    pub fn clear(&self) -> DfmResult<usize> {
        let mut removed = 0;
        for path in self.entry_files()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Remove expired entries, returning how many were deleted
    pub fn prune(&self) -> DfmResult<usize> {
        let mut removed = 0;
        for path in self.entry_files()? {
            let expired = fs::metadata(&path)
                .map(|m| self.is_expired(&m))
                .unwrap_or(true);
            if expired {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> DfmResult<CacheStats> {
        let mut stats = CacheStats::default();
        for path in self.entry_files()? {
            let metadata = fs::metadata(&path)?;
            stats.entries += 1;
            stats.total_bytes += metadata.len();
            if self.is_expired(&metadata) {
                stats.expired += 1;
            }
            if let Ok(modified) = metadata.modified() {
                let at: DateTime<Utc> = modified.into();
                stats.oldest = Some(stats.oldest.map_or(at, |o| o.min(at)));
                stats.newest = Some(stats.newest.map_or(at, |n| n.max(at)));
            }
        }
        Ok(stats)
    }

    fn is_expired(&self, metadata: &fs::Metadata) -> bool {
        let Ok(modified) = metadata.modified() else {
            return true;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age > self.ttl,
            // Written "in the future" by a skewed clock
            Err(_) => false,
        }
    }

    fn entry_files(&self) -> DfmResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_entry = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some("json")
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if is_entry {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn corruption(path: &Path, err: impl std::fmt::Display) -> DfmError {
    DfmError::CacheCorruption {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Compute SHA256 hash of content
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
