//! TTL-bound artifact cache.
//!
//! Grounded on the teacher's `cache.rs` (a `Mutex`-guarded index plus a
//! `global()` singleton) — same locking shape, but the eviction policy here
//! is TTL-based rather than LRU-based: artifacts must survive until a later
//! task consumes them, not get evicted under memory/size pressure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{ARTIFACT_TTL, CACHE_SWEEP_INTERVAL};
use crate::model::{current_time_millis, ArtifactEntry, ArtifactMetadata, ArtifactType, Handle};

pub struct CacheLookup {
    pub file_path: PathBuf,
    pub metadata: ArtifactMetadata,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub count: usize,
    pub total_bytes: u64,
}

pub struct ArtifactCache {
    root: PathBuf,
    ttl_ms: u64,
    index: Mutex<HashMap<Handle, ArtifactEntry>>,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactCache {
            root: root.into(),
            ttl_ms: ARTIFACT_TTL.as_millis() as u64,
            index: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, artifact_type: ArtifactType) -> PathBuf {
        self.root.join(artifact_type.as_str())
    }

    fn path_for(&self, artifact_type: ArtifactType, id: &Handle) -> PathBuf {
        self.dir_for(artifact_type).join(id)
    }

    pub async fn put(
        &self,
        artifact_type: ArtifactType,
        bytes: &[u8],
        file_name: String,
    ) -> std::io::Result<ArtifactEntry> {
        let dir = self.dir_for(artifact_type);
        fs::create_dir_all(&dir).await?;

        let entry = ArtifactEntry::new(
            artifact_type,
            ArtifactMetadata {
                file_name,
                size: bytes.len() as u64,
            },
            self.ttl_ms,
        );
        let path = self.path_for(artifact_type, &entry.id);
        fs::write(&path, bytes).await?;

        self.index.lock().unwrap().insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    /// Returns `None` if the handle is unknown, expired, or its backing file
    /// is missing. A missing file self-heals the index (removes the stale
    /// entry) rather than surfacing an internal error to the caller.
    pub async fn get(&self, handle: &Handle) -> Option<CacheLookup> {
        let entry = {
            let index = self.index.lock().unwrap();
            let entry = index.get(handle)?.clone();
            if !entry.is_live_at(current_time_millis()) {
                drop(index);
                self.index.lock().unwrap().remove(handle);
                return None;
            }
            entry
        };

        let path = self.path_for(entry.artifact_type, handle);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            warn!(handle = %handle, "cache entry indexed but file missing; self-healing");
            self.index.lock().unwrap().remove(handle);
            return None;
        }

        Some(CacheLookup {
            file_path: path,
            metadata: entry.metadata,
            expires_at: entry.expires_at,
        })
    }

    pub fn has(&self, handle: &Handle) -> bool {
        let index = self.index.lock().unwrap();
        match index.get(handle) {
            Some(entry) => entry.is_live_at(current_time_millis()),
            None => false,
        }
    }

    pub async fn delete(&self, handle: &Handle) {
        let entry = self.index.lock().unwrap().remove(handle);
        if let Some(entry) = entry {
            let path = self.path_for(entry.artifact_type, handle);
            let _ = fs::remove_file(path).await;
        }
    }

    /// Extends `expires_at` to `now + TTL` iff the entry is currently live.
    pub fn refresh(&self, handle: &Handle) -> bool {
        let mut index = self.index.lock().unwrap();
        let now = current_time_millis();
        match index.get_mut(handle) {
            Some(entry) if entry.is_live_at(now) => {
                entry.expires_at = now + self.ttl_ms;
                true
            }
            _ => false,
        }
    }

    pub fn stats(&self) -> CacheStats {
        let index = self.index.lock().unwrap();
        let now = current_time_millis();
        let mut count = 0usize;
        let mut total_bytes = 0u64;
        for entry in index.values() {
            if entry.is_live_at(now) {
                count += 1;
                total_bytes += entry.metadata.size;
            }
        }
        CacheStats { count, total_bytes }
    }

    /// One sweep: removes expired index entries and their files. Runs under
    /// a short critical section per removal batch so `put`/`get` aren't
    /// starved.
    async fn sweep_once(&self) {
        let now = current_time_millis();
        let expired: Vec<ArtifactEntry> = {
            let mut index = self.index.lock().unwrap();
            let expired_ids: Vec<Handle> = index
                .iter()
                .filter(|(_, e)| !e.is_live_at(now))
                .map(|(id, _)| id.clone())
                .collect();
            expired_ids
                .into_iter()
                .filter_map(|id| index.remove(&id))
                .collect()
        };
        for entry in &expired {
            let path = self.path_for(entry.artifact_type, &entry.id);
            let _ = fs::remove_file(path).await;
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "swept expired artifacts");
        }
    }

    /// Spawns the background sweeper loop; stops when `cancel` fires.
    pub async fn run_sweeper(cache: std::sync::Arc<ArtifactCache>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => cache.sweep_once().await,
                _ = cancel.cancelled() => break,
            }
        }
    }
}

#[allow(dead_code)]
fn sweep_cadence_upper_bound() -> Duration {
    ARTIFACT_TTL / 5
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_cache() -> (ArtifactCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (ArtifactCache::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let (cache, _dir) = temp_cache().await;
        let entry = cache
            .put(ArtifactType::Source, b"hello world", "a.cpp".to_string())
            .await
            .unwrap();
        let lookup = cache.get(&entry.id).await.unwrap();
        let bytes = fs::read(&lookup.file_path).await.unwrap();
        assert_eq!(bytes, b"hello world");
        assert_eq!(lookup.metadata.file_name, "a.cpp");
    }

    #[tokio::test]
    async fn get_unknown_handle_returns_none() {
        let (cache, _dir) = temp_cache().await;
        assert!(cache.get(&"nonexistent".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_invisible_and_self_heals() {
        let (cache, _dir) = temp_cache().await;
        let entry = cache
            .put(ArtifactType::Input, b"1 2", "in.txt".to_string())
            .await
            .unwrap();
        // Force expiry by mutating the index directly (simulates time passing).
        {
            let mut index = cache.index.lock().unwrap();
            index.get_mut(&entry.id).unwrap().expires_at = 0;
        }
        assert!(cache.get(&entry.id).await.is_none());
        // Self-healed: the index entry is gone too.
        assert!(!cache.has(&entry.id));
    }

    #[tokio::test]
    async fn refresh_extends_ttl_for_live_entry() {
        let (cache, _dir) = temp_cache().await;
        let entry = cache
            .put(ArtifactType::Output, b"3", "out.txt".to_string())
            .await
            .unwrap();
        let before = entry.expires_at;
        assert!(cache.refresh(&entry.id));
        let index = cache.index.lock().unwrap();
        assert!(index.get(&entry.id).unwrap().expires_at >= before);
    }

    #[tokio::test]
    async fn refresh_on_unknown_handle_returns_false() {
        let (cache, _dir) = temp_cache().await;
        assert!(!cache.refresh(&"missing".to_string()));
    }

    #[tokio::test]
    async fn delete_removes_entry_and_file() {
        let (cache, _dir) = temp_cache().await;
        let entry = cache
            .put(ArtifactType::Binary, b"ELF", "a.out".to_string())
            .await
            .unwrap();
        cache.delete(&entry.id).await;
        assert!(cache.get(&entry.id).await.is_none());
    }

    #[tokio::test]
    async fn stats_counts_only_live_entries() {
        let (cache, _dir) = temp_cache().await;
        cache
            .put(ArtifactType::Source, b"abc", "a.cpp".to_string())
            .await
            .unwrap();
        let expired = cache
            .put(ArtifactType::Source, b"defgh", "b.cpp".to_string())
            .await
            .unwrap();
        cache
            .index
            .lock()
            .unwrap()
            .get_mut(&expired.id)
            .unwrap()
            .expires_at = 0;
        let stats = cache.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_bytes, 3);
    }

    #[tokio::test]
    async fn sweep_removes_expired_and_keeps_live() {
        let (cache, _dir) = temp_cache().await;
        let live = cache
            .put(ArtifactType::Source, b"abc", "a.cpp".to_string())
            .await
            .unwrap();
        let expired = cache
            .put(ArtifactType::Source, b"def", "b.cpp".to_string())
            .await
            .unwrap();
        cache
            .index
            .lock()
            .unwrap()
            .get_mut(&expired.id)
            .unwrap()
            .expires_at = 0;
        cache.sweep_once().await;
        assert!(cache.has(&live.id));
        assert!(!cache.index.lock().unwrap().contains_key(&expired.id));
    }
}
