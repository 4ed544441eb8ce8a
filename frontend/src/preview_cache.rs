//! Time-boxed memoization of navigation path previews.
//!
//! Entries are keyed by `tree|current|target`, expire lazily after the TTL,
//! and are persisted to [`LocalStorage`] with debounced writes.

use crate::clock::Clock;
use crate::storage::{LocalStorage, StorageError};
use crate::EditorSettings;
use chrono::Duration;
use navgraph_types::NavigationStep;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Storage key under which the whole cache is persisted.
pub const PREVIEW_CACHE_KEY: &str = "navigation_preview_cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPreview {
    steps: Vec<NavigationStep>,
    /// Milliseconds since the Unix epoch
    timestamp: i64,
}

struct Shared {
    entries: Mutex<HashMap<String, CachedPreview>>,
    storage: Arc<dyn LocalStorage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    debounce: std::time::Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    dirty: AtomicBool,
}

impl Shared {
    fn is_fresh(&self, entry: &CachedPreview, now_ms: i64) -> bool {
        now_ms - entry.timestamp < self.ttl.num_milliseconds()
    }

    fn flush_now(&self) -> Result<(), StorageError> {
        let json = {
            let entries = self.entries.lock();
            serde_json::to_string(&*entries)?
        };
        self.storage.set(PREVIEW_CACHE_KEY, &json)?;
        self.dirty.store(false, Ordering::SeqCst);
        debug!("Flushed preview cache");
        Ok(())
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
        if self.dirty.load(Ordering::SeqCst) {
            if let Err(e) = self.flush_now() {
                warn!("Failed to flush preview cache on teardown: {}", e);
            }
        }
    }
}

/// Shared handle to the preview cache. Cloning is cheap.
#[derive(Clone)]
pub struct PreviewCache {
    shared: Arc<Shared>,
}

impl PreviewCache {
    /// Build the cache, loading persisted entries and dropping expired ones.
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        clock: Arc<dyn Clock>,
        settings: &EditorSettings,
    ) -> Self {
        let ttl = Duration::from_std(settings.preview_ttl).unwrap_or_else(|_| Duration::minutes(5));
        let now_ms = clock.now_millis();

        let mut entries: HashMap<String, CachedPreview> = match storage.get(PREVIEW_CACHE_KEY) {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Ignoring unreadable preview cache: {}", e);
                HashMap::new()
            }),
            None => HashMap::new(),
        };
        let loaded = entries.len();
        entries.retain(|_, entry| now_ms - entry.timestamp < ttl.num_milliseconds());
        if loaded > 0 {
            info!(
                "Loaded {} cached previews ({} expired)",
                entries.len(),
                loaded - entries.len()
            );
        }

        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(entries),
                storage,
                clock,
                ttl,
                debounce: settings.flush_debounce,
                pending: Mutex::new(None),
                dirty: AtomicBool::new(false),
            }),
        }
    }

    /// Composite key of a preview.
    pub fn cache_key(tree_id: &str, current_node_id: Option<&str>, target_node_id: &str) -> String {
        format!(
            "{}|{}|{}",
            tree_id,
            current_node_id.unwrap_or("root"),
            target_node_id
        )
    }

    /// Cached steps if present and younger than the TTL. Stale entries are evicted.
    pub fn get_cached_preview(
        &self,
        tree_id: &str,
        current_node_id: Option<&str>,
        target_node_id: &str,
    ) -> Option<Vec<NavigationStep>> {
        let key = Self::cache_key(tree_id, current_node_id, target_node_id);
        let now_ms = self.shared.clock.now_millis();

        let mut entries = self.shared.entries.lock();
        let entry = entries.get(&key)?;
        if self.shared.is_fresh(entry, now_ms) {
            debug!("Preview cache hit: {}", key);
            return Some(entry.steps.clone());
        }

        debug!("Preview cache entry expired: {}", key);
        entries.remove(&key);
        drop(entries);
        self.mark_dirty();
        None
    }

    /// Store steps for a preview, replacing any previous entry.
    pub fn cache_preview(
        &self,
        tree_id: &str,
        current_node_id: Option<&str>,
        target_node_id: &str,
        steps: Vec<NavigationStep>,
    ) {
        let key = Self::cache_key(tree_id, current_node_id, target_node_id);
        let timestamp = self.shared.clock.now_millis();
        self.shared
            .entries
            .lock()
            .insert(key, CachedPreview { steps, timestamp });
        self.mark_dirty();
    }

    /// Drop every preview of a tree.
    pub fn invalidate_tree(&self, tree_id: &str) {
        let prefix = format!("{}|", tree_id);
        let removed = {
            let mut entries = self.shared.entries.lock();
            let before = entries.len();
            entries.retain(|key, _| !key.starts_with(&prefix));
            before - entries.len()
        };
        if removed > 0 {
            info!("Invalidated {} cached previews for tree {}", removed, tree_id);
            self.mark_dirty();
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.shared.entries.lock().clear();
        self.mark_dirty();
    }

    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write to storage immediately, cancelling any scheduled flush.
    pub fn flush(&self) -> Result<(), StorageError> {
        if let Some(handle) = self.shared.pending.lock().take() {
            handle.abort();
        }
        self.shared.flush_now()
    }

    fn mark_dirty(&self) {
        self.shared.dirty.store(true, Ordering::SeqCst);
        self.schedule_flush();
    }

    /// Coalesce bursts of writes into one flush after the debounce delay.
    fn schedule_flush(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            if let Err(e) = self.shared.flush_now() {
                warn!("Failed to persist preview cache: {}", e);
            }
            return;
        };

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let delay = self.shared.debounce;
        let mut pending = self.shared.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            shared.pending.lock().take();
            if let Err(e) = shared.flush_now() {
                warn!("Failed to persist preview cache: {}", e);
            }
        }));
    }
}
