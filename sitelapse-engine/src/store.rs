//! Layer snapshot store
//!
//! Holds the derived views (packet layers, tileset entries, progress
//! series) as immutable snapshots keyed by project, layer, and optional
//! query date. A completed fetch atomically replaces the previous snapshot
//! for its key — but only if no newer fetch for the same key was issued in
//! the meantime: every fetch takes a generation token, and a stale token's
//! install is discarded regardless of completion order.
//!
//! Consumers that can be torn down mid-fetch (a viewer session being
//! closed) hold a [`ConsumerHandle`] and check it before applying results.

use crate::normalize::AssetKind;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Composite cache key: project, layer, optional query date
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerKey {
    pub project_id: String,
    pub layer: AssetKind,
    pub date: Option<NaiveDate>,
}

impl LayerKey {
    pub fn new(project_id: impl Into<String>, layer: AssetKind, date: Option<NaiveDate>) -> Self {
        Self {
            project_id: project_id.into(),
            layer,
            date,
        }
    }
}

/// Token identifying one issued fetch for one key
#[derive(Debug)]
pub struct RequestToken {
    key: LayerKey,
    generation: u64,
}

/// Immutable-snapshot store with stale-response discard
#[derive(Debug)]
pub struct SnapshotStore<T> {
    entries: RwLock<HashMap<LayerKey, Arc<T>>>,
    /// Latest issued generation per key
    issued: RwLock<HashMap<LayerKey, u64>>,
    counter: AtomicU64,
}

impl<T> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            issued: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Current snapshot for a key, if any
    pub async fn lookup(&self, key: &LayerKey) -> Option<Arc<T>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Register a new fetch for `key`.
    ///
    /// The returned token supersedes every earlier token for the same key:
    /// their installs will be discarded even if they complete later.
    pub async fn begin_request(&self, key: &LayerKey) -> RequestToken {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.issued.write().await.insert(key.clone(), generation);
        RequestToken {
            key: key.clone(),
            generation,
        }
    }

    /// Install a snapshot if the token is still the latest for its key.
    ///
    /// Returns the installed snapshot, or `None` when the result was stale
    /// and dropped.
    pub async fn install(&self, token: &RequestToken, value: T) -> Option<Arc<T>> {
        let latest = self.issued.read().await.get(&token.key).copied();
        if latest != Some(token.generation) {
            tracing::debug!(key = ?token.key, "discarding stale fetch result");
            return None;
        }

        let snapshot = Arc::new(value);
        self.entries
            .write()
            .await
            .insert(token.key.clone(), Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Drop every snapshot for a project (e.g. after a config change)
    pub async fn invalidate_project(&self, project_id: &str) {
        self.entries
            .write()
            .await
            .retain(|key, _| key.project_id != project_id);
    }
}

/// Liveness flag shared between a consumer and its in-flight work.
///
/// Cloned handles observe the same flag; `retire()` marks the consumer
/// torn down, and pending completions check `is_live()` before touching
/// any externally-visible state.
#[derive(Debug, Clone, Default)]
pub struct ConsumerHandle {
    live: Arc<AtomicBool>,
}

impl ConsumerHandle {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }
}
