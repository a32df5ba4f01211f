//! Background work tracking: prefetch and metadata polling.
//!
//! Both trackers follow the same discipline. On every engine state
//! recomputation the actor hands them the freshly computed *desired* set;
//! the tracker diffs it against the *active* set, starts what is missing,
//! aborts what is no longer wanted, and leaves in-flight still-desired
//! work untouched. Completions come back to the actor as messages and move
//! keys into a `finished` set so they are not re-issued while still
//! desired; a key that leaves the desired set is forgotten entirely, which
//! is what makes the next recomputation retry a failed fetch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::models::{ItemKey, MediaId};
use crate::traits::{ContentStore, FetchRequest, MediaFetcher};

use super::actor::EngineMsg;

/// Byte-range prefix fetched for video media instead of the full resource.
pub(crate) const PRELOAD_WINDOW_BYTES: u64 = 512 * 1024;

/// Maximum upcoming items considered for prefetch.
pub(crate) const PREFETCH_CANDIDATES: usize = 3;

/// Maximum upcoming self-owned items considered for metadata polling.
pub(crate) const POLL_CANDIDATES: usize = 3;

/// Live set of cancellable media prefetch operations, keyed by media id.
#[derive(Default)]
pub(crate) struct PrefetchScheduler {
    active: HashMap<MediaId, AbortHandle>,
    finished: HashSet<MediaId>,
}

impl PrefetchScheduler {
    /// Converge the active set onto `desired`.
    pub fn sync(
        &mut self,
        desired: Vec<FetchRequest>,
        fetcher: &Arc<dyn MediaFetcher>,
        msg_tx: &mpsc::UnboundedSender<EngineMsg>,
    ) {
        let desired_keys: HashSet<MediaId> = desired.iter().map(|req| req.media.id).collect();

        let stale: Vec<MediaId> = self
            .active
            .keys()
            .filter(|id| !desired_keys.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(handle) = self.active.remove(&id) {
                tracing::debug!(media_id = id.0, "cancelling prefetch");
                handle.abort();
            }
        }
        self.finished.retain(|id| desired_keys.contains(id));

        for request in desired {
            let id = request.media.id;
            if self.active.contains_key(&id) || self.finished.contains(&id) {
                continue;
            }
            tracing::debug!(media_id = id.0, priority = request.priority, "starting prefetch");
            let fetcher = fetcher.clone();
            let msg_tx = msg_tx.clone();
            let handle = tokio::spawn(async move {
                if let Err(err) = fetcher.prefetch(request).await {
                    tracing::warn!(media_id = id.0, %err, "prefetch failed");
                }
                let _ = msg_tx.send(EngineMsg::PrefetchFinished(id));
            });
            self.active.insert(id, handle.abort_handle());
        }
    }

    /// A prefetch task finished (successfully or not).
    pub fn mark_finished(&mut self, id: MediaId) {
        if self.active.remove(&id).is_some() {
            self.finished.insert(id);
        }
    }

    pub fn active_keys(&self) -> HashSet<MediaId> {
        self.active.keys().copied().collect()
    }

    pub fn shutdown(&mut self) {
        for (_, handle) in self.active.drain() {
            handle.abort();
        }
        self.finished.clear();
    }
}

/// Live set of metadata-refresh polls, keyed by item. Requests are batched
/// per source; a batch is aborted only once every one of its keys has left
/// the desired set, so an in-flight key with undesired siblings keeps its
/// batch and is never re-issued.
#[derive(Default)]
pub(crate) struct PollTracker {
    active: HashMap<ItemKey, u64>,
    batches: HashMap<u64, AbortHandle>,
    finished: HashSet<ItemKey>,
    next_batch: u64,
}

impl PollTracker {
    /// Converge the active poll set onto `desired`.
    pub fn sync(
        &mut self,
        desired: Vec<ItemKey>,
        store: &Arc<dyn ContentStore>,
        msg_tx: &mpsc::UnboundedSender<EngineMsg>,
    ) {
        let desired_keys: HashSet<ItemKey> = desired.iter().copied().collect();

        let live_batches: HashSet<u64> = self
            .active
            .iter()
            .filter(|(key, _)| desired_keys.contains(key))
            .map(|(_, batch)| *batch)
            .collect();
        let stale_batches: Vec<u64> = self
            .batches
            .keys()
            .filter(|batch| !live_batches.contains(batch))
            .copied()
            .collect();
        if !stale_batches.is_empty() {
            for batch in &stale_batches {
                if let Some(handle) = self.batches.remove(batch) {
                    handle.abort();
                }
            }
            self.active.retain(|_, batch| !stale_batches.contains(batch));
        }
        self.finished.retain(|key| desired_keys.contains(key));

        // Batch still-missing keys per source.
        let mut per_source: HashMap<crate::models::SourceId, Vec<ItemKey>> = HashMap::new();
        for key in desired {
            if self.active.contains_key(&key) || self.finished.contains(&key) {
                continue;
            }
            per_source.entry(key.source_id).or_default().push(key);
        }

        for (source_id, keys) in per_source {
            let batch = self.next_batch;
            self.next_batch += 1;

            let item_ids = keys.iter().map(|key| key.item_id).collect();
            let store = store.clone();
            let msg_tx = msg_tx.clone();
            let task_keys = keys.clone();
            let handle = tokio::spawn(async move {
                if let Err(err) = store.refresh_view_stats(source_id, item_ids).await {
                    tracing::warn!(source_id = source_id.0, %err, "view stats refresh failed");
                }
                let _ = msg_tx.send(EngineMsg::PollFinished(task_keys));
            });

            self.batches.insert(batch, handle.abort_handle());
            for key in keys {
                self.active.insert(key, batch);
            }
        }
    }

    /// A poll batch finished.
    pub fn mark_finished(&mut self, keys: &[ItemKey]) {
        let mut batches: HashSet<u64> = HashSet::new();
        for key in keys {
            if let Some(batch) = self.active.remove(key) {
                batches.insert(batch);
                self.finished.insert(*key);
            }
        }
        for batch in batches {
            self.batches.remove(&batch);
        }
    }

    pub fn active_keys(&self) -> HashSet<ItemKey> {
        self.active.keys().copied().collect()
    }

    pub fn shutdown(&mut self) {
        for (_, handle) in self.batches.drain() {
            handle.abort();
        }
        self.active.clear();
        self.finished.clear();
    }
}
