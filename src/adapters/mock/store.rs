//! Mock backing store for testing.
//!
//! Tests push `SourceView` and subscription-list snapshots through this
//! store and the engine observes them exactly as it would observe the real
//! reactive data store. Every mutating call is recorded for verification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::models::{ContentItem, ItemId, ItemKey, SourceId, SourceView, SubscriptionEntry};
use crate::traits::ContentStore;

#[derive(Default)]
struct Inner {
    /// Latest pushed view per source, replayed to new subscribers.
    source_views: HashMap<SourceId, SourceView>,
    /// Live per-source subscribers.
    source_subs: HashMap<SourceId, Vec<mpsc::UnboundedSender<SourceView>>>,
    /// Latest pushed subscriptions list.
    subscriptions: Option<Vec<SubscriptionEntry>>,
    subscription_subs: Vec<mpsc::UnboundedSender<Vec<SubscriptionEntry>>>,
    /// Items resolvable through `resolve_item`.
    items: HashMap<ItemKey, ContentItem>,
    /// Recorded calls.
    materialized: Vec<Vec<ItemKey>>,
    marked_seen: Vec<ItemKey>,
    refreshed: Vec<(SourceId, Vec<ItemId>)>,
    resolved: Vec<ItemKey>,
}

/// Mock backing store with push handles for tests.
///
/// Cloning shares the underlying state, so a test can keep one handle for
/// pushing while the engine owns another.
#[derive(Clone, Default)]
pub struct MockContentStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new snapshot for one source. Replayed to future subscribers.
    pub fn push_source(&self, view: SourceView) {
        let mut inner = self.inner.lock().unwrap();
        let source_id = view.source.id;
        inner.source_views.insert(source_id, view.clone());
        if let Some(subs) = inner.source_subs.get_mut(&source_id) {
            subs.retain(|tx| tx.send(view.clone()).is_ok());
        }
    }

    /// Push a new subscriptions-list snapshot.
    pub fn push_subscriptions(&self, entries: Vec<SubscriptionEntry>) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscriptions = Some(entries.clone());
        inner
            .subscription_subs
            .retain(|tx| tx.send(entries.clone()).is_ok());
    }

    /// Make an item resolvable through `resolve_item`.
    pub fn set_item(&self, item: ContentItem) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.insert(item.key(), item);
    }

    /// All `materialize` batches received so far.
    pub fn materialize_calls(&self) -> Vec<Vec<ItemKey>> {
        self.inner.lock().unwrap().materialized.clone()
    }

    /// All keys passed to `mark_seen` so far.
    pub fn seen_calls(&self) -> Vec<ItemKey> {
        self.inner.lock().unwrap().marked_seen.clone()
    }

    /// All `refresh_view_stats` batches received so far.
    pub fn refresh_calls(&self) -> Vec<(SourceId, Vec<ItemId>)> {
        self.inner.lock().unwrap().refreshed.clone()
    }

    /// All keys passed to `resolve_item` so far.
    pub fn resolve_calls(&self) -> Vec<ItemKey> {
        self.inner.lock().unwrap().resolved.clone()
    }

    /// Number of live subscribers for one source. Lets tests assert that a
    /// torn-down context actually dropped its subscription.
    pub fn subscriber_count(&self, source_id: SourceId) -> usize {
        let mut inner = self.inner.lock().unwrap();
        if let Some(subs) = inner.source_subs.get_mut(&source_id) {
            subs.retain(|tx| !tx.is_closed());
            subs.len()
        } else {
            0
        }
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    fn observe_source(&self, source_id: SourceId) -> BoxStream<'static, SourceView> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(view) = inner.source_views.get(&source_id) {
                let _ = tx.send(view.clone());
            }
            inner.source_subs.entry(source_id).or_default().push(tx);
        }
        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|view| (view, rx))
        })
        .boxed()
    }

    fn observe_subscriptions(&self) -> BoxStream<'static, Vec<SubscriptionEntry>> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(entries) = &inner.subscriptions {
                let _ = tx.send(entries.clone());
            }
            inner.subscription_subs.push(tx);
        }
        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|entries| (entries, rx))
        })
        .boxed()
    }

    async fn materialize(&self, keys: Vec<ItemKey>) -> Result<(), StoreError> {
        self.inner.lock().unwrap().materialized.push(keys);
        Ok(())
    }

    async fn resolve_item(&self, key: ItemKey) -> Result<Option<ContentItem>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.resolved.push(key);
        Ok(inner.items.get(&key).cloned())
    }

    async fn mark_seen(&self, key: ItemKey) -> Result<(), StoreError> {
        self.inner.lock().unwrap().marked_seen.push(key);
        Ok(())
    }

    async fn refresh_view_stats(
        &self,
        source_id: SourceId,
        item_ids: Vec<ItemId>,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().refreshed.push((source_id, item_ids));
        Ok(())
    }
}
