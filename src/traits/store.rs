//! Backing store trait abstraction.
//!
//! The store is push-based: subscriptions deliver a full snapshot on every
//! change and keep delivering until the returned stream is dropped. Dropping
//! the stream is the cancellation handle.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::models::{ContentItem, ItemId, ItemKey, SourceId, SourceView, SubscriptionEntry};

/// Trait for the reactive backing store.
///
/// Streams returned by the `observe_*` methods emit the current value
/// immediately (once it exists) and then every subsequent change. A source
/// with no data yet simply does not emit; the engine models that as
/// "not ready", never as an error.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Continuously observe one source: its item list (confirmed and
    /// placeholder entries), max-read marker, and local pending submissions.
    fn observe_source(&self, source_id: SourceId) -> BoxStream<'static, SourceView>;

    /// Continuously observe the raw, possibly-reordered subscriptions list.
    fn observe_subscriptions(&self) -> BoxStream<'static, Vec<SubscriptionEntry>>;

    /// Ask the store to materialize placeholder entries into full items.
    /// Results arrive through the relevant `observe_source` streams.
    async fn materialize(&self, keys: Vec<ItemKey>) -> Result<(), StoreError>;

    /// Resolve one item's full metadata on demand (used for forward-origin
    /// references). `Ok(None)` means the item does not exist.
    async fn resolve_item(&self, key: ItemKey) -> Result<Option<ContentItem>, StoreError>;

    /// Record that the viewer has seen an item. Idempotent at the store;
    /// the engine fires and forgets.
    async fn mark_seen(&self, key: ItemKey) -> Result<(), StoreError>;

    /// Ask the store to refresh view statistics for the given self-owned
    /// items. Updated stats arrive through `observe_source`.
    async fn refresh_view_stats(
        &self,
        source_id: SourceId,
        item_ids: Vec<ItemId>,
    ) -> Result<(), StoreError>;
}
