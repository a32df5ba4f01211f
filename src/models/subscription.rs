//! Push payloads delivered by the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemEntry, ItemId, PendingItem, Source};

/// One source as known to the subscriptions list: enough to order the
/// browsing sequence and pick an initial focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEntry {
    pub source: Source,
    pub has_unseen: bool,
    pub has_pending: bool,
    pub item_count: usize,
    pub last_timestamp: DateTime<Utc>,
}

impl SubscriptionEntry {
    pub fn new(source: Source, has_unseen: bool) -> Self {
        Self {
            source,
            has_unseen,
            has_pending: false,
            item_count: 0,
            last_timestamp: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// One push of a source's full state: the ordered item list (confirmed and
/// placeholder entries), the max-read marker, and local pending uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceView {
    pub source: Source,
    /// Item entries in ascending item-id order.
    pub entries: Vec<ItemEntry>,
    /// Highest item id the viewer has already seen.
    pub max_read_id: ItemId,
    /// Local submissions not yet confirmed by the store.
    pub pending: Vec<PendingItem>,
}

impl SourceView {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            entries: Vec::new(),
            max_read_id: ItemId(0),
            pending: Vec::new(),
        }
    }
}
