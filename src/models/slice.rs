//! The consumer-facing snapshot of one source's current focus.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ContentItem, ForwardInfo, ItemId, ItemKey, Source};

/// Derived view of one source: the focused item plus its neighborhood.
/// Rebuilt in full on every recomputation, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusedSlice {
    pub source: Source,
    pub item: ContentItem,
    /// Index of the focused item in the merged list.
    pub position: usize,
    pub total_count: usize,
    pub previous_item_id: Option<ItemId>,
    pub next_item_id: Option<ItemId>,
    /// Every materialized item of the merged list, ascending by id with
    /// pending items merged in timestamp order.
    pub all_items: Vec<ContentItem>,
    /// Up to four upcoming items in this source, for the prefetch scheduler.
    pub lookahead: Vec<ContentItem>,
    /// Forward-origin resolutions for items in this slice. `None` means a
    /// fetch is in flight; resolution never blocks slice emission.
    #[serde(with = "origin_pairs")]
    pub forward_origins: HashMap<ItemKey, Option<ForwardInfo>>,
}

/// JSON maps take string keys only, so the origin map crosses the wire as a
/// sequence of `(key, resolution)` pairs.
mod origin_pairs {
    use super::{ForwardInfo, HashMap, ItemKey};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        map: &HashMap<ItemKey, Option<ForwardInfo>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<HashMap<ItemKey, Option<ForwardInfo>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(ItemKey, Option<ForwardInfo>)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl FocusedSlice {
    /// Whether an explicit item id refers to something this slice knows.
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.all_items.iter().any(|item| item.id == id)
    }
}
