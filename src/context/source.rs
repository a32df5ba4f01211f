//! Per-source context: resolves the focused item of one source and derives
//! its consumer-facing slice.
//!
//! A `SourceContext` is plain state owned by the engine actor. The actor
//! feeds it `SourceView` snapshots (redelivered from a spawned forwarder
//! task) and focus mutations; recomputation is synchronous and returns an
//! [`Effects`] value describing the side work the actor should kick off.

use std::collections::{HashMap, HashSet};

use tokio::task::AbortHandle;

use crate::focus::{self, FocusContext};
use crate::models::{
    ForwardInfo, FocusedSlice, ItemEntry, ItemId, ItemKey, SourceId, SourceView, SubmissionId,
};

/// How many upcoming items the lookahead list exposes to the scheduler.
const LOOKAHEAD_COUNT: usize = 4;

/// Placeholders within this many positions of the focus get materialized.
const PLACEHOLDER_RADIUS: usize = 2;

/// State of one forward-origin cache entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OriginEntry {
    /// A resolution fetch is in flight.
    Loading,
    Ready(ForwardInfo),
    /// The origin does not exist; absence, not an error.
    Missing,
}

/// Side work requested by a recomputation pass.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Effects {
    /// The slice (or readiness) changed and consumers should be notified.
    pub changed: bool,
    /// Placeholder entries near the focus to materialize.
    pub materialize: Vec<ItemKey>,
    /// Forward-origin keys that need a resolution fetch.
    pub resolve_origins: Vec<ItemKey>,
}

pub(crate) struct SourceContext {
    pub source_id: SourceId,
    /// Subscription generation; deliveries from an older forwarder are
    /// discarded by the actor.
    pub generation: u64,
    /// Aborting this cancels the backing-store subscription.
    pub forwarder: Option<AbortHandle>,

    desired_focus: Option<ItemId>,
    desired_ever_set: bool,
    stored_focus: Option<ItemId>,
    view: Option<SourceView>,
    merged: Vec<ItemEntry>,
    slice: Option<FocusedSlice>,
    ready: bool,
}

impl SourceContext {
    pub fn new(source_id: SourceId, generation: u64, initial_focus: Option<ItemId>) -> Self {
        Self {
            source_id,
            generation,
            forwarder: None,
            desired_focus: initial_focus,
            desired_ever_set: initial_focus.is_some(),
            stored_focus: None,
            view: None,
            merged: Vec::new(),
            slice: None,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn slice(&self) -> Option<&FocusedSlice> {
        self.slice.as_ref()
    }

    /// Apply a fresh snapshot from the backing store.
    pub fn apply_view(
        &mut self,
        view: SourceView,
        origins: &HashMap<ItemKey, OriginEntry>,
    ) -> Effects {
        self.view = Some(view);
        self.recompute(origins)
    }

    /// Mutate the desired focused id. `None` clears the override entirely so
    /// the next resolution starts from scratch (used by `reset_side_states`).
    pub fn set_focus(
        &mut self,
        focus: Option<ItemId>,
        origins: &HashMap<ItemKey, OriginEntry>,
    ) -> Effects {
        match focus {
            Some(id) => {
                self.desired_focus = Some(id);
                self.desired_ever_set = true;
            }
            None => {
                self.desired_focus = None;
                self.desired_ever_set = false;
                self.stored_focus = None;
            }
        }
        self.recompute(origins)
    }

    /// Refresh the slice's forward-origin map after the engine-level cache
    /// changed. Returns whether the slice changed.
    pub fn apply_origins(&mut self, origins: &HashMap<ItemKey, OriginEntry>) -> bool {
        let Some(slice) = &mut self.slice else {
            return false;
        };
        let refreshed = origin_map(&slice.all_items, origins);
        if refreshed != slice.forward_origins {
            slice.forward_origins = refreshed;
            true
        } else {
            false
        }
    }

    fn recompute(&mut self, origins: &HashMap<ItemKey, OriginEntry>) -> Effects {
        let Some(view) = &self.view else {
            // No data yet: not ready, nothing to do.
            return Effects::default();
        };

        let merged = merge_items(view);
        let resolution = focus::resolve(&FocusContext {
            desired: self.desired_focus,
            desired_ever_set: self.desired_ever_set,
            stored: self.stored_focus,
            old_list: &self.merged,
            new_list: &merged,
            max_read_id: view.max_read_id,
        });

        let mut effects = Effects::default();
        let was_ready = self.ready;
        let mut new_slice = self.slice.clone();

        match resolution {
            None => {
                // List empty or desired id unresolvable: absent slice, but
                // the source has reported in, so it is ready.
                self.stored_focus = None;
                new_slice = None;
                self.ready = true;
            }
            Some(res) => {
                if let Some(remapped) = res.remapped_desired {
                    tracing::debug!(
                        source_id = self.source_id.0,
                        old = ?self.desired_focus,
                        new = remapped.0,
                        "pending focus remapped to permanent id"
                    );
                    self.desired_focus = Some(remapped);
                }
                let entry = &merged[res.index];
                self.stored_focus = Some(entry.id());

                effects.materialize =
                    placeholder_keys(self.source_id, &merged, res.index, PLACEHOLDER_RADIUS);

                if let Some(item) = entry.as_item() {
                    let all_items: Vec<_> =
                        merged.iter().filter_map(|e| e.as_item().cloned()).collect();
                    let lookahead: Vec<_> = merged[res.index + 1..]
                        .iter()
                        .filter_map(|e| e.as_item().cloned())
                        .take(LOOKAHEAD_COUNT)
                        .collect();

                    effects.resolve_origins =
                        unresolved_origin_keys(item, &lookahead, origins);

                    new_slice = Some(FocusedSlice {
                        source: view.source.clone(),
                        item: item.clone(),
                        position: res.index,
                        total_count: merged.len(),
                        previous_item_id: (res.index > 0).then(|| merged[res.index - 1].id()),
                        next_item_id: merged.get(res.index + 1).map(|e| e.id()),
                        forward_origins: origin_map(&all_items, origins),
                        all_items,
                        lookahead,
                    });
                    self.ready = true;
                } else {
                    // Focus landed on a placeholder: keep the previous slice
                    // until materialization arrives.
                }
            }
        }

        self.merged = merged;
        effects.changed = new_slice != self.slice || (self.ready && !was_ready);
        self.slice = new_slice;
        effects
    }
}

/// Merge confirmed entries with local pending items. Confirmed entries keep
/// the store's id order untouched; each pending item is slotted in before
/// the first entry with a later timestamp. A pending item already confirmed
/// (same submission id present among the confirmed items) is dropped.
fn merge_items(view: &SourceView) -> Vec<ItemEntry> {
    let confirmed: HashSet<SubmissionId> = view
        .entries
        .iter()
        .filter_map(|entry| entry.as_item().and_then(|item| item.submission_id))
        .collect();

    let mut merged = view.entries.clone();
    for pending in view
        .pending
        .iter()
        .filter(|pending| !confirmed.contains(&pending.submission_id))
    {
        let entry = ItemEntry::Item(pending.item.clone());
        let at = merged
            .iter()
            .position(|existing| existing.timestamp() > entry.timestamp())
            .unwrap_or(merged.len());
        merged.insert(at, entry);
    }
    merged
}

/// Placeholder entries within `radius` positions of the focus.
fn placeholder_keys(
    source_id: SourceId,
    merged: &[ItemEntry],
    focus_index: usize,
    radius: usize,
) -> Vec<ItemKey> {
    let start = focus_index.saturating_sub(radius);
    let end = (focus_index + radius).min(merged.len().saturating_sub(1));
    merged[start..=end]
        .iter()
        .filter(|entry| entry.is_placeholder())
        .map(|entry| ItemKey::new(source_id, entry.id()))
        .collect()
}

/// Origin keys of the focused item and its lookahead that have no cache
/// entry yet.
fn unresolved_origin_keys(
    focused: &crate::models::ContentItem,
    lookahead: &[crate::models::ContentItem],
    origins: &HashMap<ItemKey, OriginEntry>,
) -> Vec<ItemKey> {
    let mut keys = Vec::new();
    for item in std::iter::once(focused).chain(lookahead.iter()) {
        if let Some(origin) = &item.forward_origin {
            let key = origin.key();
            if !origin.is_resolved() && !origins.contains_key(&key) && !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Forward-origin view for a slice: everything the cache currently knows
/// about the origins referenced by `items`. `None` marks an origin that is
/// still loading (or known missing).
fn origin_map(
    items: &[crate::models::ContentItem],
    origins: &HashMap<ItemKey, OriginEntry>,
) -> HashMap<ItemKey, Option<ForwardInfo>> {
    let mut map = HashMap::new();
    for item in items {
        if let Some(origin) = &item.forward_origin {
            let key = origin.key();
            let value = match origin {
                crate::models::ForwardOrigin::Resolved(info) => Some(info.clone()),
                crate::models::ForwardOrigin::Unresolved(_) => match origins.get(&key) {
                    Some(OriginEntry::Ready(info)) => Some(info.clone()),
                    _ => None,
                },
            };
            map.insert(key, value);
        }
    }
    map
}
