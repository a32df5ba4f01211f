//! Degenerate contexts: one item, or one source's full list.
//!
//! Both implement [`ContentContext`](super::ContentContext) so the
//! presentation layer is indifferent to which engine variant is driving
//! it. Neither carries a window, so source navigation is a no-op and only
//! the `central` slot of the published state is ever populated.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::context::{Effects, OriginEntry, SourceContext};
use crate::error::StoreError;
use crate::models::{
    ContentItem, FocusedSlice, ForwardInfo, ForwardOrigin, ItemId, ItemKey, Source, SourceId,
    SourceView,
};
use crate::traits::ContentStore;

use super::{ContentContext, ContextState, ItemNavigation, Navigation};

/// A context pinned to exactly one item, resolved once on construction.
///
/// Used when the viewer opens a single shared item rather than browsing:
/// no subscriptions, no window, no prefetch. The state carries one central
/// slice once the item resolves, and stays empty if it does not exist.
pub struct SingleItemContext {
    store: Arc<dyn ContentStore>,
    state_rx: watch::Receiver<ContextState>,
    task: AbortHandle,
}

impl SingleItemContext {
    pub fn new(store: Arc<dyn ContentStore>, source: Source, key: ItemKey) -> Self {
        let (state_tx, state_rx) = watch::channel(ContextState::default());

        let task_store = store.clone();
        let handle = tokio::spawn(async move {
            let item = match task_store.resolve_item(key).await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    tracing::debug!(
                        source_id = key.source_id.0,
                        item_id = key.item_id.0,
                        "single item does not exist"
                    );
                    return;
                }
                Err(err) => {
                    tracing::warn!(%err, "single item resolution failed");
                    return;
                }
            };

            let origins = resolve_origin(&task_store, &item).await;
            let _ = state_tx.send(ContextState {
                previous: None,
                central: Some(single_slice(source, item, origins)),
                next: None,
            });
        });

        Self {
            store,
            state_rx,
            task: handle.abort_handle(),
        }
    }
}

impl Drop for SingleItemContext {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ContentContext for SingleItemContext {
    fn state(&self) -> watch::Receiver<ContextState> {
        self.state_rx.clone()
    }

    /// There is nowhere to navigate to.
    fn navigate(&self, _navigation: Navigation) {}

    fn mark_as_seen(&self, key: ItemKey) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.mark_seen(key).await {
                tracing::warn!(%err, "mark-as-seen failed");
            }
        });
    }

    fn reset_side_states(&self) {}
}

/// If the item was forwarded and its origin is unresolved, resolve it so
/// the slice can show both ends.
async fn resolve_origin(
    store: &Arc<dyn ContentStore>,
    item: &ContentItem,
) -> HashMap<ItemKey, Option<ForwardInfo>> {
    let mut origins = HashMap::new();
    if let Some(origin) = &item.forward_origin {
        let key = origin.key();
        let info = match origin {
            ForwardOrigin::Resolved(info) => Some(info.clone()),
            ForwardOrigin::Unresolved(_) => match store.resolve_item(key).await {
                Ok(Some(origin_item)) => Some(ForwardInfo {
                    key,
                    item: Box::new(origin_item),
                }),
                Ok(None) => None,
                Err(err) => {
                    tracing::warn!(%err, "forward origin resolution failed");
                    None
                }
            },
        };
        origins.insert(key, info);
    }
    origins
}

fn single_slice(
    source: Source,
    item: ContentItem,
    forward_origins: HashMap<ItemKey, Option<ForwardInfo>>,
) -> FocusedSlice {
    FocusedSlice {
        source,
        all_items: vec![item.clone()],
        item,
        position: 0,
        total_count: 1,
        previous_item_id: None,
        next_item_id: None,
        lookahead: Vec::new(),
        forward_origins,
    }
}

enum ListMsg {
    View { generation: u64, view: SourceView },
    OriginResolved {
        key: ItemKey,
        outcome: Result<Option<ContentItem>, StoreError>,
    },
    Navigate(ItemNavigation),
    MarkAsSeen(ItemKey),
}

/// A context browsing one source's full item list, including expired
/// items, with no triple window around it.
///
/// Runs the same per-source resolution machinery as the windowed engine:
/// pending merge, focus remap, placeholder materialization, and
/// forward-origin resolution all behave identically.
pub struct SourceListContext {
    msg_tx: mpsc::UnboundedSender<ListMsg>,
    state_rx: watch::Receiver<ContextState>,
}

impl SourceListContext {
    pub fn new(
        store: Arc<dyn ContentStore>,
        source_id: SourceId,
        initial_item: Option<ItemId>,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ContextState::default());

        let actor = ListActor {
            store,
            msg_tx: msg_tx.clone(),
            state_tx,
            ctx: SourceContext::new(source_id, 0, initial_item),
            origins: HashMap::new(),
        };
        tokio::spawn(actor.run(msg_rx));

        Self { msg_tx, state_rx }
    }
}

impl ContentContext for SourceListContext {
    fn state(&self) -> watch::Receiver<ContextState> {
        self.state_rx.clone()
    }

    fn navigate(&self, navigation: Navigation) {
        if let Navigation::Item(nav) = navigation {
            let _ = self.msg_tx.send(ListMsg::Navigate(nav));
        }
    }

    fn mark_as_seen(&self, key: ItemKey) {
        let _ = self.msg_tx.send(ListMsg::MarkAsSeen(key));
    }

    fn reset_side_states(&self) {}
}

struct ListActor {
    store: Arc<dyn ContentStore>,
    msg_tx: mpsc::UnboundedSender<ListMsg>,
    state_tx: watch::Sender<ContextState>,
    ctx: SourceContext,
    origins: HashMap<ItemKey, OriginEntry>,
}

impl ListActor {
    async fn run(mut self, mut msg_rx: mpsc::UnboundedReceiver<ListMsg>) {
        let mut stream = self.store.observe_source(self.ctx.source_id);
        let msg_tx = self.msg_tx.clone();
        let generation = self.ctx.generation;
        let forwarder = tokio::spawn(async move {
            while let Some(view) = stream.next().await {
                if msg_tx.send(ListMsg::View { generation, view }).is_err() {
                    break;
                }
            }
        });

        // Runs until the owning `SourceListContext` drops its sender.
        while let Some(msg) = msg_rx.recv().await {
            match msg {
                ListMsg::View { generation, view } => {
                    if generation != self.ctx.generation {
                        continue;
                    }
                    let effects = self.ctx.apply_view(view, &self.origins);
                    self.process_effects(effects);
                }
                ListMsg::OriginResolved { key, outcome } => self.handle_origin(key, outcome),
                ListMsg::Navigate(nav) => self.navigate(nav),
                ListMsg::MarkAsSeen(key) => {
                    let store = self.store.clone();
                    tokio::spawn(async move {
                        if let Err(err) = store.mark_seen(key).await {
                            tracing::warn!(%err, "mark-as-seen failed");
                        }
                    });
                }
            }
        }

        forwarder.abort();
    }

    fn navigate(&mut self, nav: ItemNavigation) {
        let Some(slice) = self.ctx.slice() else {
            return;
        };
        let target = match nav {
            ItemNavigation::Previous => slice.previous_item_id,
            ItemNavigation::Next => slice.next_item_id,
            ItemNavigation::Id(id) => slice.contains_item(id).then_some(id),
        };
        let Some(id) = target else {
            return;
        };
        let effects = self.ctx.set_focus(Some(id), &self.origins);
        self.process_effects(effects);
    }

    fn process_effects(&mut self, effects: Effects) {
        if !effects.materialize.is_empty() {
            let store = self.store.clone();
            let keys = effects.materialize;
            tokio::spawn(async move {
                if let Err(err) = store.materialize(keys).await {
                    tracing::warn!(%err, "placeholder materialization failed");
                }
            });
        }

        for key in effects.resolve_origins {
            if self.origins.contains_key(&key) {
                continue;
            }
            self.origins.insert(key, OriginEntry::Loading);
            let store = self.store.clone();
            let msg_tx = self.msg_tx.clone();
            tokio::spawn(async move {
                let outcome = store.resolve_item(key).await;
                let _ = msg_tx.send(ListMsg::OriginResolved { key, outcome });
            });
        }

        if effects.changed {
            self.publish();
        }
    }

    fn handle_origin(&mut self, key: ItemKey, outcome: Result<Option<ContentItem>, StoreError>) {
        match outcome {
            Ok(Some(item)) => {
                let info = ForwardInfo {
                    key,
                    item: Box::new(item),
                };
                self.origins.insert(key, OriginEntry::Ready(info));
            }
            Ok(None) => {
                self.origins.insert(key, OriginEntry::Missing);
            }
            Err(err) => {
                tracing::warn!(%err, "forward origin resolution failed");
                self.origins.remove(&key);
                return;
            }
        }
        if self.ctx.apply_origins(&self.origins) {
            self.publish();
        }
    }

    fn publish(&self) {
        let state = ContextState {
            previous: None,
            central: self.ctx.slice().cloned(),
            next: None,
        };
        self.state_tx.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }
}
