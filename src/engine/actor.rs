//! The engine actor.
//!
//! Every piece of mutable engine state lives here and is touched from
//! exactly one task: subscriptions, navigation commands, and background
//! completions are all redelivered as [`EngineMsg`]s and processed in
//! arrival order. That is the whole locking story.
//!
//! Window transitions follow the original state machine: a candidate
//! window is built as `pending`, promoted to `current` on the first update
//! where its central context is ready, and discarded wholesale if a newer
//! switch supersedes it first (last-writer-wins, no stale promotion).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::context::{Effects, OriginEntry, SourceContext, WindowContext};
use crate::error::StoreError;
use crate::models::{
    ContentItem, ForwardInfo, ItemId, ItemKey, MediaId, MediaRef, SourceId, SourceView,
    SubscriptionEntry,
};
use crate::ordering::OrderingPolicy;
use crate::traits::{ContentStore, FetchRequest, MediaFetcher};

use super::scheduler::{
    PollTracker, PrefetchScheduler, POLL_CANDIDATES, PREFETCH_CANDIDATES, PRELOAD_WINDOW_BYTES,
};
use super::{ContextState, Direction, EngineOptions, ItemNavigation, Navigation};

/// Everything the actor can be asked to process.
#[derive(Debug)]
pub(crate) enum EngineMsg {
    /// A subscriptions-list snapshot from the store.
    Subscriptions(Vec<SubscriptionEntry>),
    /// A source snapshot redelivered by a context's forwarder task.
    SourceView {
        source_id: SourceId,
        generation: u64,
        view: SourceView,
    },
    /// A forward-origin resolution completed.
    OriginResolved {
        key: ItemKey,
        outcome: Result<Option<ContentItem>, StoreError>,
    },
    PrefetchFinished(MediaId),
    PollFinished(Vec<ItemKey>),
    Command(Command),
}

#[derive(Debug)]
pub(crate) enum Command {
    Navigate(Navigation),
    MarkAsSeen(ItemKey),
    ResetSideStates,
    Shutdown,
}

pub(crate) struct EngineActor {
    store: Arc<dyn ContentStore>,
    fetcher: Arc<dyn MediaFetcher>,
    msg_tx: mpsc::UnboundedSender<EngineMsg>,
    state_tx: watch::Sender<ContextState>,

    ordering: OrderingPolicy,
    /// Latest ordered subscriptions list.
    entries: Option<Vec<SubscriptionEntry>>,
    /// The source (and optionally item) the next switch should focus.
    focused_target: Option<(SourceId, Option<ItemId>)>,

    contexts: HashMap<SourceId, SourceContext>,
    next_generation: u64,
    current: Option<WindowContext>,
    pending: Option<WindowContext>,

    /// Forward-origin cache. Outlives any individual source context.
    origins: HashMap<ItemKey, OriginEntry>,
    /// Placeholder keys already sent to `materialize`.
    requested_keys: HashSet<ItemKey>,

    prefetch: PrefetchScheduler,
    poll: PollTracker,

    subscriptions_task: Option<AbortHandle>,
}

impl EngineActor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn MediaFetcher>,
        options: EngineOptions,
        state_tx: watch::Sender<ContextState>,
        msg_tx: mpsc::UnboundedSender<EngineMsg>,
    ) -> Self {
        Self {
            store,
            fetcher,
            msg_tx,
            state_tx,
            ordering: OrderingPolicy::new(),
            entries: None,
            focused_target: options.initial_source.map(|id| (id, options.initial_item)),
            contexts: HashMap::new(),
            next_generation: 0,
            current: None,
            pending: None,
            origins: HashMap::new(),
            requested_keys: HashSet::new(),
            prefetch: PrefetchScheduler::default(),
            poll: PollTracker::default(),
            subscriptions_task: None,
        }
    }

    pub async fn run(mut self, mut msg_rx: mpsc::UnboundedReceiver<EngineMsg>) {
        self.subscribe_subscriptions();

        while let Some(msg) = msg_rx.recv().await {
            match msg {
                EngineMsg::Subscriptions(entries) => self.handle_subscriptions(entries),
                EngineMsg::SourceView {
                    source_id,
                    generation,
                    view,
                } => self.handle_source_view(source_id, generation, view),
                EngineMsg::OriginResolved { key, outcome } => {
                    self.handle_origin_resolved(key, outcome)
                }
                EngineMsg::PrefetchFinished(id) => self.prefetch.mark_finished(id),
                EngineMsg::PollFinished(keys) => self.poll.mark_finished(&keys),
                EngineMsg::Command(Command::Navigate(navigation)) => self.navigate(navigation),
                EngineMsg::Command(Command::MarkAsSeen(key)) => self.mark_as_seen(key),
                EngineMsg::Command(Command::ResetSideStates) => self.reset_side_states(),
                EngineMsg::Command(Command::Shutdown) => break,
            }
        }

        self.teardown();
    }

    fn subscribe_subscriptions(&mut self) {
        let mut stream = self.store.observe_subscriptions();
        let msg_tx = self.msg_tx.clone();
        let handle = tokio::spawn(async move {
            while let Some(entries) = stream.next().await {
                if msg_tx.send(EngineMsg::Subscriptions(entries)).is_err() {
                    break;
                }
            }
        });
        self.subscriptions_task = Some(handle.abort_handle());
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.subscriptions_task.take() {
            handle.abort();
        }
        for (_, ctx) in self.contexts.drain() {
            if let Some(forwarder) = ctx.forwarder {
                forwarder.abort();
            }
        }
        self.prefetch.shutdown();
        self.poll.shutdown();
        tracing::debug!("engine torn down");
    }

    fn target_source(&self) -> Option<SourceId> {
        self.focused_target.map(|(source_id, _)| source_id)
    }

    fn handle_subscriptions(&mut self, entries: Vec<SubscriptionEntry>) {
        let ordered = self.ordering.apply(&entries, self.target_source());
        self.entries = Some(ordered);
        // An active window is never rebuilt from under the viewer by a
        // subscriptions reshuffle. A still-pending one is: the rebuilt
        // window simply supersedes it (last-writer-wins).
        if self.current.is_none() {
            self.switch_to_focused_source();
        }
    }

    /// Build a pending window around the desired focused source and promote
    /// it once its central context is ready. Any previous pending window is
    /// discarded entirely.
    fn switch_to_focused_source(&mut self) {
        let entries = match &self.entries {
            Some(entries) if !entries.is_empty() => entries.clone(),
            _ => return,
        };

        let central_index = self
            .target_source()
            .and_then(|target| entries.iter().position(|entry| entry.source.id == target))
            .or_else(|| entries.iter().position(|entry| entry.has_unseen))
            .unwrap_or(0);

        let central_id = entries[central_index].source.id;
        let previous_id = central_index
            .checked_sub(1)
            .map(|index| entries[index].source.id);
        let next_id = entries.get(central_index + 1).map(|entry| entry.source.id);

        let initial_item = self
            .focused_target
            .and_then(|(source_id, item)| (source_id == central_id).then_some(item))
            .flatten();

        self.pending = None;
        self.ensure_context(central_id, initial_item);
        if let Some(id) = previous_id {
            self.ensure_context(id, None);
        }
        if let Some(id) = next_id {
            self.ensure_context(id, None);
        }

        tracing::debug!(
            central = central_id.0,
            previous = ?previous_id.map(|id| id.0),
            next = ?next_id.map(|id| id.0),
            "pending window built"
        );
        self.pending = Some(WindowContext::new(central_id, previous_id, next_id));
        self.gc_contexts();
        self.try_promote();
    }

    /// Reuse an existing context for this source or create one with a fresh
    /// subscription.
    fn ensure_context(&mut self, source_id: SourceId, initial_focus: Option<ItemId>) {
        if self.contexts.contains_key(&source_id) {
            if let Some(focus) = initial_focus {
                let effects = match self.contexts.get_mut(&source_id) {
                    Some(ctx) => ctx.set_focus(Some(focus), &self.origins),
                    None => return,
                };
                self.process_effects(source_id, effects);
            }
            return;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let mut ctx = SourceContext::new(source_id, generation, initial_focus);
        let mut stream = self.store.observe_source(source_id);
        let msg_tx = self.msg_tx.clone();
        let handle = tokio::spawn(async move {
            while let Some(view) = stream.next().await {
                let msg = EngineMsg::SourceView {
                    source_id,
                    generation,
                    view,
                };
                if msg_tx.send(msg).is_err() {
                    break;
                }
            }
        });
        ctx.forwarder = Some(handle.abort_handle());
        self.contexts.insert(source_id, ctx);
    }

    /// Drop contexts referenced by neither the current nor the pending
    /// window, cancelling their subscriptions.
    fn gc_contexts(&mut self) {
        let referenced: HashSet<SourceId> = self
            .current
            .iter()
            .chain(self.pending.iter())
            .flat_map(|window| window.members().collect::<Vec<_>>())
            .collect();

        self.contexts.retain(|source_id, ctx| {
            if referenced.contains(source_id) {
                true
            } else {
                tracing::debug!(source_id = source_id.0, "tearing down source context");
                if let Some(forwarder) = ctx.forwarder.take() {
                    forwarder.abort();
                }
                false
            }
        });
    }

    fn try_promote(&mut self) {
        let ready = self
            .pending
            .as_ref()
            .and_then(|window| self.contexts.get(&window.central))
            .is_some_and(|ctx| ctx.is_ready());
        if !ready {
            return;
        }

        if let Some(window) = self.pending.take() {
            tracing::debug!(central = window.central.0, "window promoted");
            self.current = Some(window);
            self.gc_contexts();
            self.publish_state();
            self.resync_background();
        }
    }

    fn handle_source_view(&mut self, source_id: SourceId, generation: u64, view: SourceView) {
        let effects = match self.contexts.get_mut(&source_id) {
            // Deliveries from a superseded subscription are dropped.
            Some(ctx) if ctx.generation == generation => ctx.apply_view(view, &self.origins),
            _ => return,
        };
        self.process_effects(source_id, effects);
    }

    /// Execute the side work a recomputation asked for, then promote and
    /// publish as appropriate.
    fn process_effects(&mut self, source_id: SourceId, effects: Effects) {
        let fresh_keys: Vec<ItemKey> = effects
            .materialize
            .into_iter()
            .filter(|key| self.requested_keys.insert(*key))
            .collect();
        if !fresh_keys.is_empty() {
            let store = self.store.clone();
            tokio::spawn(async move {
                if let Err(err) = store.materialize(fresh_keys).await {
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
                let _ = msg_tx.send(EngineMsg::OriginResolved { key, outcome });
            });
        }

        self.try_promote();
        if self
            .current
            .as_ref()
            .is_some_and(|window| window.contains(source_id))
        {
            if effects.changed {
                self.publish_state();
            }
            self.resync_background();
        }
    }

    fn handle_origin_resolved(
        &mut self,
        key: ItemKey,
        outcome: Result<Option<ContentItem>, StoreError>,
    ) {
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
                // Forget the entry so a later pass can retry.
                tracing::warn!(%err, "forward origin resolution failed");
                self.origins.remove(&key);
                return;
            }
        }

        let mut changed = false;
        for ctx in self.contexts.values_mut() {
            changed |= ctx.apply_origins(&self.origins);
        }
        if changed {
            self.publish_state();
        }
    }

    fn navigate(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::Item(nav) => self.navigate_item(nav),
            Navigation::Source(direction) => self.navigate_source(direction),
        }
    }

    fn navigate_item(&mut self, nav: ItemNavigation) {
        let Some(window) = &self.current else {
            return;
        };
        let central = window.central;
        let Some(ctx) = self.contexts.get_mut(&central) else {
            return;
        };
        let Some(slice) = ctx.slice() else {
            return;
        };

        let target = match nav {
            ItemNavigation::Previous => slice.previous_item_id,
            ItemNavigation::Next => slice.next_item_id,
            ItemNavigation::Id(id) => slice.contains_item(id).then_some(id),
        };
        // Walking past either end (or an unknown explicit id) is a no-op.
        let Some(id) = target else {
            return;
        };

        let effects = ctx.set_focus(Some(id), &self.origins);
        self.process_effects(central, effects);
    }

    fn navigate_source(&mut self, direction: Direction) {
        let Some(window) = &self.current else {
            return;
        };
        let side = match direction {
            Direction::Previous => window.previous,
            Direction::Next => window.next,
        };
        let Some(side_id) = side else {
            return;
        };
        // The side must have produced a slice before it can become central.
        let ready = self
            .contexts
            .get(&side_id)
            .is_some_and(|ctx| ctx.is_ready() && ctx.slice().is_some());
        if !ready {
            return;
        }

        self.pending = None;
        self.focused_target = Some((side_id, None));
        self.switch_to_focused_source();
    }

    fn mark_as_seen(&self, key: ItemKey) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.mark_seen(key).await {
                tracing::warn!(%err, "mark-as-seen failed");
            }
        });
    }

    fn reset_side_states(&mut self) {
        let sides: Vec<SourceId> = match &self.current {
            Some(window) => window.previous.into_iter().chain(window.next).collect(),
            None => return,
        };
        for source_id in sides {
            let effects = match self.contexts.get_mut(&source_id) {
                Some(ctx) => ctx.set_focus(None, &self.origins),
                None => continue,
            };
            self.process_effects(source_id, effects);
        }
    }

    fn publish_state(&self) {
        let state = self
            .current
            .as_ref()
            .map(|window| ContextState {
                previous: window
                    .previous
                    .and_then(|id| self.contexts.get(&id))
                    .and_then(|ctx| ctx.slice().cloned()),
                central: self
                    .contexts
                    .get(&window.central)
                    .and_then(|ctx| ctx.slice().cloned()),
                next: window
                    .next
                    .and_then(|id| self.contexts.get(&id))
                    .and_then(|ctx| ctx.slice().cloned()),
            })
            .unwrap_or_default();

        self.state_tx.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }

    /// Recompute the desired prefetch and poll sets and converge the
    /// background trackers onto them.
    fn resync_background(&mut self) {
        // (prefer_high_quality, item) pairs: the central context's remaining
        // lookahead, then the next source's focused item and its lookahead.
        // The focused item goes ahead of the next lookahead so a source hop
        // lands on media that is already warm.
        let mut upcoming: Vec<(bool, ContentItem)> = Vec::new();
        if let Some(window) = &self.current {
            if let Some(slice) = self.contexts.get(&window.central).and_then(|ctx| ctx.slice()) {
                for item in &slice.lookahead {
                    upcoming.push((slice.source.prefer_high_quality, item.clone()));
                }
            }
            if let Some(slice) = window
                .next
                .and_then(|id| self.contexts.get(&id))
                .and_then(|ctx| ctx.slice())
            {
                upcoming.push((slice.source.prefer_high_quality, slice.item.clone()));
                for item in &slice.lookahead {
                    upcoming.push((slice.source.prefer_high_quality, item.clone()));
                }
            }
        }

        let mut requests: Vec<FetchRequest> = Vec::new();
        let mut seen_media: HashSet<MediaId> = HashSet::new();
        for (priority, (prefer_high_quality, item)) in
            upcoming.iter().take(PREFETCH_CANDIDATES).enumerate()
        {
            let media = item.media_for_quality(*prefer_high_quality).clone();
            if seen_media.insert(media.id) {
                requests.push(FetchRequest {
                    range: media.kind.is_video().then(|| 0..PRELOAD_WINDOW_BYTES),
                    media,
                    priority: priority as u32,
                });
            }
            // Reaction assets are deduplicated globally across candidates.
            for reaction in item.reaction_assets() {
                let asset = reaction.asset();
                if seen_media.insert(asset) {
                    requests.push(FetchRequest {
                        media: MediaRef::photo(asset),
                        range: None,
                        priority: priority as u32,
                    });
                }
            }
        }
        self.prefetch.sync(requests, &self.fetcher, &self.msg_tx);

        // Metadata polling covers only upcoming self-owned items.
        let poll_keys: Vec<ItemKey> = upcoming
            .iter()
            .filter(|(_, item)| item.is_my)
            .take(POLL_CANDIDATES)
            .map(|(_, item)| item.key())
            .collect();
        self.poll.sync(poll_keys, &self.store, &self.msg_tx);
    }
}
