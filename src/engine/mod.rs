//! The engine's public surface.
//!
//! A content context produces a stream of [`ContextState`] snapshots and
//! accepts navigation commands. Three implementations conform:
//!
//! - [`WindowedContext`] - the full triple-window engine (previous /
//!   central / next source, cross-source navigation, prefetch, polling);
//! - [`SingleItemContext`] - views exactly one item;
//! - [`SourceListContext`] - browses one source's full item list.
//!
//! The latter two are degenerate cases of the same state machine.

mod actor;
mod scheduler;
mod single;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::models::{FocusedSlice, ItemId, ItemKey, SourceId};
use crate::traits::{ContentStore, MediaFetcher};

use actor::{Command, EngineActor, EngineMsg};

pub use single::{SingleItemContext, SourceListContext};

/// Snapshot of the full window, as consumed by the presentation layer.
/// Absent slices mean "still loading" (or no such neighbor), never an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextState {
    pub previous: Option<FocusedSlice>,
    pub central: Option<FocusedSlice>,
    pub next: Option<FocusedSlice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Previous,
    Next,
}

/// Navigation within the central source's item sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemNavigation {
    Previous,
    Next,
    /// Jump to an explicit id; honored only if the id is among the central
    /// slice's known items.
    Id(ItemId),
}

/// A navigation command from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Navigation {
    Item(ItemNavigation),
    Source(Direction),
}

/// Construction options for the windowed engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// The source to focus first; defaults to first-unseen, else first.
    pub initial_source: Option<SourceId>,
    /// The item to focus first within the initial source.
    pub initial_item: Option<ItemId>,
}

/// A producer of [`ContextState`] snapshots that accepts navigation.
///
/// Commands are fire-and-forget: they are serialized onto the context's
/// internal execution context and absorbed if it has shut down.
pub trait ContentContext: Send + Sync {
    /// The state stream. The receiver always holds the latest snapshot.
    fn state(&self) -> watch::Receiver<ContextState>;

    fn navigate(&self, navigation: Navigation);

    /// Notify the backing store that an item was seen. Not retried;
    /// idempotent at the store.
    fn mark_as_seen(&self, key: ItemKey);

    /// Clear focus overrides on the side contexts so they resolve from
    /// scratch if they later become central.
    fn reset_side_states(&self);
}

/// The full windowed engine. See the crate docs for the state machine.
pub struct WindowedContext {
    msg_tx: mpsc::UnboundedSender<EngineMsg>,
    state_rx: watch::Receiver<ContextState>,
}

impl WindowedContext {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn MediaFetcher>,
        options: EngineOptions,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ContextState::default());

        let actor = EngineActor::new(store, fetcher, options, state_tx, msg_tx.clone());
        tokio::spawn(actor.run(msg_rx));

        Self { msg_tx, state_rx }
    }

    /// Stop the engine: cancels every subscription and background fetch.
    pub fn shutdown(&self) {
        let _ = self.msg_tx.send(EngineMsg::Command(Command::Shutdown));
    }
}

impl Drop for WindowedContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ContentContext for WindowedContext {
    fn state(&self) -> watch::Receiver<ContextState> {
        self.state_rx.clone()
    }

    fn navigate(&self, navigation: Navigation) {
        let _ = self
            .msg_tx
            .send(EngineMsg::Command(Command::Navigate(navigation)));
    }

    fn mark_as_seen(&self, key: ItemKey) {
        let _ = self
            .msg_tx
            .send(EngineMsg::Command(Command::MarkAsSeen(key)));
    }

    fn reset_side_states(&self) {
        let _ = self
            .msg_tx
            .send(EngineMsg::Command(Command::ResetSideStates));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, ForwardInfo, MediaRef, Source};
    use chrono::Utc;

    // Consumers ship snapshots across process boundaries; the wire shape
    // is part of the contract.
    #[test]
    fn test_context_state_survives_serialization() {
        let source = Source::new(SourceId(1), "one");
        let item = ContentItem::new(
            SourceId(1),
            ItemId(3),
            Utc::now(),
            MediaRef::video(crate::models::MediaId(30), 7.5),
        );
        let origin_key = ItemKey::new(SourceId(9), ItemId(90));
        let origin_item = ContentItem::new(
            SourceId(9),
            ItemId(90),
            Utc::now(),
            MediaRef::photo(crate::models::MediaId(900)),
        );
        let forward_origins = [
            (
                origin_key,
                Some(ForwardInfo {
                    key: origin_key,
                    item: Box::new(origin_item),
                }),
            ),
            // An in-flight resolution crosses the wire too.
            (ItemKey::new(SourceId(9), ItemId(91)), None),
        ]
        .into_iter()
        .collect();
        let state = ContextState {
            previous: None,
            central: Some(FocusedSlice {
                source,
                all_items: vec![item.clone()],
                item,
                position: 0,
                total_count: 1,
                previous_item_id: None,
                next_item_id: None,
                lookahead: Vec::new(),
                forward_origins,
            }),
            next: None,
        };

        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: ContextState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }
}
