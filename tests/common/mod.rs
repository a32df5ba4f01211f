//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;

use glimpse::models::{
    ContentItem, ItemEntry, ItemId, MediaId, MediaRef, Source, SourceId, SourceView,
    SubscriptionEntry,
};
use glimpse::ContextState;

/// Install a test-friendly tracing subscriber (RUST_LOG-controlled).
/// Safe to call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ts(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
}

pub fn source(id: i64) -> Source {
    Source::new(SourceId(id), format!("source-{id}"))
}

pub fn subscription(id: i64, has_unseen: bool) -> SubscriptionEntry {
    SubscriptionEntry::new(source(id), has_unseen)
}

/// A photo item whose media id is `source_id * 1000 + item_id`.
pub fn item(source_id: i64, item_id: i64) -> ContentItem {
    ContentItem::new(
        SourceId(source_id),
        ItemId(item_id),
        ts(item_id),
        MediaRef::photo(MediaId(source_id * 1000 + item_id)),
    )
}

/// A view over fully materialized photo items.
pub fn view(source_id: i64, item_ids: &[i64]) -> SourceView {
    let mut v = SourceView::new(source(source_id));
    v.entries = item_ids
        .iter()
        .map(|&id| ItemEntry::Item(item(source_id, id)))
        .collect();
    v
}

/// Wait (bounded) until the published state satisfies `predicate`, and
/// return the first snapshot that does.
pub async fn wait_for_state<F>(
    rx: &mut watch::Receiver<ContextState>,
    predicate: F,
) -> ContextState
where
    F: Fn(&ContextState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = rx.borrow_and_update().clone();
                if predicate(&state) {
                    return state;
                }
            }
            rx.changed().await.expect("engine dropped its state sender");
        }
    })
    .await
    .expect("timed out waiting for engine state")
}

/// Wait (bounded) until `condition` holds.
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

/// Give in-flight engine tasks a chance to run, for negative assertions.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
