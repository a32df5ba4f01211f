//! Integration tests for the degenerate contexts and forward-origin
//! resolution.

mod common;

use std::sync::Arc;

use glimpse::adapters::mock::{MockContentStore, MockMediaFetcher};
use glimpse::models::{ForwardOrigin, ItemId, ItemKey, SourceId};
use glimpse::{
    ContentContext, Direction, EngineOptions, ItemNavigation, Navigation, SingleItemContext,
    SourceListContext, WindowedContext,
};

use common::{item, settle, source, subscription, view, wait_for_state, wait_until};

#[tokio::test]
async fn test_single_item_context_resolves_and_publishes() {
    let store = MockContentStore::new();
    store.set_item(item(1, 5));

    let key = ItemKey::new(SourceId(1), ItemId(5));
    let ctx = SingleItemContext::new(Arc::new(store.clone()), source(1), key);
    let mut rx = ctx.state();

    let state = wait_for_state(&mut rx, |s| s.central.is_some()).await;
    let central = state.central.unwrap();
    assert_eq!(central.item.id, ItemId(5));
    assert_eq!(central.total_count, 1);
    assert!(central.previous_item_id.is_none());
    assert!(central.next_item_id.is_none());
    assert!(state.previous.is_none() && state.next.is_none());

    // Navigation has nowhere to go.
    ctx.navigate(Navigation::Item(ItemNavigation::Next));
    ctx.navigate(Navigation::Source(Direction::Next));
    settle().await;
    assert_eq!(rx.borrow().central.as_ref().unwrap().item.id, ItemId(5));

    ctx.mark_as_seen(key);
    wait_until(|| store.seen_calls().contains(&key)).await;
}

#[tokio::test]
async fn test_single_item_context_missing_item_stays_empty() {
    let store = MockContentStore::new();
    let key = ItemKey::new(SourceId(1), ItemId(5));
    let ctx = SingleItemContext::new(Arc::new(store.clone()), source(1), key);
    let rx = ctx.state();

    wait_until(|| store.resolve_calls().contains(&key)).await;
    settle().await;
    assert!(rx.borrow().central.is_none());
}

#[tokio::test]
async fn test_single_item_context_resolves_forward_origin() {
    let store = MockContentStore::new();
    let origin_key = ItemKey::new(SourceId(9), ItemId(4));
    store.set_item(item(9, 4));

    let mut forwarded = item(1, 5);
    forwarded.forward_origin = Some(ForwardOrigin::Unresolved(origin_key));
    store.set_item(forwarded);

    let key = ItemKey::new(SourceId(1), ItemId(5));
    let ctx = SingleItemContext::new(Arc::new(store.clone()), source(1), key);
    let mut rx = ctx.state();

    let state = wait_for_state(&mut rx, |s| s.central.is_some()).await;
    let origins = &state.central.unwrap().forward_origins;
    let info = origins.get(&origin_key).unwrap().as_ref().unwrap();
    assert_eq!(info.item.id, ItemId(4));
}

#[tokio::test]
async fn test_source_list_context_browses_full_list() {
    let store = MockContentStore::new();
    store.push_source(view(1, &[1, 2, 3]));

    let ctx = SourceListContext::new(Arc::new(store.clone()), SourceId(1), Some(ItemId(2)));
    let mut rx = ctx.state();

    let state = wait_for_state(&mut rx, |s| s.central.is_some()).await;
    let central = state.central.unwrap();
    assert_eq!(central.item.id, ItemId(2));
    assert_eq!(central.total_count, 3);

    ctx.navigate(Navigation::Item(ItemNavigation::Next));
    wait_for_state(&mut rx, |s| {
        s.central.as_ref().is_some_and(|c| c.item.id == ItemId(3))
    })
    .await;

    // No window: source navigation is meaningless here.
    ctx.navigate(Navigation::Source(Direction::Next));
    settle().await;
    assert_eq!(rx.borrow().central.as_ref().unwrap().item.id, ItemId(3));

    let key = ItemKey::new(SourceId(1), ItemId(3));
    ctx.mark_as_seen(key);
    wait_until(|| store.seen_calls().contains(&key)).await;
}

#[tokio::test]
async fn test_source_list_context_follows_store_updates() {
    let store = MockContentStore::new();
    store.push_source(view(1, &[1, 2]));

    let ctx = SourceListContext::new(Arc::new(store.clone()), SourceId(1), None);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;

    store.push_source(view(1, &[1, 2, 3]));
    wait_for_state(&mut rx, |s| {
        s.central.as_ref().is_some_and(|c| c.total_count == 3)
    })
    .await;
}

#[tokio::test]
async fn test_windowed_engine_resolves_forward_origin() {
    let store = MockContentStore::new();
    let origin_key = ItemKey::new(SourceId(9), ItemId(4));
    store.set_item(item(9, 4));

    store.push_subscriptions(vec![subscription(1, true)]);
    let mut v = view(1, &[]);
    let mut forwarded = item(1, 1);
    forwarded.forward_origin = Some(ForwardOrigin::Unresolved(origin_key));
    v.entries = vec![glimpse::models::ItemEntry::Item(forwarded)];
    store.push_source(v);

    let ctx = WindowedContext::new(
        Arc::new(store.clone()),
        Arc::new(MockMediaFetcher::new()),
        EngineOptions::default(),
    );
    let mut rx = ctx.state();

    // The slice appears without waiting for the origin.
    wait_for_state(&mut rx, |s| s.central.is_some()).await;

    // And fills in once the resolution lands.
    let state = wait_for_state(&mut rx, |s| {
        s.central
            .as_ref()
            .is_some_and(|c| matches!(c.forward_origins.get(&origin_key), Some(Some(_))))
    })
    .await;
    let origins = state.central.unwrap().forward_origins;
    assert_eq!(
        origins.get(&origin_key).unwrap().as_ref().unwrap().item.id,
        ItemId(4)
    );
    assert_eq!(store.resolve_calls(), vec![origin_key]);
}
