//! Integration tests for background convergence: media prefetch for
//! upcoming items and view-statistics polling for the viewer's own items.

mod common;

use std::sync::Arc;

use glimpse::adapters::mock::{MockContentStore, MockMediaFetcher};
use glimpse::models::{
    ItemEntry, ItemId, MediaId, MediaRef, OverlayRegion, ReactionRef, SourceId,
};
use glimpse::{ContentContext, EngineOptions, ItemNavigation, Navigation, WindowedContext};

use common::{item, settle, subscription, view, wait_for_state, wait_until};

fn engine(store: &MockContentStore, fetcher: &MockMediaFetcher) -> WindowedContext {
    common::init_tracing();
    WindowedContext::new(
        Arc::new(store.clone()),
        Arc::new(fetcher.clone()),
        EngineOptions::default(),
    )
}

fn media_ids(ids: &[i64]) -> std::collections::HashSet<MediaId> {
    ids.iter().map(|&id| MediaId(id)).collect()
}

#[tokio::test]
async fn test_prefetch_converges_onto_lookahead() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true)]);
    store.push_source(view(1, &[1, 2, 3, 4, 5, 6]));

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;

    // Focus on item 1: the three nearest upcoming items are fetching.
    wait_until(|| fetcher.active_ids() == media_ids(&[1002, 1003, 1004])).await;

    // Advancing shifts the set: 1002 is cancelled, 1003 and 1004 keep
    // running, 1005 starts. Nothing is restarted.
    ctx.navigate(Navigation::Item(ItemNavigation::Next));
    wait_until(|| fetcher.active_ids() == media_ids(&[1003, 1004, 1005])).await;
    assert_eq!(fetcher.started().len(), 4);

    // Priorities follow candidate order.
    for request in fetcher.started() {
        let expected = match request.media.id.0 {
            1002 => 0,
            1003 => 1,
            1004 => 2,
            1005 => 2,
            other => panic!("unexpected prefetch for media {other}"),
        };
        assert_eq!(request.priority, expected);
    }
}

#[tokio::test]
async fn test_completed_prefetch_not_reissued() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true)]);
    store.push_source(view(1, &[1, 2]));

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;
    wait_until(|| fetcher.active_ids() == media_ids(&[1002])).await;

    fetcher.complete(MediaId(1002));
    wait_until(|| fetcher.active_ids().is_empty()).await;

    // Another recomputation with the same desired set does not restart it.
    ctx.navigate(Navigation::Item(ItemNavigation::Id(ItemId(1))));
    settle().await;
    assert_eq!(fetcher.started().len(), 1);
}

#[tokio::test]
async fn test_video_prefetch_requests_preload_window() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true)]);

    let mut v = view(1, &[1]);
    let mut video_item = item(1, 2);
    video_item.media = MediaRef::video(MediaId(555), 12.0);
    v.entries.push(ItemEntry::Item(video_item));
    store.push_source(v);

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;

    wait_until(|| !fetcher.started().is_empty()).await;
    let request = &fetcher.started()[0];
    assert_eq!(request.media.id, MediaId(555));
    // Videos fetch a fixed-size prefix, not the full resource.
    assert_eq!(request.range, Some(0..512 * 1024));
}

#[tokio::test]
async fn test_low_quality_preference_fetches_alt_media() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true)]);

    let mut v = view(1, &[1]);
    v.source.prefer_high_quality = false;
    let mut upcoming = item(1, 2);
    upcoming.alt_media = Some(MediaRef::photo(MediaId(42)));
    v.entries.push(ItemEntry::Item(upcoming));
    store.push_source(v);

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;

    wait_until(|| fetcher.active_ids() == media_ids(&[42])).await;
}

#[tokio::test]
async fn test_reaction_assets_fetched_once_across_candidates() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true)]);

    let mut v = view(1, &[1]);
    for id in [2, 3] {
        let mut upcoming = item(1, id);
        upcoming
            .overlays
            .push(OverlayRegion::reaction(ReactionRef::built_in(
                "heart",
                MediaId(77),
            )));
        v.entries.push(ItemEntry::Item(upcoming));
    }
    store.push_source(v);

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;

    // Both upcoming items reference the same reaction asset; it is fetched
    // exactly once, alongside their primary media.
    wait_until(|| fetcher.active_ids() == media_ids(&[1002, 1003, 77])).await;
    let asset_requests = fetcher
        .started()
        .iter()
        .filter(|r| r.media.id == MediaId(77))
        .count();
    assert_eq!(asset_requests, 1);
}

#[tokio::test]
async fn test_next_source_is_primed() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true), subscription(2, true)]);
    store.push_source(view(1, &[1]));
    store.push_source(view(2, &[10, 11]));

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some() && s.next.is_some()).await;

    // Source 1 has nothing upcoming; the next source's focused item and
    // lookahead fill the candidate list.
    wait_until(|| fetcher.active_ids() == media_ids(&[2010, 2011])).await;
}

#[tokio::test]
async fn test_view_stats_polled_for_own_upcoming_items() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true)]);

    let mut v = view(1, &[1]);
    for id in [2, 3] {
        let mut upcoming = item(1, id);
        upcoming.is_my = true;
        v.entries.push(ItemEntry::Item(upcoming));
    }
    store.push_source(v);

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;

    wait_until(|| !store.refresh_calls().is_empty()).await;
    assert_eq!(
        store.refresh_calls(),
        vec![(SourceId(1), vec![ItemId(2), ItemId(3)])]
    );

    // Still-desired completed polls are not re-issued by later passes.
    ctx.navigate(Navigation::Item(ItemNavigation::Next));
    settle().await;
    assert_eq!(store.refresh_calls().len(), 1);
}

#[tokio::test]
async fn test_shutdown_cancels_inflight_prefetch() {
    let store = MockContentStore::new();
    let fetcher = MockMediaFetcher::new();
    store.push_subscriptions(vec![subscription(1, true)]);
    store.push_source(view(1, &[1, 2]));

    let ctx = engine(&store, &fetcher);
    let mut rx = ctx.state();
    wait_for_state(&mut rx, |s| s.central.is_some()).await;
    wait_until(|| !fetcher.active_ids().is_empty()).await;

    drop(ctx);
    wait_until(|| fetcher.active_ids().is_empty()).await;
}
