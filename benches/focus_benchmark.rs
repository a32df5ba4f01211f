//! Performance benchmarks for focus resolution and subscription ordering
//!
//! Both run on every store push, so they must stay cheap even for large
//! item lists. Run with: cargo bench

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use glimpse::focus::{self, FocusContext};
use glimpse::models::{
    ContentItem, ItemEntry, ItemId, MediaId, MediaRef, Source, SourceId, SubscriptionEntry,
};
use glimpse::ordering::OrderingPolicy;

fn entries(count: usize) -> Vec<ItemEntry> {
    (0..count)
        .map(|i| {
            ItemEntry::Item(ContentItem::new(
                SourceId(1),
                ItemId(i as i64 + 1),
                Utc::now(),
                MediaRef::photo(MediaId(i as i64 + 1000)),
            ))
        })
        .collect()
}

/// Benchmark focus resolution for varying list sizes
fn bench_focus_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("focus_resolve");

    for size in [10, 100, 1_000].iter() {
        let old_list = entries(*size);
        // The focused item vanished: exercises the backward walk.
        let mut new_list = old_list.clone();
        new_list.remove(*size / 2);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_items", size)),
            &(*size),
            |b, size| {
                let ctx = FocusContext {
                    desired: Some(ItemId(*size as i64 / 2 + 1)),
                    desired_ever_set: true,
                    stored: Some(ItemId(*size as i64 / 2 + 1)),
                    old_list: &old_list,
                    new_list: &new_list,
                    max_read_id: ItemId(0),
                };
                b.iter(|| black_box(focus::resolve(black_box(&ctx))));
            },
        );
    }

    group.finish();
}

fn subscriptions(count: usize) -> Vec<SubscriptionEntry> {
    (0..count)
        .map(|i| {
            SubscriptionEntry::new(
                Source::new(SourceId(i as i64), format!("source-{i}")),
                i % 3 != 0,
            )
        })
        .collect()
}

/// Benchmark subscription ordering on a warm policy
fn bench_ordering_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordering_apply");

    for size in [10, 100, 1_000].iter() {
        let input = subscriptions(*size);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_sources", size)),
            &input,
            |b, input| {
                let mut policy = OrderingPolicy::new();
                policy.apply(input, None);
                b.iter(|| black_box(policy.apply(black_box(input), None)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_focus_resolve, bench_ordering_apply);
criterion_main!(benches);
