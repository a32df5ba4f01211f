//! Subscription ordering policy.
//!
//! The backing store delivers the subscriptions list in whatever order it
//! pleases, and keeps reordering it as sources gain and lose unseen
//! content. Browsing needs a stable sequence: once a source has a position
//! it keeps it for the whole session, and a session that started on unseen
//! content only admits sources that still have something unseen.

use std::collections::HashMap;

use crate::models::{SourceId, SubscriptionEntry};

/// Session-stable ordering of the subscriptions list.
///
/// The `started_with_unseen` decision is captured on the very first pass
/// and never recomputed. A source filtered out by it stays out unless it
/// later shows up as a new source carrying unseen content; a source once
/// admitted is never dropped by the filter, only by disappearing from the
/// store's list entirely.
#[derive(Debug, Default)]
pub struct OrderingPolicy {
    started_with_unseen: Option<bool>,
    fixed_order: Vec<SourceId>,
}

impl OrderingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session-start decision has been made, and what it was.
    pub fn started_with_unseen(&self) -> Option<bool> {
        self.started_with_unseen
    }

    /// Order the raw entry list. `target` is the source that will become
    /// focused, when the caller knows it ahead of time; it steers the
    /// one-time `started_with_unseen` decision.
    ///
    /// Deterministic and idempotent: re-running with an unchanged input
    /// list returns an identical output.
    pub fn apply(
        &mut self,
        entries: &[SubscriptionEntry],
        target: Option<SourceId>,
    ) -> Vec<SubscriptionEntry> {
        if self.started_with_unseen.is_none() && !entries.is_empty() {
            let focus_entry = target
                .and_then(|id| entries.iter().find(|entry| entry.source.id == id))
                .or_else(|| entries.iter().find(|entry| entry.has_unseen))
                .or_else(|| entries.first());
            self.started_with_unseen = Some(focus_entry.is_some_and(|entry| entry.has_unseen));
            tracing::debug!(
                started_with_unseen = self.started_with_unseen,
                "ordering session decision captured"
            );
        }
        let unseen_filter = self.started_with_unseen.unwrap_or(false);

        let by_id: HashMap<SourceId, &SubscriptionEntry> = entries
            .iter()
            .map(|entry| (entry.source.id, entry))
            .collect();

        // Previously admitted sources keep their relative position, even if
        // they have become seen since admission.
        let mut order: Vec<SourceId> = self
            .fixed_order
            .iter()
            .filter(|id| by_id.contains_key(id))
            .copied()
            .collect();

        // Newly appeared sources are appended, subject to the unseen filter
        // on first admission.
        for entry in entries {
            if order.contains(&entry.source.id) {
                continue;
            }
            if unseen_filter && !entry.has_unseen {
                continue;
            }
            order.push(entry.source.id);
        }

        self.fixed_order = order.clone();
        order
            .into_iter()
            .map(|id| (*by_id[&id]).clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    fn entry(id: i64, has_unseen: bool) -> SubscriptionEntry {
        SubscriptionEntry::new(Source::new(SourceId(id), format!("source-{id}")), has_unseen)
    }

    fn ids(entries: &[SubscriptionEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.source.id.0).collect()
    }

    #[test]
    fn test_ordering_is_idempotent() {
        let mut policy = OrderingPolicy::new();
        let input = vec![entry(1, true), entry(2, false), entry(3, true)];

        let first = policy.apply(&input, None);
        let second = policy.apply(&input, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unseen_session_filters_initial_pass() {
        let mut policy = OrderingPolicy::new();
        let input = vec![entry(1, true), entry(2, false), entry(3, true)];

        let ordered = policy.apply(&input, None);
        assert_eq!(ids(&ordered), vec![1, 3]);
        assert_eq!(policy.started_with_unseen(), Some(true));
    }

    #[test]
    fn test_seen_session_admits_everything() {
        let mut policy = OrderingPolicy::new();
        // Target source has nothing unseen, so the session is not
        // unseen-filtered even though other sources have unseen content.
        let input = vec![entry(1, true), entry(2, false)];

        let ordered = policy.apply(&input, Some(SourceId(2)));
        assert_eq!(ids(&ordered), vec![1, 2]);
        assert_eq!(policy.started_with_unseen(), Some(false));
    }

    #[test]
    fn test_admitted_source_survives_becoming_seen() {
        let mut policy = OrderingPolicy::new();
        let first = vec![entry(1, true), entry(2, true)];
        policy.apply(&first, None);

        // Source 2 became seen mid-session; it must not vanish.
        let second = vec![entry(1, true), entry(2, false)];
        let ordered = policy.apply(&second, None);
        assert_eq!(ids(&ordered), vec![1, 2]);
    }

    #[test]
    fn test_dropped_source_stays_out_once_seen() {
        let mut policy = OrderingPolicy::new();
        // Source 2 is seen at session start of an unseen-first session.
        policy.apply(&[entry(1, true), entry(2, false)], None);

        // It shows up again, still seen: remains excluded.
        let ordered = policy.apply(&[entry(1, true), entry(2, false)], None);
        assert_eq!(ids(&ordered), vec![1]);

        // But if it re-acquires unseen content it is admitted as new.
        let ordered = policy.apply(&[entry(1, true), entry(2, true)], None);
        assert_eq!(ids(&ordered), vec![1, 2]);
    }

    #[test]
    fn test_new_sources_append_at_end() {
        let mut policy = OrderingPolicy::new();
        policy.apply(&[entry(2, true), entry(1, true)], None);

        let ordered = policy.apply(&[entry(3, true), entry(2, true), entry(1, true)], None);
        assert_eq!(ids(&ordered), vec![2, 1, 3]);
    }

    #[test]
    fn test_store_reorder_does_not_reorder_session() {
        let mut policy = OrderingPolicy::new();
        policy.apply(&[entry(1, true), entry(2, true), entry(3, true)], None);

        // The store reshuffles; the session order holds.
        let ordered = policy.apply(&[entry(3, true), entry(1, true), entry(2, true)], None);
        assert_eq!(ids(&ordered), vec![1, 2, 3]);
    }
}
