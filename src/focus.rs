//! Focus resolution.
//!
//! When a source's item list changes underneath the viewer, the engine must
//! decide which item is focused in the new list without tearing focus away.
//! The precedence is an explicit ordered strategy chain rather than nested
//! conditionals, so each rule is testable in isolation:
//!
//! 1. the desired focused id, if still present;
//! 2. a pending focused id remapped to its permanent id by submission;
//! 3. the nearest earlier surviving id, walking backward in the old list;
//! 4. (only when no desired id was ever set) first pending item, else first
//!    unread item, else index 0;
//! 5. nothing: the list is empty or the desired id is unresolvable.

use crate::models::{ItemEntry, ItemId};

/// Everything a strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct FocusContext<'a> {
    /// Currently desired focused id, when one is set.
    pub desired: Option<ItemId>,
    /// Whether an explicit desired id was ever set for this context.
    pub desired_ever_set: bool,
    /// The id resolved on the previous pass, if any.
    pub stored: Option<ItemId>,
    /// The merged item list the previous pass resolved against.
    pub old_list: &'a [ItemEntry],
    /// The merged item list to resolve against now.
    pub new_list: &'a [ItemEntry],
    /// Highest item id the viewer has read in this source.
    pub max_read_id: ItemId,
}

/// A successful resolution: an index into the new list, plus the permanent
/// id to rewrite the desired focus to when a pending id was remapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub index: usize,
    pub remapped_desired: Option<ItemId>,
}

impl Resolution {
    fn at(index: usize) -> Self {
        Self {
            index,
            remapped_desired: None,
        }
    }
}

type Strategy = fn(&FocusContext<'_>) -> Option<Resolution>;

/// The precedence chain. Order is the contract.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("desired-present", desired_present),
    ("pending-remap", pending_remap),
    ("nearest-earlier", nearest_earlier),
    ("default-entry", default_entry),
];

/// Run the chain; the first strategy that produces a resolution wins.
pub fn resolve(ctx: &FocusContext<'_>) -> Option<Resolution> {
    for (name, strategy) in STRATEGIES {
        if let Some(resolution) = strategy(ctx) {
            tracing::trace!(strategy = name, index = resolution.index, "focus resolved");
            return Some(resolution);
        }
    }
    None
}

fn position_of(list: &[ItemEntry], id: ItemId) -> Option<usize> {
    list.iter().position(|entry| entry.id() == id)
}

/// Rule 1: the desired id still exists in the new list.
fn desired_present(ctx: &FocusContext<'_>) -> Option<Resolution> {
    let desired = ctx.desired?;
    position_of(ctx.new_list, desired).map(Resolution::at)
}

/// Rule 2: the focused id (desired, or the previously resolved one)
/// referred to a pending item in the old list; find the confirmed item for
/// the same submission in the new list.
fn pending_remap(ctx: &FocusContext<'_>) -> Option<Resolution> {
    let anchor = ctx.desired.or(ctx.stored)?;
    let old_entry = ctx
        .old_list
        .iter()
        .find(|entry| entry.id() == anchor)?
        .as_item()?;
    if !old_entry.is_pending {
        return None;
    }
    let submission_id = old_entry.submission_id?;
    let index = ctx.new_list.iter().position(|entry| {
        entry
            .as_item()
            .and_then(|item| item.submission_id)
            .is_some_and(|sid| sid == submission_id)
    })?;
    Some(Resolution {
        index,
        // Only an explicit desired id needs rewriting.
        remapped_desired: ctx.desired.map(|_| ctx.new_list[index].id()),
    })
}

/// Rule 3: walk backward from the previously focused position in the old
/// list and take the nearest earlier id that survived into the new list.
fn nearest_earlier(ctx: &FocusContext<'_>) -> Option<Resolution> {
    let stored = ctx.stored?;
    let old_position = position_of(ctx.old_list, stored)?;
    for index in (0..=old_position).rev() {
        let candidate = ctx.old_list[index].id();
        if let Some(new_index) = position_of(ctx.new_list, candidate) {
            return Some(Resolution::at(new_index));
        }
    }
    None
}

/// Rule 4: cold start, no explicit desired id was ever set. Prefer the
/// first pending item, else the first item past the last-read marker, else
/// the first item.
fn default_entry(ctx: &FocusContext<'_>) -> Option<Resolution> {
    if ctx.desired_ever_set {
        return None;
    }
    if let Some(index) = ctx
        .new_list
        .iter()
        .position(|entry| entry.as_item().is_some_and(|item| item.is_pending))
    {
        return Some(Resolution::at(index));
    }
    if let Some(index) = ctx
        .new_list
        .iter()
        .position(|entry| entry.id() > ctx.max_read_id)
    {
        return Some(Resolution::at(index));
    }
    if ctx.new_list.is_empty() {
        None
    } else {
        Some(Resolution::at(0))
    }
}
