//! Value types shared across the engine.
//!
//! Everything in here is an immutable snapshot: the backing store (or the
//! local pending layer) produces new values, the engine never edits them in
//! place.

mod item;
mod slice;
mod source;
mod subscription;

pub use item::{
    ContentItem, ForwardInfo, ForwardOrigin, ItemEntry, ItemId, ItemKey, MediaId, MediaKind,
    MediaRef, OverlayPayload, OverlayRegion, PendingItem, PrivacyScope, ReactionRef, SourceId,
    SubmissionId, TextEntity, TextEntityKind, ViewStats,
};
pub use slice::FocusedSlice;
pub use source::{Presence, Source};
pub use subscription::{SourceView, SubscriptionEntry};
