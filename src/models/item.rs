//! Content items and their identity types.
//!
//! An item is identified by `(source_id, item_id)` where `item_id` is
//! monotonically increasing per source. That ordering is the only ordering
//! key the engine relies on. Locally pending items carry a temporary id and
//! a `SubmissionId` that links them to the confirmed item the store later
//! produces.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a content source (a publisher of items).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct SourceId(pub i64);

/// Identifier of one item within a source. Monotonically increasing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ItemId(pub i64);

/// Identifier of a media resource. This is the prefetch key: background
/// fetch operations are deduplicated and cancelled by media identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct MediaId(pub i64);

/// Locally generated identity of a pending upload, stable across the
/// temporary-id to permanent-id transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    /// Generate a fresh submission id for a new local upload.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Fully qualified item identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub source_id: SourceId,
    pub item_id: ItemId,
}

impl ItemKey {
    pub fn new(source_id: SourceId, item_id: ItemId) -> Self {
        Self { source_id, item_id }
    }
}

/// What kind of media a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video { duration_secs: f64 },
}

impl MediaKind {
    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video { .. })
    }
}

/// Reference to a media resource held by the media cache collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: MediaId,
    pub kind: MediaKind,
    /// Total size when known; used only as a hint, never trusted.
    pub size_bytes: Option<u64>,
}

impl MediaRef {
    pub fn photo(id: MediaId) -> Self {
        Self {
            id,
            kind: MediaKind::Photo,
            size_bytes: None,
        }
    }

    pub fn video(id: MediaId, duration_secs: f64) -> Self {
        Self {
            id,
            kind: MediaKind::Video { duration_secs },
            size_bytes: None,
        }
    }
}

/// A rich-text entity over a span of the item caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntity {
    pub offset: usize,
    pub length: usize,
    pub kind: TextEntityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextEntityKind {
    Bold,
    Italic,
    Link { url: String },
    Mention { source_id: SourceId },
    /// Inline custom emoji, rendered from an auxiliary media resource.
    CustomEmoji { media_id: MediaId },
}

/// A reaction referenced by an interactive overlay region. Both variants
/// render from a media asset; built-in reactions additionally carry their
/// well-known name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionRef {
    /// One of the built-in reactions, addressed by name.
    BuiltIn { name: String, asset: MediaId },
    /// A custom-emoji reaction backed by a media resource.
    Custom { asset: MediaId },
}

impl ReactionRef {
    pub fn built_in(name: impl Into<String>, asset: MediaId) -> Self {
        ReactionRef::BuiltIn {
            name: name.into(),
            asset,
        }
    }

    /// The media resource to prefetch so the reaction can render.
    pub fn asset(&self) -> MediaId {
        match self {
            ReactionRef::BuiltIn { asset, .. } => *asset,
            ReactionRef::Custom { asset } => *asset,
        }
    }
}

/// Payload attached to an interactive overlay region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayPayload {
    Reaction(ReactionRef),
    /// Cross-reference to another message.
    MessageRef(ItemKey),
}

/// An interactive region laid over the media, in unit coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub payload: Option<OverlayPayload>,
}

impl OverlayRegion {
    pub fn reaction(reaction: ReactionRef) -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            width: 0.2,
            height: 0.2,
            rotation: 0.0,
            payload: Some(OverlayPayload::Reaction(reaction)),
        }
    }
}

/// Who is allowed to view an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PrivacyScope {
    #[default]
    Everyone,
    Contacts,
    CloseFriends,
    SelectedOnly,
}

/// Aggregate view statistics for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ViewStats {
    pub seen_count: u64,
    pub reaction_count: u64,
    pub forward_count: u64,
    /// Sample of viewers, most recent first.
    pub seen_by: Vec<SourceId>,
}

/// Materialized information about where a forwarded item came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardInfo {
    pub key: ItemKey,
    /// Full snapshot of the origin item, fetched on demand.
    pub item: Box<ContentItem>,
}

/// A forward-origin reference on an item. May be known only by key,
/// requiring an async fetch to materialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForwardOrigin {
    Unresolved(ItemKey),
    Resolved(ForwardInfo),
}

impl ForwardOrigin {
    /// The origin key, whether or not it has been materialized yet.
    pub fn key(&self) -> ItemKey {
        match self {
            ForwardOrigin::Unresolved(key) => *key,
            ForwardOrigin::Resolved(info) => info.key,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ForwardOrigin::Resolved(_))
    }
}

/// One ephemeral content item, as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub source_id: SourceId,
    pub id: ItemId,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Primary (full quality) media.
    pub media: MediaRef,
    /// Lower-fidelity alternative, used when the quality preference is off.
    pub alt_media: Option<MediaRef>,
    pub text: String,
    pub entities: Vec<TextEntity>,
    pub overlays: Vec<OverlayRegion>,
    pub privacy: PrivacyScope,
    pub is_pinned: bool,
    pub is_expired: bool,
    pub is_public: bool,
    /// Locally created, not yet confirmed by the backing store.
    pub is_pending: bool,
    pub forwarding_disabled: bool,
    pub is_edited: bool,
    /// Authored by the viewer.
    pub is_my: bool,
    pub views: Option<ViewStats>,
    pub forward_origin: Option<ForwardOrigin>,
    /// Links a confirmed item back to the local submission it confirms.
    pub submission_id: Option<SubmissionId>,
}

impl ContentItem {
    /// A minimal item; tests and fixtures fill in the rest as needed.
    pub fn new(source_id: SourceId, id: ItemId, timestamp: DateTime<Utc>, media: MediaRef) -> Self {
        Self {
            source_id,
            id,
            timestamp,
            expires_at: timestamp + Duration::hours(24),
            media,
            alt_media: None,
            text: String::new(),
            entities: Vec::new(),
            overlays: Vec::new(),
            privacy: PrivacyScope::Everyone,
            is_pinned: false,
            is_expired: false,
            is_public: false,
            is_pending: false,
            forwarding_disabled: false,
            is_edited: false,
            is_my: false,
            views: None,
            forward_origin: None,
            submission_id: None,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.source_id, self.id)
    }

    /// The media to prefetch for this item, honoring the source's session
    /// quality preference.
    pub fn media_for_quality(&self, prefer_high_quality: bool) -> &MediaRef {
        if prefer_high_quality {
            &self.media
        } else {
            self.alt_media.as_ref().unwrap_or(&self.media)
        }
    }

    /// All reaction assets referenced by this item's overlay regions,
    /// deduplicated within the item.
    pub fn reaction_assets(&self) -> Vec<ReactionRef> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for overlay in &self.overlays {
            if let Some(OverlayPayload::Reaction(reaction)) = &overlay.payload {
                if seen.insert(reaction.clone()) {
                    out.push(reaction.clone());
                }
            }
        }
        out
    }
}

/// One element of a source's item list as delivered by the backing store:
/// either a fully materialized item or a lightweight placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemEntry {
    Placeholder { id: ItemId, timestamp: DateTime<Utc> },
    Item(ContentItem),
}

impl ItemEntry {
    pub fn id(&self) -> ItemId {
        match self {
            ItemEntry::Placeholder { id, .. } => *id,
            ItemEntry::Item(item) => item.id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ItemEntry::Placeholder { timestamp, .. } => *timestamp,
            ItemEntry::Item(item) => item.timestamp,
        }
    }

    pub fn as_item(&self) -> Option<&ContentItem> {
        match self {
            ItemEntry::Placeholder { .. } => None,
            ItemEntry::Item(item) => Some(item),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ItemEntry::Placeholder { .. })
    }
}

/// A locally created item awaiting confirmation by the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingItem {
    /// Temporary local id, valid until the store assigns a permanent one.
    pub local_id: ItemId,
    pub submission_id: SubmissionId,
    pub item: ContentItem,
}

impl PendingItem {
    /// Wrap an item as a local pending submission. The item is stamped
    /// pending and linked to a fresh submission id.
    pub fn new(local_id: ItemId, mut item: ContentItem) -> Self {
        let submission_id = SubmissionId::generate();
        item.id = local_id;
        item.is_pending = true;
        item.submission_id = Some(submission_id);
        Self {
            local_id,
            submission_id,
            item,
        }
    }
}
