//! Source identity and capabilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceId;

/// Presence of a source, as last reported by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Presence {
    #[default]
    Unknown,
    Online,
    Offline,
}

/// A publisher of a sequence of ephemeral content items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub is_muted: bool,
    pub presence: Presence,
    /// Last time presence was observed, when known.
    pub presence_updated_at: Option<DateTime<Utc>>,
    pub supports_voice_messages: bool,
    /// Whether the viewer may see aggregate view statistics.
    pub stats_visible: bool,
    pub premium_required: bool,
    /// Session-scoped quality preference: when false, items prefetch their
    /// lower-fidelity alternative media when one exists.
    pub prefer_high_quality: bool,
}

impl Source {
    pub fn new(id: SourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_muted: false,
            presence: Presence::Unknown,
            presence_updated_at: None,
            supports_voice_messages: false,
            stats_visible: true,
            premium_required: false,
            prefer_high_quality: true,
        }
    }
}
