//! Media fetch trait abstraction.

use std::ops::Range;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::models::{MediaId, MediaRef};

/// Local availability of a media resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    /// Fully present in the local cache.
    Available,
    /// A prefix of this many bytes is present.
    Partial(u64),
    Missing,
}

/// One prefetch request handed to the media collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub media: MediaRef,
    /// When set, only this byte range is wanted (video preload window).
    pub range: Option<Range<u64>>,
    /// 0 is most urgent; candidates are ranked strictly by order.
    pub priority: u32,
}

/// Trait for the durable media cache collaborator.
///
/// `prefetch` completes when the requested bytes are locally available.
/// Cancellation is cooperative: the engine aborts the task driving the
/// future when the resource is no longer wanted.
#[async_trait]
pub trait MediaFetcher: Send + Sync + 'static {
    /// Fetch (part of) a media resource into the local cache.
    async fn prefetch(&self, request: FetchRequest) -> Result<(), FetchError>;

    /// Current local availability of a resource.
    fn availability(&self, media_id: MediaId) -> Availability;
}
