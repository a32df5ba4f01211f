//! Mock media fetcher for testing.
//!
//! By default a prefetch never completes on its own: it registers itself as
//! active and parks until the test calls [`MockMediaFetcher::complete`] (or
//! the engine aborts it). That makes cancellation-by-diffing observable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::FetchError;
use crate::models::MediaId;
use crate::traits::{Availability, FetchRequest, MediaFetcher};

#[derive(Default)]
struct Inner {
    started: Mutex<Vec<FetchRequest>>,
    active: Mutex<HashMap<MediaId, Arc<Notify>>>,
    availability: Mutex<HashMap<MediaId, Availability>>,
    complete_immediately: AtomicBool,
}

/// Removes the fetch from the active set when the driving task is aborted
/// or the fetch completes.
struct ActiveGuard {
    id: MediaId,
    inner: Arc<Inner>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.inner.active.lock().unwrap().remove(&self.id);
    }
}

/// Mock media cache that records every fetch start and exposes the live
/// active set.
#[derive(Clone, Default)]
pub struct MockMediaFetcher {
    inner: Arc<Inner>,
}

impl MockMediaFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every prefetch resolve immediately instead of parking.
    pub fn complete_immediately(&self) {
        self.inner.complete_immediately.store(true, Ordering::SeqCst);
    }

    /// Complete one parked fetch.
    pub fn complete(&self, media_id: MediaId) {
        if let Some(notify) = self.inner.active.lock().unwrap().get(&media_id) {
            notify.notify_one();
        }
    }

    /// Every fetch request that was ever started, in start order.
    pub fn started(&self) -> Vec<FetchRequest> {
        self.inner.started.lock().unwrap().clone()
    }

    /// Media ids with a fetch currently in flight.
    pub fn active_ids(&self) -> HashSet<MediaId> {
        self.inner.active.lock().unwrap().keys().copied().collect()
    }

    pub fn set_availability(&self, media_id: MediaId, availability: Availability) {
        self.inner
            .availability
            .lock()
            .unwrap()
            .insert(media_id, availability);
    }
}

#[async_trait]
impl MediaFetcher for MockMediaFetcher {
    async fn prefetch(&self, request: FetchRequest) -> Result<(), FetchError> {
        let id = request.media.id;
        self.inner.started.lock().unwrap().push(request);

        if self.inner.complete_immediately.load(Ordering::SeqCst) {
            return Ok(());
        }

        let notify = Arc::new(Notify::new());
        self.inner
            .active
            .lock()
            .unwrap()
            .insert(id, notify.clone());
        let _guard = ActiveGuard {
            id,
            inner: self.inner.clone(),
        };
        notify.notified().await;
        Ok(())
    }

    fn availability(&self, media_id: MediaId) -> Availability {
        self.inner
            .availability
            .lock()
            .unwrap()
            .get(&media_id)
            .copied()
            .unwrap_or(Availability::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaRef;

    fn request(id: i64) -> FetchRequest {
        FetchRequest {
            media: MediaRef::photo(MediaId(id)),
            range: None,
            priority: 0,
        }
    }

    #[tokio::test]
    async fn test_prefetch_parks_until_completed() {
        let fetcher = MockMediaFetcher::new();
        let handle = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.prefetch(request(1)).await })
        };

        // Wait until the fetch registers as active.
        while fetcher.active_ids().is_empty() {
            tokio::task::yield_now().await;
        }
        fetcher.complete(MediaId(1));
        handle.await.unwrap().unwrap();
        assert!(fetcher.active_ids().is_empty());
    }

    #[tokio::test]
    async fn test_abort_clears_active_set() {
        let fetcher = MockMediaFetcher::new();
        let handle = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                let _ = fetcher.prefetch(request(2)).await;
            })
        };
        while fetcher.active_ids().is_empty() {
            tokio::task::yield_now().await;
        }
        handle.abort();
        let _ = handle.await;
        assert!(fetcher.active_ids().is_empty());
    }

    #[tokio::test]
    async fn test_complete_immediately() {
        let fetcher = MockMediaFetcher::new();
        fetcher.complete_immediately();
        fetcher.prefetch(request(3)).await.unwrap();
        assert_eq!(fetcher.started().len(), 1);
        assert_eq!(fetcher.availability(MediaId(3)), Availability::Missing);
    }
}
