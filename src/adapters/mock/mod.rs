//! Mock implementations for testing.
//!
//! These mirror the collaborator traits with in-memory state, push handles
//! for driving subscriptions from tests, and recorded-call verification.
//!
//! # Available Mocks
//!
//! - [`MockContentStore`] - backing store with test-driven push streams
//! - [`MockMediaFetcher`] - media cache that records and holds fetches

pub mod media;
pub mod store;

pub use media::MockMediaFetcher;
pub use store::MockContentStore;
