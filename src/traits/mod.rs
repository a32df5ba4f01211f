//! Trait abstractions for the engine's external collaborators.
//!
//! The engine is a pure in-memory coordination layer; everything that talks
//! to the outside world sits behind one of these traits, enabling dependency
//! injection and mocking in tests.
//!
//! # Traits
//!
//! - [`ContentStore`] - the reactive backing store (push subscriptions,
//!   placeholder materialization, metadata resolution)
//! - [`MediaFetcher`] - the media cache (cancellable prefetch, availability)

pub mod media;
pub mod store;

pub use media::{Availability, FetchRequest, MediaFetcher};
pub use store::ContentStore;
