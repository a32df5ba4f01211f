//! Glimpse - navigation and prefetch engine for sequential ephemeral media
//!
//! The engine sits between a reactive backing store and a presentation
//! layer. It maintains a triple window of content sources (previous,
//! central, next), resolves which item of each source is focused, and
//! publishes immutable [`engine::ContextState`] snapshots through a watch
//! channel. Around that core it schedules cancellable media prefetch for
//! upcoming items and periodic view-statistics refresh for the viewer's
//! own items.
//!
//! All engine state is owned by a single actor task; collaborators are
//! injected behind the [`traits::ContentStore`] and [`traits::MediaFetcher`]
//! traits, with in-memory mocks under [`adapters::mock`].

pub mod adapters;
pub mod engine;
pub mod error;
pub mod focus;
pub mod models;
pub mod ordering;
pub mod traits;

pub(crate) mod context;

pub use engine::{
    ContentContext, ContextState, Direction, EngineOptions, ItemNavigation, Navigation,
    SingleItemContext, SourceListContext, WindowedContext,
};
