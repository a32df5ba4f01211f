//! Per-source and per-window context state.

pub(crate) mod source;
pub(crate) mod window;

pub(crate) use source::{Effects, OriginEntry, SourceContext};
pub(crate) use window::WindowContext;
