//! The triple window: previous, central, next source.
//!
//! `WindowContext` is a value; the actual `SourceContext`s live in the
//! engine actor's map so a context can be shared between the outgoing
//! current window and an incoming pending one. Shifting the window always
//! constructs a new `WindowContext`; the member set is immutable for its
//! lifetime.

use crate::models::SourceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowContext {
    pub central: SourceId,
    pub previous: Option<SourceId>,
    pub next: Option<SourceId>,
}

impl WindowContext {
    pub fn new(central: SourceId, previous: Option<SourceId>, next: Option<SourceId>) -> Self {
        Self {
            central,
            previous,
            next,
        }
    }

    /// All member source ids, central first.
    pub fn members(&self) -> impl Iterator<Item = SourceId> + '_ {
        std::iter::once(self.central)
            .chain(self.previous)
            .chain(self.next)
    }

    pub fn contains(&self, source_id: SourceId) -> bool {
        self.members().any(|id| id == source_id)
    }
}
