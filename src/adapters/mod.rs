//! Concrete implementations of the collaborator traits.
//!
//! Production implementations live with the host application (the data
//! store and media cache are not part of this crate); what ships here are
//! the in-memory mocks used by the test suite and by consumers that want a
//! deterministic harness.

pub mod mock;
