//! Headless core of the Notaboard project board: the workspace data model,
//! copy-on-write mutations, the card markdown renderer, persistence over a
//! key-value string store, and JSON import/export.

pub mod board;
pub mod drag;
pub mod ids;
pub mod markdown;
pub mod media;
pub mod mutation;
pub mod search;
pub mod storage;
pub mod store;
pub mod transfer;
pub mod types;

pub use store::{ApplyError, ApplyOutcome, Mutation, WorkspaceStore};
pub use types::*;
