//! Contratos de sync store y client store (spec.md §4.3, §4.4).

mod client_store;
mod sync_store;
mod view;

pub use client_store::{ApplyCommittedBatch, ApplySubmitResult, ClientStore, InMemoryClientStore};
pub use sync_store::{CommitOutcome, CommitRequest, InMemorySyncStore, ListPage, ListRequest, SyncStore};
pub use view::MaterializedView;
