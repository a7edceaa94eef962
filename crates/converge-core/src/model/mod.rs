//! Modelo de datos (spec.md §3): las entidades compartidas por todo
//! colaborador — `CommittedEvent`, `Draft`, el `Cursor` del cliente y
//! `SessionState`.

mod draft;
mod event;
mod session;

pub use draft::Draft;
pub use event::CommittedEvent;
pub use session::{Phase, SessionState, SyncCycle};

/// `committed_id` más alto que un cliente ha absorbido de forma durable
/// (spec.md §3, "Cursor").
pub type Cursor = u64;
