//! converge-core: contratos neutrales del protocolo de sincronización
//! (spec.md §4.1–§4.4, §4.11, §6).
//!
//! Este crate es el análogo de `chem-core`: determinista, síncrono, sin
//! dependencia de transporte ni de runtime async. Define:
//! - `canon`: JSON canónico y el testigo de dedupe `(partitions, event)`.
//! - `partitions`: el normalizador de particiones.
//! - `model`: `CommittedEvent`, `Draft`, `Cursor`, `SessionState`.
//! - `wire`: el envelope, los payloads de mensajes cliente/servidor y los
//!   códigos de error.
//! - `store`: los contratos `SyncStore`/`ClientStore` más implementaciones
//!   de referencia en memoria (los backing stores reales son externos,
//!   spec.md §1).
//! - `commit`: el asignador monótono de commit id.
//!
//! `converge-server` y `converge-client` construyen la maquinaria async de
//! sesión/runtime encima de estos contratos.

pub mod canon;
pub mod commit;
pub mod constants;
pub mod errors;
pub mod model;
pub mod partitions;
pub mod store;
pub mod wire;
