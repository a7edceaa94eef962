//! Constantes del protocolo de sincronización.
//!
//! Mantener estable: cambios aquí alteran la compatibilidad observable del
//! wire (versión de protocolo) o los valores por defecto documentados en
//! `spec.md` §6/§9.

/// Única versión de protocolo soportada por este engine.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Valores por defecto/bordes sugeridos para `sync.limit` (spec.md §9: son
/// política de despliegue, estos son los defaults documentados).
pub const DEFAULT_SYNC_LIMIT: u32 = 500;
pub const MIN_SYNC_LIMIT: u32 = 1;
pub const MAX_SYNC_LIMIT: u32 = 1000;
