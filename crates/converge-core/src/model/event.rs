//! `CommittedEvent` (spec.md §3): creado exclusivamente por el servidor al
//! comprometerse con éxito, inmutable en adelante. `id` es globalmente
//! único; el par `(partitions, event)` bajo `canon::canonical_form` es el
//! testigo de igualdad-por-dedupe para un `id` dado.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommittedEvent {
    pub id: String,
    pub client_id: String,
    /// Ordenado, no vacío, sin duplicados (spec.md §4.2).
    pub partitions: Vec<String>,
    pub committed_id: u64,
    pub event: Value,
    pub status_updated_at: u64,
}

impl CommittedEvent {
    /// `true` si el par `(partitions, event)` canónico de esta fila coincide
    /// con el par dado — el chequeo detrás de la rama de dedupe de
    /// `SyncStore::commit_or_get_existing` (spec.md §4.3).
    pub fn matches_canonical(&self, partitions: &[String], event: &Value) -> bool {
        crate::canon::canonical_eq(&self.partitions, &self.event, partitions, event)
    }
}
