//! Vistas materializadas (spec.md §3, §4.4, §9): un objeto-estrategia por
//! vista. Los reducers deben ser puros y deterministas; un bump de versión
//! invalida y reconstruye la vista desde el log comprometido, la misma
//! forma de "objeto-estrategia" usada para las políticas de selección
//! (`chem-policies::PropertySelectionPolicy`).

use serde_json::Value;

use crate::model::CommittedEvent;

pub trait MaterializedView: Send + Sync {
    fn name(&self) -> &str;

    /// Incrementar esto invalida todo estado previamente persistido para
    /// esta vista y fuerza una reconstrucción desde el log comprometido
    /// (spec.md §3).
    fn version(&self) -> u32;

    fn initial_state(&self, partition: &str) -> Value;

    /// Reducción pura; no debe leer estado externo ni el reloj.
    fn reduce(&self, state: &Value, event: &CommittedEvent, partition: &str) -> Value;
}
