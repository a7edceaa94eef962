//! `SessionState` (spec.md §3, §4.5): el estado por conexión que posee la
//! máquina de sesión del servidor. `phase` determina qué tipos de mensaje
//! entrantes se aceptan.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Estado inicial; solo se acepta `connect`.
    AwaitingConnect,
    Active,
    /// Terminal; no hay más procesamiento de mensajes entrantes.
    Closed,
}

/// La cota superior fija y el cursor corriente de un ciclo de sync (spec.md
/// §4.7, GLOSARIO "Sync cycle"). Mientras sea `Some`, los broadcasts hacia
/// esta conexión quedan suprimidos (spec.md §8 I6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCycle {
    pub sync_to: u64,
    pub cursor: u64,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub connection_id: String,
    pub identity: Option<String>,
    /// Conjunto ordenado, reemplazado por completo en cada `sync` (spec.md
    /// §4.7 paso 2).
    pub active_partitions: Vec<String>,
    pub sync_cycle: Option<SyncCycle>,
    pub phase: Phase,
}

impl SessionState {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            identity: None,
            active_partitions: Vec::new(),
            sync_cycle: None,
            phase: Phase::AwaitingConnect,
        }
    }

    /// `true` mientras un ciclo de sync está abierto (spec.md §8 I6).
    pub fn syncing(&self) -> bool {
        self.sync_cycle.is_some()
    }
}
