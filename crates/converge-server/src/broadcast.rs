//! Dispatcher de broadcast (spec.md §4.9): una función síncrona simple sobre
//! una foto del registro de sesiones, invocada inline por la sesión que
//! acaba de comprometer una fila. Ninguna tarea en segundo plano posee la
//! entrega de broadcast — la misma forma "el dispatch es una función, no un
//! actor" usada para los hooks de eventos del engine de flujos.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

use converge_core::model::CommittedEvent;
use converge_core::partitions::intersects;
use converge_core::wire::{Envelope, EventBroadcastPayload, ServerMessage};

/// Item del canal saliente: un envelope ya codificado, listo para que el
/// transporte lo serialice. Las respuestas repiten el `msg_id` de la
/// petición que las disparó; las entregas de broadcast (que no son
/// respuesta a nada) no llevan ninguno.
struct Registered {
    active_partitions: Vec<String>,
    syncing: bool,
    outbound: UnboundedSender<Envelope>,
}

/// Registro del estado relevante para broadcast de las sesiones vivas
/// (spec.md §4.9). Detrás de un único mutex: las actualizaciones de
/// registro/scope son poco frecuentes comparadas con los commits, y la
/// sección crítica nunca hace I/O (los envíos son `UnboundedSender::send`
/// no bloqueantes).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Registered>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: impl Into<String>, outbound: UnboundedSender<Envelope>) {
        self.sessions.lock().expect("registry mutex poisoned").insert(
            connection_id.into(),
            Registered { active_partitions: Vec::new(), syncing: false, outbound },
        );
    }

    pub fn unregister(&self, connection_id: &str) {
        self.sessions.lock().expect("registry mutex poisoned").remove(connection_id);
    }

    /// Reemplazo de scope en cada `sync` (spec.md §4.7 paso 2).
    pub fn update_scope(&self, connection_id: &str, active_partitions: Vec<String>) {
        if let Some(entry) = self.sessions.lock().expect("registry mutex poisoned").get_mut(connection_id) {
            entry.active_partitions = active_partitions;
        }
    }

    /// Suspende o reanuda la entrega de broadcast a esta conexión mientras
    /// un ciclo de sync está abierto (spec.md §8 I6).
    pub fn set_syncing(&self, connection_id: &str, syncing: bool) {
        if let Some(entry) = self.sessions.lock().expect("registry mutex poisoned").get_mut(connection_id) {
            entry.syncing = syncing;
        }
    }

    /// Entrega `event_broadcast` a toda sesión distinta de
    /// `origin_connection_id` cuyo scope activo intersecte
    /// `row.partitions`, saltando las sesiones en medio de un ciclo de sync
    /// (spec.md §4.9). Un canal saliente cerrado (peer desaparecido) se
    /// descarta en silencio — la entrada del registro se limpia en
    /// `unregister` cuando la tarea de sesión termina, no aquí.
    pub fn broadcast(&self, origin_connection_id: &str, row: &CommittedEvent) {
        let sessions = self.sessions.lock().expect("registry mutex poisoned");
        for (connection_id, entry) in sessions.iter() {
            if connection_id == origin_connection_id || entry.syncing {
                continue;
            }
            if !intersects(&entry.active_partitions, &row.partitions) {
                continue;
            }
            let payload = EventBroadcastPayload {
                id: row.id.clone(),
                client_id: row.client_id.clone(),
                partitions: row.partitions.clone(),
                committed_id: row.committed_id,
                event: row.event.clone(),
                status_updated_at: row.status_updated_at,
            };
            let _ = entry.outbound.send(ServerMessage::EventBroadcast(payload).into_envelope(None));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::unbounded_channel;

    fn row(id: &str, partitions: &[&str]) -> CommittedEvent {
        CommittedEvent {
            id: id.into(),
            client_id: "c1".into(),
            partitions: partitions.iter().map(|s| s.to_string()).collect(),
            committed_id: 1,
            event: json!({}),
            status_updated_at: 0,
        }
    }

    #[test]
    fn origin_is_never_delivered_to() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = unbounded_channel();
        registry.register("origin", tx);
        registry.update_scope("origin", vec!["p1".into()]);

        registry.broadcast("origin", &row("e1", &["p1"]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn peer_with_intersecting_scope_and_no_active_cycle_is_delivered_to() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = unbounded_channel();
        registry.register("peer", tx);
        registry.update_scope("peer", vec!["p1".into()]);

        registry.broadcast("origin", &row("e1", &["p1"]));
        let env = rx.try_recv().unwrap();
        assert_eq!(env.msg_type, "event_broadcast");
        assert!(matches!(ServerMessage::from_envelope(&env).unwrap(), ServerMessage::EventBroadcast(_)));
    }

    #[test]
    fn peer_mid_sync_cycle_is_skipped() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = unbounded_channel();
        registry.register("peer", tx);
        registry.update_scope("peer", vec!["p1".into()]);
        registry.set_syncing("peer", true);

        registry.broadcast("origin", &row("e1", &["p1"]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn peer_without_intersecting_scope_is_skipped() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = unbounded_channel();
        registry.register("peer", tx);
        registry.update_scope("peer", vec!["p2".into()]);

        registry.broadcast("origin", &row("e1", &["p1"]));
        assert!(rx.try_recv().is_err());
    }
}
