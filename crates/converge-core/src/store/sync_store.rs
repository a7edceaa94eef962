//! Contrato del sync store (spec.md §4.3). Un trait más una implementación
//! de referencia en memoria, la misma separación que se traza entre
//! `EventStore` (trait) e `InMemoryEventStore` (impl de referencia) — un
//! backing store real (SQL embebido, etc.) es un colaborador externo
//! (spec.md §1) invocado de la misma forma en que `chem-persistence` invoca
//! Diesel detrás de una API síncrona: se espera que el servidor async lo
//! alcance vía `spawn_blocking` si bloquea en I/O, nunca volviendo `async`
//! este trait.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::commit::CommitIdAllocator;
use crate::errors::CoreError;
use crate::model::CommittedEvent;
use crate::partitions::intersects;
use serde_json::Value;

pub struct CommitRequest<'a> {
    pub id: &'a str,
    pub client_id: &'a str,
    pub partitions: &'a [String],
    pub event: &'a Value,
    pub now: u64,
}

#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub deduped: bool,
    pub committed_event: CommittedEvent,
}

pub struct ListRequest<'a> {
    pub partitions: &'a [String],
    pub since_committed_id: u64,
    pub limit: u32,
    pub sync_to_committed_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ListPage {
    pub events: Vec<CommittedEvent>,
    pub has_more: bool,
    pub next_since_committed_id: u64,
}

/// Commit-o-dedupe atómico más listado paginado (spec.md §4.3). Ambas
/// operaciones son atómicas entre sí y respecto a los llamadores de la otra.
pub trait SyncStore: Send + Sync {
    fn commit_or_get_existing(&self, req: CommitRequest<'_>) -> Result<CommitOutcome, CoreError>;

    fn list_committed_since(&self, req: ListRequest<'_>) -> Result<ListPage, CoreError>;

    /// `committed_id` más alto conocido actualmente, 0 si el log está vacío.
    /// Usado por la sesión de servidor para responder
    /// `connected.server_last_committed_id` y para fijar la cota superior de
    /// un ciclo de sync (spec.md §4.7 paso 3).
    fn max_committed_id(&self) -> u64;
}

#[derive(Default)]
struct Inner {
    by_id: BTreeMap<String, CommittedEvent>,
    by_committed_id: BTreeMap<u64, String>,
}

/// `SyncStore` de referencia en memoria. No es un backing store de
/// producción (spec.md §1 deja los adapters SQL embebidos fuera de
/// alcance) — existe para poder ejercitar el engine de punta a punta en
/// tests y en el binario de demo.
pub struct InMemorySyncStore {
    allocator: CommitIdAllocator,
    inner: Mutex<Inner>,
}

impl InMemorySyncStore {
    pub fn new() -> Self {
        Self { allocator: CommitIdAllocator::new(0), inner: Mutex::new(Inner::default()) }
    }
}

impl Default for InMemorySyncStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStore for InMemorySyncStore {
    fn commit_or_get_existing(&self, req: CommitRequest<'_>) -> Result<CommitOutcome, CoreError> {
        // Single critical section: allocation and durable persist happen as one
        // atomic unit (spec.md §4.3, §4.11) — no other call can observe a
        // half-committed row.
        let mut inner = self.inner.lock().expect("sync store mutex poisoned");

        if let Some(existing) = inner.by_id.get(req.id) {
            return if existing.matches_canonical(req.partitions, req.event) {
                Ok(CommitOutcome { deduped: true, committed_event: existing.clone() })
            } else {
                Err(CoreError::DedupeMismatch)
            };
        }

        let committed_id = self.allocator.next_id();
        let row = CommittedEvent {
            id: req.id.to_string(),
            client_id: req.client_id.to_string(),
            partitions: req.partitions.to_vec(),
            committed_id,
            event: req.event.clone(),
            status_updated_at: req.now,
        };
        inner.by_committed_id.insert(committed_id, row.id.clone());
        inner.by_id.insert(row.id.clone(), row.clone());
        Ok(CommitOutcome { deduped: false, committed_event: row })
    }

    fn list_committed_since(&self, req: ListRequest<'_>) -> Result<ListPage, CoreError> {
        let inner = self.inner.lock().expect("sync store mutex poisoned");
        let upper = req.sync_to_committed_id.unwrap_or(u64::MAX);

        let mut events = Vec::new();
        let mut last_seen = req.since_committed_id;
        let mut has_more = false;

        for (&cid, id) in inner.by_committed_id.range((req.since_committed_id + 1)..) {
            if cid > upper {
                break;
            }
            let row = inner.by_id.get(id).expect("index consistency");
            if !intersects(&row.partitions, req.partitions) {
                continue;
            }
            if events.len() as u32 >= req.limit {
                has_more = true;
                break;
            }
            events.push(row.clone());
            last_seen = cid;
        }

        // Distinguish "stopped because of the limit" from "more rows exist past
        // the limit but none matched partitions yet" by re-scanning for any
        // remaining match within the upper bound.
        if !has_more {
            has_more = inner
                .by_committed_id
                .range((last_seen + 1)..)
                .take_while(|(&cid, _)| cid <= upper)
                .any(|(_, id)| intersects(&inner.by_id[id].partitions, req.partitions));
        }

        Ok(ListPage { events, has_more, next_since_committed_id: last_seen })
    }

    fn max_committed_id(&self) -> u64 {
        self.allocator.current()
    }
}
