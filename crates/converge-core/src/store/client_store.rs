//! Contrato del store de cliente (spec.md §4.4): almacenamiento transaccional
//! de drafts/commits/cursor más vistas materializadas opcionales, cada
//! operación una única unidad atómica. Trait más una implementación de
//! referencia en memoria, en espejo con `SyncStore`/`InMemorySyncStore`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::errors::CoreError;
use crate::model::{CommittedEvent, Cursor, Draft};
use crate::wire::SubmitStatus;

use super::view::MaterializedView;

pub struct ApplySubmitResult<'a> {
    pub id: &'a str,
    pub status: SubmitStatus,
    pub committed_id: Option<u64>,
    pub status_updated_at: u64,
    /// Se usa solo si no hay draft local del que tomar el `client_id` — por
    /// ejemplo, al reproducir un resultado persistido tras un crash
    /// (spec.md §4.4).
    pub fallback_client_id: &'a str,
}

pub struct ApplyCommittedBatch<'a> {
    pub events: &'a [CommittedEvent],
    pub next_cursor: Option<Cursor>,
}

pub trait ClientStore: Send + Sync {
    fn insert_draft(&self, draft: Draft) -> Result<(), CoreError>;

    /// Ordenado por `(draft_clock, id)` — el orden de drenado que spec.md
    /// §8 (I9) y §4.8 exigen.
    fn load_drafts_ordered(&self) -> Vec<Draft>;

    fn apply_submit_result(&self, result: ApplySubmitResult<'_>) -> Result<(), CoreError>;

    fn apply_committed_batch(&self, batch: ApplyCommittedBatch<'_>) -> Result<(), CoreError>;

    fn load_cursor(&self) -> Cursor;

    fn load_materialized_view(&self, view_name: &str, partition: &str) -> Option<Value>;

    fn register_view(&self, view: Box<dyn MaterializedView>);
}

struct ViewEntry {
    version: u32,
    state: Value,
}

#[derive(Default)]
struct Inner {
    drafts: BTreeMap<String, Draft>,
    next_draft_clock: u64,
    committed: BTreeMap<String, CommittedEvent>,
    cursor: Cursor,
    views: Vec<Box<dyn MaterializedView>>,
    view_state: BTreeMap<(String, String), ViewEntry>,
}

/// `ClientStore` de referencia en memoria (spec.md §1: un backing store SQL
/// embebido de producción es un colaborador externo; este existe para los
/// tests y el binario de demostración).
pub struct InMemoryClientStore {
    inner: Mutex<Inner>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    fn maintain_views(inner: &mut Inner, row: &CommittedEvent) {
        for partition in &row.partitions {
            for view_idx in 0..inner.views.len() {
                let version = inner.views[view_idx].version();
                let key = (inner.views[view_idx].name().to_string(), partition.clone());
                let up_to_date = matches!(inner.view_state.get(&key), Some(entry) if entry.version == version);
                let next = if up_to_date {
                    let current = inner.view_state.get(&key).expect("checked above").state.clone();
                    inner.views[view_idx].reduce(&current, row, partition)
                } else {
                    Self::rebuild_view(inner, view_idx, partition)
                };
                inner.view_state.insert(key, ViewEntry { version, state: next });
            }
        }
    }

    /// Reconstruye el estado de una vista para `partition` replayando todo el
    /// log comprometido, en orden de `committed_id`, desde `initial_state`
    /// (spec.md §3, §4.4: un bump de `version()` invalida el estado
    /// incremental y exige re-derivarlo del log completo).
    fn rebuild_view(inner: &Inner, view_idx: usize, partition: &str) -> Value {
        let view = &inner.views[view_idx];
        let mut rows: Vec<&CommittedEvent> = inner.committed.values().filter(|e| e.partitions.iter().any(|p| p == partition)).collect();
        rows.sort_by_key(|e| e.committed_id);
        let mut state = view.initial_state(partition);
        for event in rows {
            state = view.reduce(&state, event, partition);
        }
        state
    }
}

impl Default for InMemoryClientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStore for InMemoryClientStore {
    fn insert_draft(&self, mut draft: Draft) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().expect("client store mutex poisoned");
        if inner.drafts.contains_key(&draft.id) {
            return Err(CoreError::ValidationFailed(format!("duplicate draft id: {}", draft.id)));
        }
        inner.next_draft_clock += 1;
        draft.draft_clock = inner.next_draft_clock;
        inner.drafts.insert(draft.id.clone(), draft);
        Ok(())
    }

    fn load_drafts_ordered(&self) -> Vec<Draft> {
        let inner = self.inner.lock().expect("client store mutex poisoned");
        let mut drafts: Vec<Draft> = inner.drafts.values().cloned().collect();
        drafts.sort_by(|a, b| (a.draft_clock, &a.id).cmp(&(b.draft_clock, &b.id)));
        drafts
    }

    fn apply_submit_result(&self, result: ApplySubmitResult<'_>) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().expect("client store mutex poisoned");
        let draft = inner.drafts.get(result.id).cloned();

        match result.status {
            SubmitStatus::Committed => {
                let committed_id = result.committed_id.ok_or_else(|| CoreError::Internal("committed result missing committed_id".into()))?;
                let (client_id, partitions, event) = match &draft {
                    Some(d) => (d.client_id.clone(), d.partitions.clone(), d.event.clone()),
                    None => match inner.committed.get(result.id) {
                        Some(existing) => (existing.client_id.clone(), existing.partitions.clone(), existing.event.clone()),
                        None => (result.fallback_client_id.to_string(), Vec::new(), Value::Null),
                    },
                };
                let row = CommittedEvent { id: result.id.to_string(), client_id, partitions, event, committed_id, status_updated_at: result.status_updated_at };
                let is_new = !inner.committed.contains_key(&row.id);
                inner.committed.insert(row.id.clone(), row.clone());
                if is_new {
                    Self::maintain_views(&mut inner, &row);
                }
            }
            SubmitStatus::Rejected => {}
        }
        inner.drafts.remove(result.id);
        Ok(())
    }

    fn apply_committed_batch(&self, batch: ApplyCommittedBatch<'_>) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().expect("client store mutex poisoned");
        for row in batch.events {
            if let Some(existing) = inner.committed.get(&row.id) {
                if existing.committed_id != row.committed_id {
                    return Err(CoreError::Internal(format!(
                        "invariant violation: id {} observed at committed_id {} and {}",
                        row.id, existing.committed_id, row.committed_id
                    )));
                }
                // Same id, same committed_id: idempotent no-op, reducers do not
                // re-run (spec.md §4.4).
            } else {
                inner.committed.insert(row.id.clone(), row.clone());
                Self::maintain_views(&mut inner, row);
            }
            inner.drafts.remove(&row.id);
        }
        if let Some(next) = batch.next_cursor {
            inner.cursor = inner.cursor.max(next);
        }
        Ok(())
    }

    fn load_cursor(&self) -> Cursor {
        self.inner.lock().expect("client store mutex poisoned").cursor
    }

    fn load_materialized_view(&self, view_name: &str, partition: &str) -> Option<Value> {
        let inner = self.inner.lock().expect("client store mutex poisoned");
        inner.view_state.get(&(view_name.to_string(), partition.to_string())).map(|e| e.state.clone())
    }

    fn register_view(&self, view: Box<dyn MaterializedView>) {
        let mut inner = self.inner.lock().expect("client store mutex poisoned");
        inner.views.push(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(id: &str, clock_hint: u64) -> Draft {
        let _ = clock_hint;
        Draft { id: id.to_string(), client_id: "c1".into(), partitions: vec!["p1".into()], event: json!({"v": id}), draft_clock: 0, created_at: 0 }
    }

    #[test]
    fn drafts_drain_in_clock_then_id_order() {
        let store = InMemoryClientStore::new();
        store.insert_draft(draft("b", 0)).unwrap();
        store.insert_draft(draft("a", 0)).unwrap();
        let ordered = store.load_drafts_ordered();
        assert_eq!(ordered.iter().map(|d| d.id.clone()).collect::<Vec<_>>(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn duplicate_draft_id_is_rejected() {
        let store = InMemoryClientStore::new();
        store.insert_draft(draft("a", 0)).unwrap();
        assert!(store.insert_draft(draft("a", 0)).is_err());
    }

    #[test]
    fn committed_result_removes_draft_and_inserts_row() {
        let store = InMemoryClientStore::new();
        store.insert_draft(draft("a", 0)).unwrap();
        store
            .apply_submit_result(ApplySubmitResult { id: "a", status: SubmitStatus::Committed, committed_id: Some(5), status_updated_at: 100, fallback_client_id: "c1" })
            .unwrap();
        assert!(store.load_drafts_ordered().is_empty());
    }

    #[test]
    fn rejected_result_removes_draft_without_commit() {
        let store = InMemoryClientStore::new();
        store.insert_draft(draft("a", 0)).unwrap();
        store
            .apply_submit_result(ApplySubmitResult { id: "a", status: SubmitStatus::Rejected, committed_id: None, status_updated_at: 100, fallback_client_id: "c1" })
            .unwrap();
        assert!(store.load_drafts_ordered().is_empty());
    }

    #[test]
    fn cursor_is_monotonic_and_idempotent_batches_noop() {
        let store = InMemoryClientStore::new();
        let ev = CommittedEvent { id: "a".into(), client_id: "c1".into(), partitions: vec!["p1".into()], event: json!({}), committed_id: 5, status_updated_at: 0 };
        store.apply_committed_batch(ApplyCommittedBatch { events: &[ev.clone()], next_cursor: Some(5) }).unwrap();
        assert_eq!(store.load_cursor(), 5);
        store.apply_committed_batch(ApplyCommittedBatch { events: &[ev], next_cursor: Some(3) }).unwrap();
        assert_eq!(store.load_cursor(), 5, "cursor must never move backwards");
    }

    #[test]
    fn duplicate_id_different_committed_id_is_fatal() {
        let store = InMemoryClientStore::new();
        let ev1 = CommittedEvent { id: "a".into(), client_id: "c1".into(), partitions: vec!["p1".into()], event: json!({}), committed_id: 5, status_updated_at: 0 };
        let ev2 = CommittedEvent { committed_id: 6, ..ev1.clone() };
        store.apply_committed_batch(ApplyCommittedBatch { events: &[ev1], next_cursor: None }).unwrap();
        assert!(store.apply_committed_batch(ApplyCommittedBatch { events: &[ev2], next_cursor: None }).is_err());
    }

    struct CountingView;
    impl MaterializedView for CountingView {
        fn name(&self) -> &str {
            "count"
        }
        fn version(&self) -> u32 {
            1
        }
        fn initial_state(&self, _partition: &str) -> Value {
            json!(0)
        }
        fn reduce(&self, state: &Value, _event: &CommittedEvent, _partition: &str) -> Value {
            json!(state.as_i64().unwrap_or(0) + 1)
        }
    }

    #[test]
    fn view_reduces_on_new_insert_not_on_dedupe() {
        let store = InMemoryClientStore::new();
        store.register_view(Box::new(CountingView));
        let ev = CommittedEvent { id: "a".into(), client_id: "c1".into(), partitions: vec!["p1".into()], event: json!({}), committed_id: 1, status_updated_at: 0 };
        store.apply_committed_batch(ApplyCommittedBatch { events: &[ev.clone()], next_cursor: None }).unwrap();
        assert_eq!(store.load_materialized_view("count", "p1"), Some(json!(1)));
        // Re-applying the identical row (idempotent dedupe) must not re-invoke the
        // reducer.
        store.apply_committed_batch(ApplyCommittedBatch { events: &[ev], next_cursor: None }).unwrap();
        assert_eq!(store.load_materialized_view("count", "p1"), Some(json!(1)));
    }
}
