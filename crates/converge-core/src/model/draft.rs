//! `Draft` (spec.md §3): un evento creado localmente, aún no comprometido,
//! en cola para envío. `draft_clock` más `id` como desempate define el
//! orden de drenado (spec.md §4.4, §8 I9).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub id: String,
    pub client_id: String,
    pub partitions: Vec<String>,
    pub event: Value,
    pub draft_clock: u64,
    pub created_at: u64,
}
