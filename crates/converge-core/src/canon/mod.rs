//! Canonicalizador (spec.md §4.1): bytes deterministas para `(partitions,
//! event)`, el testigo de igualdad-por-dedupe del `id` de un evento
//! comprometido.

mod hash;
mod json;

pub use hash::{hash_str, hash_value};
pub use json::to_canonical_json;

use serde_json::{json, Value};

/// String de bytes canónico para un par `(partitions, event)`. `partitions`
/// se normaliza (deduplicado + ordenado) antes de plegarse en la forma, así
/// los llamadores nunca necesitan normalizar dos veces.
pub fn canonical_form(partitions: &[String], event: &Value) -> String {
    let mut normalized = partitions.to_vec();
    normalized.sort();
    normalized.dedup();
    to_canonical_json(&json!({
        "partitions": normalized,
        "event": event,
    }))
}

/// Igualdad estructural de dos pares `(partitions, event)` bajo la forma
/// canónica — el chequeo de igualdad-por-dedupe de spec.md §4.3.
pub fn canonical_eq(a_partitions: &[String], a_event: &Value, b_partitions: &[String], b_event: &Value) -> bool {
    canonical_form(a_partitions, a_event) == canonical_form(b_partitions, b_event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partition_order_does_not_affect_canonical_form() {
        let a = canonical_form(&["b".into(), "a".into()], &json!({"x": 1}));
        let b = canonical_form(&["a".into(), "b".into()], &json!({"x": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn differing_event_payload_changes_canonical_form() {
        assert!(!canonical_eq(&["a".into()], &json!({"x": 1}), &["a".into()], &json!({"x": 2})));
    }
}
