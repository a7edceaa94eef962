//! Normalizador de particiones (spec.md §4.2).
//!
//! Valida un arreglo de strings de partición y lo devuelve ordenado y sin
//! duplicados. Un duplicado es un fallo de validación duro — el protocolo
//! hace observable la forma normalizada (`sync_response.payload.partitions`),
//! así que coalescer duplicados en silencio ocultaría un bug del lado
//! cliente en vez de exponerlo.

use crate::errors::CoreError;

/// Conjunto de tags de partición ordenado, sin duplicados y no vacío.
pub fn normalize_partitions(input: &[String]) -> Result<Vec<String>, CoreError> {
    if input.is_empty() {
        return Err(CoreError::ValidationFailed("partitions must be non-empty".into()));
    }
    for p in input {
        if p.is_empty() {
            return Err(CoreError::ValidationFailed("partition entries must be non-empty strings".into()));
        }
    }
    let mut sorted = input.to_vec();
    sorted.sort();
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] {
            return Err(CoreError::ValidationFailed(format!("duplicate partition: {}", pair[0])));
        }
    }
    Ok(sorted)
}

/// `true` si los dos conjuntos de partición (ya normalizados) se intersectan.
pub fn intersects(a: &[String], b: &[String]) -> bool {
    a.iter().any(|p| b.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_and_accepts_unique_entries() {
        let out = normalize_partitions(&["b".into(), "a".into()]).unwrap();
        assert_eq!(out, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rejects_empty_array() {
        assert!(normalize_partitions(&[]).is_err());
    }

    #[test]
    fn rejects_empty_string_entry() {
        assert!(normalize_partitions(&["".into()]).is_err());
    }

    #[test]
    fn rejects_duplicates() {
        assert!(normalize_partitions(&["a".into(), "a".into()]).is_err());
    }

    #[test]
    fn intersection_detects_shared_partition() {
        let a = normalize_partitions(&["p1".into(), "p2".into()]).unwrap();
        let b = normalize_partitions(&["p2".into(), "p3".into()]).unwrap();
        assert!(intersects(&a, &b));
        let c = normalize_partitions(&["p4".into()]).unwrap();
        assert!(!intersects(&a, &c));
    }
}
