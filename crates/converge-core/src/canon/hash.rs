//! Digest de contenido opcional sobre bytes canónicos.
//!
//! La igualdad de dedupe (spec.md §4.1) se decide comparando directamente
//! los strings de bytes canónicos, nunca por hash — un digest es
//! estrictamente una conveniencia derivada y opcional para indexado o
//! entradas de log compactas. El algoritmo queda encapsulado para que una
//! futura migración fuera de BLAKE3 no repercuta en los llamadores.

use super::to_canonical_json;
use serde_json::Value;

pub fn hash_str(input: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(input.as_bytes());
    hasher.finalize().to_hex().to_string()
}

pub fn hash_value(v: &Value) -> String {
    hash_str(&to_canonical_json(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_a_function_of_canonical_form() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(hash_value(&a), hash_value(&b));
    }
}
