//! Errores semánticos del core neutral.
//!
//! Distintos de `wire::ErrorCode`: estos son errores Rust que las
//! implementaciones de los contratos (`SyncStore`, `ClientStore`) devuelven a
//! sus llamadores; el servidor/cliente los traduce luego a un `ErrorCode` de
//! protocolo (spec.md §7).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("id already committed with different payload")]
    DedupeMismatch,
    #[error("not found")]
    NotFound,
    #[error("internal: {0}")]
    Internal(String),
}
