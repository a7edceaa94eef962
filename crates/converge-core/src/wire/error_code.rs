//! Taxonomía de errores (spec.md §6, §7) y el efecto de sesión que cada
//! código implica.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ProtocolVersionUnsupported,
    AuthFailed,
    BadRequest,
    Forbidden,
    ValidationFailed,
    RateLimited,
    ServerError,
    /// Solo del lado cliente: llegó un mensaje malformado desde el servidor.
    BadServerMessage,
    /// Solo del lado cliente: un error de store/runtime emergió dentro de un
    /// manejador de mensajes.
    ClientRuntimeError,
}

/// Qué hace una sesión tras emitir este código, en ausencia de overrides de
/// política de despliegue (spec.md §6 tabla, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    Close,
    KeepOpen,
    /// `rate_limited` — controlado por política (spec.md §5, §9).
    Policy,
}

impl ErrorCode {
    pub fn default_effect(self) -> SessionEffect {
        match self {
            ErrorCode::ProtocolVersionUnsupported => SessionEffect::Close,
            ErrorCode::AuthFailed => SessionEffect::Close,
            ErrorCode::BadRequest => SessionEffect::KeepOpen,
            ErrorCode::Forbidden => SessionEffect::KeepOpen,
            ErrorCode::ValidationFailed => SessionEffect::KeepOpen,
            ErrorCode::RateLimited => SessionEffect::Policy,
            ErrorCode::ServerError => SessionEffect::Close,
            ErrorCode::BadServerMessage => SessionEffect::KeepOpen,
            ErrorCode::ClientRuntimeError => SessionEffect::Close,
        }
    }
}
