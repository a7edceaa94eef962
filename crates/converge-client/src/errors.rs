//! Errores del lado cliente.

use converge_core::wire::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("transport io error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("store error: {0}")]
    Store(#[from] converge_core::errors::CoreError),
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("server message malformed: {0}")]
    BadServerMessage(String),
    /// `auth_failed` / `protocol_version_unsupported` (spec.md §4.8): la
    /// conexión se cierra y NO DEBE reintentarse.
    #[error("server rejected the session ({0:?}): {1}")]
    ServerRejected(ErrorCode, String),
    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,
}
