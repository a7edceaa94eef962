//! Errores del lado servidor (distintos del `ErrorCode` del wire al que se
//! traducen al cerrar una sesión — ver `session::ServerSession::close_with_error`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("store error: {0}")]
    Store(#[from] converge_core::errors::CoreError),
    #[error("internal: {0}")]
    Internal(String),
}
