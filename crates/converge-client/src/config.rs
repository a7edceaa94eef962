//! Perillas configurables del cliente (spec.md §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    pub jitter: f64,
    pub max_attempts: u32,
    pub handshake_timeout_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { enabled: true, initial_delay_ms: 200, max_delay_ms: 30_000, factor: 2.0, jitter: 0.2, max_attempts: 10, handshake_timeout_ms: 5_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Tamaño de página pedido en cada `sync` (el servidor igual lo acota,
    /// spec.md §4.7 paso 4).
    pub page_limit: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { page_limit: 500 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    pub reconnect: ReconnectConfig,
    pub sync: SyncConfig,
}
