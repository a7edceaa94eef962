//! Perillas configurables del servidor (spec.md §6, "CLI/config surface").

use converge_core::constants::{DEFAULT_SYNC_LIMIT, MAX_SYNC_LIMIT, MIN_SYNC_LIMIT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLimits {
    pub default_limit: u32,
    pub min_limit: u32,
    pub max_limit: u32,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self { default_limit: DEFAULT_SYNC_LIMIT, min_limit: MIN_SYNC_LIMIT, max_limit: MAX_SYNC_LIMIT }
    }
}

impl SyncLimits {
    /// Acota el `limit` pedido por el cliente a `[min_limit, max_limit]`,
    /// sustituyendo `default_limit` cuando está ausente (spec.md §4.7 paso 4).
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        let raw = requested.unwrap_or(self.default_limit);
        raw.clamp(self.min_limit, self.max_limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_inbound_messages_per_window: u32,
    pub rate_window_ms: u64,
    pub max_envelope_bytes: usize,
    pub close_on_rate_limit: bool,
    pub close_on_oversize: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_inbound_messages_per_window: 200, rate_window_ms: 1_000, max_envelope_bytes: 256 * 1024, close_on_rate_limit: false, close_on_oversize: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub limits: RateLimitConfig,
    pub sync: SyncLimits,
}
