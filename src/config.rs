//! Configuración central de la aplicación. Carga variables de entorno
//! (`.env`) y expone un `CONFIG` inmutable y de evaluación perezosa — el
//! mismo patrón usado para configuración de base de datos, redirigido a las
//! perillas propias del motor de sincronización (spec.md §6) en vez de una
//! cadena de conexión.

use once_cell::sync::Lazy;
use std::env;

use converge_client::config::{ClientConfig, ReconnectConfig, SyncConfig as ClientSyncConfig};
use converge_server::config::{RateLimitConfig, ServerConfig, SyncLimits};

/// Configuración global y extensible de la aplicación.
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub log_filter: String,
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    let server = ServerConfig {
        limits: RateLimitConfig {
            max_inbound_messages_per_window: env_u32("CONVERGE_MAX_INBOUND_PER_WINDOW", 200),
            rate_window_ms: env_u64("CONVERGE_RATE_WINDOW_MS", 1_000),
            max_envelope_bytes: env_u32("CONVERGE_MAX_ENVELOPE_BYTES", 256 * 1024) as usize,
            close_on_rate_limit: env_bool("CONVERGE_CLOSE_ON_RATE_LIMIT", false),
            close_on_oversize: env_bool("CONVERGE_CLOSE_ON_OVERSIZE", true),
        },
        sync: SyncLimits {
            default_limit: env_u32("CONVERGE_SYNC_DEFAULT_LIMIT", 500),
            min_limit: env_u32("CONVERGE_SYNC_MIN_LIMIT", 1),
            max_limit: env_u32("CONVERGE_SYNC_MAX_LIMIT", 1_000),
        },
    };

    let client = ClientConfig {
        reconnect: ReconnectConfig {
            enabled: env_bool("CONVERGE_RECONNECT_ENABLED", true),
            initial_delay_ms: env_u64("CONVERGE_RECONNECT_INITIAL_DELAY_MS", 200),
            max_delay_ms: env_u64("CONVERGE_RECONNECT_MAX_DELAY_MS", 30_000),
            factor: env::var("CONVERGE_RECONNECT_FACTOR").ok().and_then(|v| v.parse().ok()).unwrap_or(2.0),
            jitter: env::var("CONVERGE_RECONNECT_JITTER").ok().and_then(|v| v.parse().ok()).unwrap_or(0.2),
            max_attempts: env_u32("CONVERGE_RECONNECT_MAX_ATTEMPTS", 10),
            handshake_timeout_ms: env_u64("CONVERGE_HANDSHAKE_TIMEOUT_MS", 5_000),
        },
        sync: ClientSyncConfig { page_limit: env_u32("CONVERGE_CLIENT_PAGE_LIMIT", 500) },
    };

    let log_filter = env::var("CONVERGE_LOG").unwrap_or_else(|_| "info".to_string());

    AppConfig { server, client, log_filter }
});
