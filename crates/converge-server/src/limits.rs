//! Conteo de rate/tamaño por conexión (spec.md §5, §6 `limits`).

use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Contador de ventana fija sobre `rate_window_ms`. Una instancia por
/// sesión; sin lock entre sesiones, en línea con spec.md §5: "ninguna
/// operación sostiene un lock entre sesiones por más que su única llamada
/// atómica al store".
pub struct RateLimiter {
    window: Duration,
    max_per_window: u32,
    window_started_at: Instant,
    count_in_window: u32,
}

impl RateLimiter {
    pub fn new(cfg: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_millis(cfg.rate_window_ms),
            max_per_window: cfg.max_inbound_messages_per_window,
            window_started_at: Instant::now(),
            count_in_window: 0,
        }
    }

    /// Registra un mensaje entrante; `true` si excede el tope de la ventana.
    pub fn record_and_check(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_started_at) >= self.window {
            self.window_started_at = now;
            self.count_in_window = 0;
        }
        self.count_in_window += 1;
        self.count_in_window > self.max_per_window
    }
}

/// `true` si `envelope_bytes` excede el tope configurado (spec.md §6).
pub fn is_oversized(envelope_bytes: usize, cfg: &RateLimitConfig) -> bool {
    envelope_bytes > cfg.max_envelope_bytes
}
