//! Backoff exponencial con jitter (spec.md §4.8):
//! `delay = min(maxDelay, initial * factor^attempt) * (1 ± jitter)`.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

pub fn backoff_delay(attempt: u32, cfg: &ReconnectConfig) -> Duration {
    let raw = cfg.initial_delay_ms as f64 * cfg.factor.powi(attempt as i32);
    let capped = raw.min(cfg.max_delay_ms as f64);
    let jitter_span = capped * cfg.jitter;
    let jittered = if jitter_span > 0.0 {
        let offset = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
        (capped + offset).max(0.0)
    } else {
        capped
    };
    Duration::from_millis(jittered.round() as u64)
}
