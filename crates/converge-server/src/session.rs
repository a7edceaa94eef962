//! Máquina de estados de la sesión de servidor (spec.md §4.5–§4.7): una
//! instancia por conexión, mensajes procesados estrictamente en orden de
//! llegada (spec.md §5 "per-session FIFO"), la misma forma de un struct por
//! conexión usada para los handles de ejecución de flujo.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use converge_core::errors::CoreError;
use converge_core::model::{Phase, SessionState, SyncCycle};
use converge_core::partitions::normalize_partitions;
use converge_core::store::{CommitOutcome, CommitRequest, ListRequest, SyncStore};
use converge_core::wire::{
    ClientMessage, ConnectedPayload, Envelope, ErrorCode, ErrorPayload, FieldError, ServerMessage, SubmitEventsResultPayload, SubmitResultEntry,
    SubmitStatus, SyncResponsePayload,
};

use crate::broadcast::SessionRegistry;
use crate::collaborators::{AuthVerifier, Authorizer, EventValidator};
use crate::config::ServerConfig;
use crate::errors::SessionError;
use crate::limits::{is_oversized, RateLimiter};

/// Abstracción de reloj para que los tests controlen `now`/`status_updated_at`
/// sin depender del reloj de pared; el cableado de producción usa
/// [`SystemClock`].
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        chrono::Utc::now().timestamp_millis() as u64
    }
}

pub struct ServerSession {
    state: SessionState,
    store: Arc<dyn SyncStore>,
    registry: Arc<SessionRegistry>,
    auth: Arc<dyn AuthVerifier>,
    authz: Arc<dyn Authorizer>,
    validator: Arc<dyn EventValidator>,
    clock: Arc<dyn Clock>,
    config: ServerConfig,
    rate_limiter: RateLimiter,
    outbound: UnboundedSender<Envelope>,
}

impl ServerSession {
    /// Crea una sesión y la registra en `registry`. El receiver devuelto es
    /// el stream saliente de la conexión — el llamador (el pegamento del
    /// transporte) lo bombea hacia el wire; tanto las respuestas directas
    /// como los broadcasts entre sesiones llegan por ahí.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connection_id: impl Into<String>,
        store: Arc<dyn SyncStore>,
        registry: Arc<SessionRegistry>,
        auth: Arc<dyn AuthVerifier>,
        authz: Arc<dyn Authorizer>,
        validator: Arc<dyn EventValidator>,
        clock: Arc<dyn Clock>,
        config: ServerConfig,
    ) -> (Self, UnboundedReceiver<Envelope>) {
        let connection_id = connection_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(connection_id.clone(), tx.clone());
        let rate_limiter = RateLimiter::new(&config.limits);
        let session = Self {
            state: SessionState::new(connection_id),
            store,
            registry,
            auth,
            authz,
            validator,
            clock,
            config,
            rate_limiter,
            outbound: tx,
        };
        (session, rx)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    fn send(&self, msg: ServerMessage, msg_id: Option<String>) {
        let _ = self.outbound.send(msg.into_envelope(msg_id));
    }

    fn close_with_error(&mut self, code: ErrorCode, message: impl Into<String>, msg_id: Option<String>) {
        self.send(ServerMessage::Error(ErrorPayload { code, message: message.into(), details: None }), msg_id);
        self.state.phase = Phase::Closed;
        self.registry.unregister(&self.state.connection_id);
    }

    /// Procesa un envelope entrante crudo, mutando el estado de la sesión y
    /// empujando respuestas al canal saliente. Devuelve `true` si la sesión
    /// queda cerrada.
    pub async fn handle_envelope(&mut self, raw: &[u8], env: &Envelope) -> bool {
        if self.state.phase == Phase::Closed {
            return true;
        }

        if is_oversized(raw.len(), &self.config.limits) {
            warn!(connection_id = %self.state.connection_id, "oversized envelope");
            if self.config.limits.close_on_oversize {
                self.close_with_error(ErrorCode::BadRequest, "envelope exceeds maximum size", env.msg_id.clone());
            } else {
                self.send(ServerMessage::error(ErrorCode::BadRequest, "envelope exceeds maximum size"), env.msg_id.clone());
            }
            return self.state.phase == Phase::Closed;
        }

        if self.rate_limiter.record_and_check() {
            if self.config.limits.close_on_rate_limit {
                self.close_with_error(ErrorCode::RateLimited, "rate limit exceeded", env.msg_id.clone());
            } else {
                self.send(ServerMessage::error(ErrorCode::RateLimited, "rate limit exceeded"), env.msg_id.clone());
            }
            return self.state.phase == Phase::Closed;
        }

        if !env.is_supported_version() {
            self.close_with_error(ErrorCode::ProtocolVersionUnsupported, format!("unsupported protocol_version {}", env.protocol_version), env.msg_id.clone());
            return true;
        }

        let message = match ClientMessage::from_envelope(env) {
            Ok(m) => m,
            Err(e) => {
                self.send(ServerMessage::error(ErrorCode::BadRequest, e.to_string()), env.msg_id.clone());
                return false;
            }
        };

        match self.state.phase {
            Phase::AwaitingConnect => self.handle_awaiting_connect(message, env.msg_id.clone()).await,
            Phase::Active => self.handle_active(message, env.msg_id.clone()).await,
            Phase::Closed => {}
        }
        self.state.phase == Phase::Closed
    }

    async fn handle_awaiting_connect(&mut self, message: ClientMessage, msg_id: Option<String>) {
        let ClientMessage::Connect(payload) = message else {
            self.send(ServerMessage::error(ErrorCode::BadRequest, "expected connect as the first message"), msg_id);
            return;
        };

        let identity = match self.auth.verify(&payload.token, &payload.client_id).await {
            Ok(identity) => identity,
            Err(reason) => {
                self.close_with_error(ErrorCode::AuthFailed, reason, msg_id);
                return;
            }
        };
        if identity != payload.client_id {
            self.close_with_error(ErrorCode::AuthFailed, "identity claim does not match client_id", msg_id);
            return;
        }

        self.state.identity = Some(identity);
        self.state.phase = Phase::Active;
        info!(connection_id = %self.state.connection_id, client_id = %payload.client_id, "connected");
        self.send(
            ServerMessage::Connected(ConnectedPayload { client_id: payload.client_id, server_last_committed_id: self.store.max_committed_id() }),
            msg_id,
        );
    }

    async fn handle_active(&mut self, message: ClientMessage, msg_id: Option<String>) {
        match message {
            ClientMessage::Connect(_) => {
                self.send(ServerMessage::error(ErrorCode::BadRequest, "already connected"), msg_id);
            }
            ClientMessage::Sync(payload) => self.handle_sync(payload, msg_id).await,
            ClientMessage::SubmitEvents(payload) => self.handle_submit(payload, msg_id).await,
        }
    }

    async fn handle_sync(&mut self, payload: converge_core::wire::SyncPayload, msg_id: Option<String>) {
        let normalized = match normalize_partitions(&payload.partitions) {
            Ok(p) => p,
            Err(CoreError::ValidationFailed(msg)) => {
                self.send(ServerMessage::error(ErrorCode::BadRequest, msg), msg_id);
                return;
            }
            Err(e) => {
                self.close_with_error(ErrorCode::ServerError, SessionError::Store(e).to_string(), msg_id);
                return;
            }
        };

        if let Err(reason) = self.authz.authorize_partitions(self.state.identity.as_deref(), &normalized).await {
            self.send(ServerMessage::error(ErrorCode::Forbidden, reason), msg_id);
            return;
        }

        self.state.active_partitions = normalized.clone();
        self.registry.update_scope(&self.state.connection_id, normalized.clone());

        if self.state.sync_cycle.is_none() {
            let sync_to = self.store.max_committed_id();
            self.state.sync_cycle = Some(SyncCycle { sync_to, cursor: payload.since_committed_id });
            self.registry.set_syncing(&self.state.connection_id, true);
        }
        let sync_to = self.state.sync_cycle.expect("just set above").sync_to;

        let limit = self.config.sync.clamp(payload.limit);
        let page = match self.store.list_committed_since(ListRequest {
            partitions: &normalized,
            since_committed_id: payload.since_committed_id,
            limit,
            sync_to_committed_id: Some(sync_to),
        }) {
            Ok(page) => page,
            Err(e) => {
                self.close_with_error(ErrorCode::ServerError, SessionError::Store(e).to_string(), msg_id);
                return;
            }
        };

        let has_more = page.has_more;
        self.send(
            ServerMessage::SyncResponse(SyncResponsePayload {
                partitions: normalized,
                events: page.events,
                next_since_committed_id: page.next_since_committed_id,
                has_more,
            }),
            msg_id,
        );

        if !has_more {
            self.state.sync_cycle = None;
            self.registry.set_syncing(&self.state.connection_id, false);
        }
    }

    async fn handle_submit(&mut self, payload: converge_core::wire::SubmitEventsPayload, msg_id: Option<String>) {
        let mut results = Vec::with_capacity(payload.events.len());

        for item in payload.events {
            let normalized = match normalize_partitions(&item.partitions) {
                Ok(p) => p,
                Err(CoreError::ValidationFailed(msg)) => {
                    results.push(self.rejected(item.id, "validation_failed", vec![FieldError { field: "partitions".into(), message: msg }]));
                    continue;
                }
                Err(e) => {
                    self.close_with_error(ErrorCode::ServerError, SessionError::Store(e).to_string(), msg_id);
                    return;
                }
            };

            if let Err(reason) = self.authz.authorize_partitions(self.state.identity.as_deref(), &normalized).await {
                results.push(self.rejected(item.id, "forbidden", vec![FieldError { field: "partitions".into(), message: reason }]));
                continue;
            }

            if let Err(errors) = self.validator.validate(&normalized, &item.event).await {
                results.push(self.rejected(item.id, "validation_failed", errors));
                continue;
            }

            let client_id = self.state.identity.clone().unwrap_or_default();
            let outcome: Result<CommitOutcome, CoreError> = self.store.commit_or_get_existing(CommitRequest {
                id: &item.id,
                client_id: &client_id,
                partitions: &normalized,
                event: &item.event,
                now: self.clock.now_millis(),
            });

            match outcome {
                Ok(outcome) => {
                    let row = outcome.committed_event;
                    results.push(SubmitResultEntry {
                        id: row.id.clone(),
                        status: SubmitStatus::Committed,
                        committed_id: Some(row.committed_id),
                        reason: None,
                        errors: None,
                        status_updated_at: row.status_updated_at,
                    });
                    if !outcome.deduped {
                        self.registry.broadcast(&self.state.connection_id, &row);
                    }
                }
                Err(CoreError::DedupeMismatch) => {
                    results.push(self.rejected(
                        item.id,
                        "validation_failed",
                        vec![FieldError { field: "event".into(), message: "id already committed with different payload".into() }],
                    ));
                }
                Err(e) => {
                    self.close_with_error(ErrorCode::ServerError, SessionError::Store(e).to_string(), msg_id);
                    return;
                }
            }
        }

        self.send(ServerMessage::SubmitEventsResult(SubmitEventsResultPayload { results }), msg_id);
    }

    fn rejected(&self, id: String, reason: &str, errors: Vec<FieldError>) -> SubmitResultEntry {
        SubmitResultEntry {
            id,
            status: SubmitStatus::Rejected,
            committed_id: None,
            reason: Some(reason.to_string()),
            errors: Some(errors),
            status_updated_at: self.clock.now_millis(),
        }
    }
}

impl Drop for ServerSession {
    fn drop(&mut self) {
        self.registry.unregister(&self.state.connection_id);
    }
}
