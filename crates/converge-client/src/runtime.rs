//! Runtime del cliente (spec.md §4.8, §9 "cooperative single-thread client"):
//! una tarea con buzón, puntos de suspensión exactamente en los awaits de
//! I/O. Sin estado mutable compartido fuera del store — el store media la
//! atomicidad, el mismo rol que la capa de persistencia juega detrás del
//! motor de flujos.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{info, warn};

use converge_core::errors::CoreError;
use converge_core::model::{Cursor, Draft};
use converge_core::store::{ApplyCommittedBatch, ApplySubmitResult, ClientStore};
use converge_core::wire::{
    ClientMessage, ConnectPayload, Envelope, ErrorCode, ErrorPayload, EventBroadcastPayload, ServerMessage, SubmitEventsPayload, SubmitEventsResultPayload,
    SubmitItem, SyncPayload, SyncResponsePayload,
};

use crate::config::ClientConfig;
use crate::errors::{RuntimeError, TransportError};
use crate::reconnect::backoff_delay;
use crate::transport::Transport;

fn new_msg_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct ClientRuntime {
    transport: Box<dyn Transport>,
    store: Arc<dyn ClientStore>,
    config: ClientConfig,
    token: String,
    client_id: String,
    active_partitions: Vec<String>,
    /// `true` mientras un ciclo de sync está paginando (spec.md §4.8 "submit queuing").
    syncing: bool,
}

impl ClientRuntime {
    pub fn new(
        transport: Box<dyn Transport>,
        store: Arc<dyn ClientStore>,
        config: ClientConfig,
        token: impl Into<String>,
        client_id: impl Into<String>,
        active_partitions: Vec<String>,
    ) -> Self {
        Self { transport, store, config, token: token.into(), client_id: client_id.into(), active_partitions, syncing: false }
    }

    /// Ejecuta handshake + sync + drain, y luego el loop de mensajes
    /// entrantes, reconectando con backoff ante fallas de transporte
    /// (spec.md §4.8). Devuelve `Ok(())` solo ante un cierre limpio del
    /// transporte con la reconexión deshabilitada; devuelve `Err` ante un
    /// rechazo fatal del servidor o un presupuesto de reconexión agotado.
    pub async fn run(&mut self) -> Result<(), RuntimeError> {
        let mut attempt = 0u32;
        loop {
            match self.connect_and_catch_up().await {
                Ok(()) => {
                    attempt = 0;
                    match self.message_loop().await {
                        Ok(()) => return Ok(()),
                        Err(RuntimeError::Transport(_)) if self.config.reconnect.enabled => {
                            self.reconnect_or_give_up(&mut attempt).await?;
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(RuntimeError::Transport(_) | RuntimeError::HandshakeTimeout) if self.config.reconnect.enabled => {
                    self.reconnect_or_give_up(&mut attempt).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn reconnect_or_give_up(&mut self, attempt: &mut u32) -> Result<(), RuntimeError> {
        if *attempt >= self.config.reconnect.max_attempts {
            return Err(RuntimeError::ReconnectExhausted);
        }
        let delay = backoff_delay(*attempt, &self.config.reconnect);
        warn!(attempt = *attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
        *attempt += 1;
        tokio::time::sleep(delay).await;
        Ok(())
    }

    async fn connect_and_catch_up(&mut self) -> Result<(), RuntimeError> {
        self.transport.connect().await?;
        self.transport
            .send(ClientMessage::Connect(ConnectPayload { token: self.token.clone(), client_id: self.client_id.clone() }).into_envelope(Some(new_msg_id())))
            .await?;

        let handshake = timeout(std::time::Duration::from_millis(self.config.reconnect.handshake_timeout_ms), self.transport.recv());
        let envelope = match handshake.await {
            Ok(Ok(Some(env))) => env,
            Ok(Ok(None)) => return Err(RuntimeError::Transport(TransportError::Closed)),
            Ok(Err(e)) => return Err(RuntimeError::Transport(e)),
            Err(_) => return Err(RuntimeError::HandshakeTimeout),
        };

        match ServerMessage::from_envelope(&envelope) {
            Ok(ServerMessage::Connected(p)) => {
                info!(client_id = %p.client_id, server_last_committed_id = p.server_last_committed_id, "connected");
            }
            Ok(ServerMessage::Error(p)) => return Err(RuntimeError::ServerRejected(p.code, p.message)),
            Ok(other) => return Err(RuntimeError::BadServerMessage(format!("expected connected, got {}", other_type(&other)))),
            Err(e) => return Err(RuntimeError::BadServerMessage(e.to_string())),
        }

        let since = self.store.load_cursor();
        self.sync_and_drain(since).await
    }

    async fn sync_and_drain(&mut self, mut since: Cursor) -> Result<(), RuntimeError> {
        self.syncing = true;
        loop {
            self.transport
                .send(
                    ClientMessage::Sync(SyncPayload { partitions: self.active_partitions.clone(), since_committed_id: since, limit: Some(self.config.sync.page_limit) })
                        .into_envelope(Some(new_msg_id())),
                )
                .await?;

            let envelope = self.transport.recv().await?.ok_or(RuntimeError::Transport(TransportError::Closed))?;
            let page = match ServerMessage::from_envelope(&envelope) {
                Ok(ServerMessage::SyncResponse(p)) => p,
                Ok(ServerMessage::Error(p)) => return Err(RuntimeError::ServerRejected(p.code, p.message)),
                Ok(other) => return Err(RuntimeError::BadServerMessage(format!("expected sync_response, got {}", other_type(&other)))),
                Err(e) => return Err(RuntimeError::BadServerMessage(e.to_string())),
            };

            self.apply_sync_page(&page)?;
            since = page.next_since_committed_id;
            if !page.has_more {
                break;
            }
        }
        self.syncing = false;
        self.drain_drafts().await
    }

    fn apply_sync_page(&mut self, page: &SyncResponsePayload) -> Result<(), RuntimeError> {
        let next_cursor = if page.has_more { None } else { Some(page.next_since_committed_id) };
        self.store.apply_committed_batch(ApplyCommittedBatch { events: &page.events, next_cursor }).map_err(RuntimeError::from)
    }

    async fn drain_drafts(&mut self) -> Result<(), RuntimeError> {
        let drafts = self.store.load_drafts_ordered();
        for draft in drafts {
            self.transport
                .send(
                    ClientMessage::SubmitEvents(SubmitEventsPayload {
                        events: vec![SubmitItem { id: draft.id, partitions: draft.partitions, event: draft.event }],
                    })
                    .into_envelope(Some(new_msg_id())),
                )
                .await?;
        }
        Ok(())
    }

    /// Encola un nuevo draft local (spec.md §4.4, §4.8). Se envía de
    /// inmediato salvo que un ciclo de sync esté paginando, en cuyo caso el
    /// drain posterior al ciclo de `run` lo recoge.
    pub async fn submit(&mut self, draft: Draft) -> Result<(), RuntimeError> {
        self.store.insert_draft(draft.clone())?;
        if !self.syncing {
            self.transport
                .send(
                    ClientMessage::SubmitEvents(SubmitEventsPayload {
                        events: vec![SubmitItem { id: draft.id, partitions: draft.partitions, event: draft.event }],
                    })
                    .into_envelope(Some(new_msg_id())),
                )
                .await?;
        }
        Ok(())
    }

    /// `setPartitions` (spec.md §4.8): reemplaza el scope activo y dispara un
    /// nuevo sync de catch-up. `since = None` usa por defecto el cursor
    /// durable; quien agregue una partición nunca antes vista debe pasar
    /// `Some(0)`.
    pub async fn set_partitions(&mut self, next: Vec<String>, since: Option<Cursor>) -> Result<(), RuntimeError> {
        self.active_partitions = next;
        let since = since.unwrap_or_else(|| self.store.load_cursor());
        self.sync_and_drain(since).await
    }

    /// Procesa envelopes entrantes hasta que el transporte se cierra o llega
    /// un error fatal.
    pub async fn message_loop(&mut self) -> Result<(), RuntimeError> {
        loop {
            match self.transport.recv().await {
                Ok(Some(envelope)) => self.handle_inbound(envelope).await?,
                Ok(None) => return Ok(()),
                Err(e) => return Err(RuntimeError::Transport(e)),
            }
        }
    }

    async fn handle_inbound(&mut self, envelope: Envelope) -> Result<(), RuntimeError> {
        let message = match ServerMessage::from_envelope(&envelope) {
            Ok(m) => m,
            Err(e) => {
                // bad_server_message is client-local only (error_code.rs) — log
                // and keep the connection open (spec.md §4.8).
                warn!(error = %e, "malformed inbound envelope");
                return Ok(());
            }
        };

        match message {
            ServerMessage::Connected(_) => Ok(()),
            ServerMessage::SyncResponse(p) => self.apply_sync_page(&p),
            ServerMessage::SubmitEventsResult(p) => self.apply_submit_result(p),
            ServerMessage::EventBroadcast(p) => self.apply_broadcast(p),
            ServerMessage::Error(p) => self.handle_error(p).await,
        }
    }

    fn apply_submit_result(&mut self, payload: SubmitEventsResultPayload) -> Result<(), RuntimeError> {
        for entry in payload.results {
            let outcome: Result<(), CoreError> = self.store.apply_submit_result(ApplySubmitResult {
                id: &entry.id,
                status: entry.status,
                committed_id: entry.committed_id,
                status_updated_at: entry.status_updated_at,
                fallback_client_id: &self.client_id,
            });
            outcome?;
        }
        Ok(())
    }

    fn apply_broadcast(&mut self, payload: EventBroadcastPayload) -> Result<(), RuntimeError> {
        let row = converge_core::model::CommittedEvent {
            id: payload.id,
            client_id: payload.client_id,
            partitions: payload.partitions,
            committed_id: payload.committed_id,
            event: payload.event,
            status_updated_at: payload.status_updated_at,
        };
        // A sync-cycle catch-up page can legitimately race a live broadcast
        // for the same id; `apply_committed_batch` dedupes idempotently
        // (spec.md §4.8 "Result application").
        self.store.apply_committed_batch(ApplyCommittedBatch { events: std::slice::from_ref(&row), next_cursor: None }).map_err(RuntimeError::from)
    }

    async fn handle_error(&mut self, payload: ErrorPayload) -> Result<(), RuntimeError> {
        match payload.code {
            ErrorCode::AuthFailed | ErrorCode::ProtocolVersionUnsupported => {
                self.transport.close().await;
                Err(RuntimeError::ServerRejected(payload.code, payload.message))
            }
            ErrorCode::ServerError => {
                self.transport.close().await;
                Err(RuntimeError::Transport(TransportError::Closed))
            }
            _ => {
                warn!(code = ?payload.code, message = %payload.message, "server error");
                Ok(())
            }
        }
    }
}

fn other_type(msg: &ServerMessage) -> &'static str {
    match msg {
        ServerMessage::Connected(_) => "connected",
        ServerMessage::SyncResponse(_) => "sync_response",
        ServerMessage::SubmitEventsResult(_) => "submit_events_result",
        ServerMessage::EventBroadcast(_) => "event_broadcast",
        ServerMessage::Error(_) => "error",
    }
}
