//! Transporte offline (spec.md §4.10): un colaborador opcional que permite
//! al runtime operar contra un objeto con forma de transporte mientras está
//! desconectado. Sintetiza `connected`/`sync_response` localmente, almacena
//! submits en buffer hasta una capacidad, y los reproduce — primero
//! `connect`, luego los submits en buffer en orden — una vez que se adjunta
//! un transporte online.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use converge_core::wire::{ConnectPayload, ConnectedPayload, ErrorCode, ServerMessage, SyncPayload, SyncResponsePayload};

use crate::errors::TransportError;
use crate::transport::Transport;

enum Mode {
    Local,
    Online(Box<dyn Transport>),
}

pub struct OfflineTransport {
    mode: Mode,
    capacity: usize,
    connect_envelope: Option<converge_core::wire::Envelope>,
    buffered_submits: VecDeque<converge_core::wire::Envelope>,
    local_tx: UnboundedSender<converge_core::wire::Envelope>,
    local_rx: UnboundedReceiver<converge_core::wire::Envelope>,
}

impl OfflineTransport {
    pub fn new(capacity: usize) -> Self {
        let (local_tx, local_rx) = mpsc::unbounded_channel();
        Self { mode: Mode::Local, capacity, connect_envelope: None, buffered_submits: VecDeque::new(), local_tx, local_rx }
    }

    pub fn is_online(&self) -> bool {
        matches!(self.mode, Mode::Online(_))
    }

    /// Adjunta `transport`, lo conecta, y luego reproduce el último envelope
    /// `connect` seguido de cada submit en buffer, en orden.
    pub async fn set_online_transport(&mut self, mut transport: Box<dyn Transport>) -> Result<(), TransportError> {
        transport.connect().await?;
        if let Some(connect_env) = self.connect_envelope.clone() {
            transport.send(connect_env).await?;
        }
        while let Some(item) = self.buffered_submits.pop_front() {
            transport.send(item).await?;
        }
        self.mode = Mode::Online(transport);
        Ok(())
    }

    /// Desconecta el transporte online actual (si existe) y vuelve al modo
    /// local.
    pub async fn set_offline(&mut self) {
        if let Mode::Online(mut transport) = std::mem::replace(&mut self.mode, Mode::Local) {
            transport.close().await;
        }
    }

    fn synthesize(&self, msg: ServerMessage, msg_id: Option<String>) {
        let _ = self.local_tx.send(msg.into_envelope(msg_id));
    }
}

#[async_trait]
impl Transport for OfflineTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if let Mode::Online(t) = &mut self.mode {
            return t.connect().await;
        }
        Ok(())
    }

    async fn send(&mut self, envelope: converge_core::wire::Envelope) -> Result<(), TransportError> {
        match &mut self.mode {
            Mode::Online(transport) => transport.send(envelope).await,
            Mode::Local => {
                match envelope.msg_type.as_str() {
                    "connect" => {
                        let client_id = serde_json::from_value::<ConnectPayload>(envelope.payload.clone()).map(|p| p.client_id).unwrap_or_default();
                        self.connect_envelope = Some(envelope.clone());
                        self.synthesize(
                            ServerMessage::Connected(ConnectedPayload { client_id, server_last_committed_id: 0 }),
                            envelope.msg_id.clone(),
                        );
                    }
                    "sync" => {
                        if let Ok(payload) = serde_json::from_value::<SyncPayload>(envelope.payload.clone()) {
                            self.synthesize(
                                ServerMessage::SyncResponse(SyncResponsePayload {
                                    partitions: payload.partitions,
                                    events: Vec::new(),
                                    next_since_committed_id: payload.since_committed_id,
                                    has_more: false,
                                }),
                                envelope.msg_id.clone(),
                            );
                        }
                    }
                    "submit_events" => {
                        if self.buffered_submits.len() >= self.capacity {
                            self.synthesize(ServerMessage::error(ErrorCode::RateLimited, "offline submit buffer is full"), envelope.msg_id.clone());
                        } else {
                            self.buffered_submits.push_back(envelope);
                        }
                    }
                    _ => {}
                }
                Ok(())
            }
        }
    }

    async fn recv(&mut self) -> Result<Option<converge_core::wire::Envelope>, TransportError> {
        match &mut self.mode {
            Mode::Online(transport) => transport.recv().await,
            Mode::Local => Ok(self.local_rx.recv().await),
        }
    }

    async fn close(&mut self) {
        if let Mode::Online(transport) = &mut self.mode {
            transport.close().await;
        }
        self.mode = Mode::Local;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge_core::wire::{ClientMessage, SubmitEventsPayload, SubmitItem};

    #[tokio::test]
    async fn local_mode_synthesizes_connected_and_empty_sync_response() {
        let mut t = OfflineTransport::new(4);
        t.connect().await.unwrap();
        t.send(ClientMessage::Connect(ConnectPayload { token: "tok".into(), client_id: "c1".into() }).into_envelope(Some("m1".into()))).await.unwrap();
        let reply = t.recv().await.unwrap().unwrap();
        assert_eq!(reply.msg_type, "connected");
        assert_eq!(reply.msg_id.as_deref(), Some("m1"));

        t.send(ClientMessage::Sync(SyncPayload { partitions: vec!["p1".into()], since_committed_id: 7, limit: None }).into_envelope(Some("m2".into())))
            .await
            .unwrap();
        let reply = t.recv().await.unwrap().unwrap();
        assert_eq!(reply.msg_type, "sync_response");
        let payload: SyncResponsePayload = serde_json::from_value(reply.payload).unwrap();
        assert_eq!(payload.next_since_committed_id, 7);
        assert!(!payload.has_more);
    }

    #[tokio::test]
    async fn submits_beyond_capacity_are_rate_limited_locally() {
        let mut t = OfflineTransport::new(1);
        let submit = |id: &str| {
            ClientMessage::SubmitEvents(SubmitEventsPayload { events: vec![SubmitItem { id: id.into(), partitions: vec!["p1".into()], event: serde_json::json!({}) }] })
                .into_envelope(Some(id.to_string()))
        };
        t.send(submit("a")).await.unwrap();
        t.send(submit("b")).await.unwrap();
        let reply = t.recv().await.unwrap().unwrap();
        assert_eq!(reply.msg_type, "error");
        assert_eq!(reply.msg_id.as_deref(), Some("b"));
    }
}
