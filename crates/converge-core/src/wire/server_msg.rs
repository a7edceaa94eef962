//! Payloads de mensajes servidor → cliente (spec.md §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::Envelope;
use super::error_code::ErrorCode;
use crate::model::CommittedEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub client_id: String,
    pub server_last_committed_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponsePayload {
    pub partitions: Vec<String>,
    pub events: Vec<CommittedEvent>,
    pub next_since_committed_id: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    Committed,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultEntry {
    pub id: String,
    pub status: SubmitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    pub status_updated_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEventsResultPayload {
    pub results: Vec<SubmitResultEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBroadcastPayload {
    pub id: String,
    pub client_id: String,
    pub partitions: Vec<String>,
    pub committed_id: u64,
    pub event: Value,
    pub status_updated_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum ServerMessage {
    Connected(ConnectedPayload),
    SyncResponse(SyncResponsePayload),
    SubmitEventsResult(SubmitEventsResultPayload),
    EventBroadcast(EventBroadcastPayload),
    Error(ErrorPayload),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("malformed payload for {0}: {1}")]
    MalformedPayload(String, String),
}

impl ServerMessage {
    pub fn msg_type(&self) -> &'static str {
        match self {
            ServerMessage::Connected(_) => "connected",
            ServerMessage::SyncResponse(_) => "sync_response",
            ServerMessage::SubmitEventsResult(_) => "submit_events_result",
            ServerMessage::EventBroadcast(_) => "event_broadcast",
            ServerMessage::Error(_) => "error",
        }
    }

    pub fn into_envelope(self, msg_id: Option<String>) -> Envelope {
        let payload = match &self {
            ServerMessage::Connected(p) => serde_json::to_value(p),
            ServerMessage::SyncResponse(p) => serde_json::to_value(p),
            ServerMessage::SubmitEventsResult(p) => serde_json::to_value(p),
            ServerMessage::EventBroadcast(p) => serde_json::to_value(p),
            ServerMessage::Error(p) => serde_json::to_value(p),
        }
        .expect("server message payloads are always serializable");
        Envelope::new(self.msg_type(), payload).with_msg_id(msg_id)
    }

    pub fn from_envelope(env: &Envelope) -> Result<Self, DecodeError> {
        let map_err = |e: serde_json::Error| DecodeError::MalformedPayload(env.msg_type.clone(), e.to_string());
        match env.msg_type.as_str() {
            "connected" => Ok(ServerMessage::Connected(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            "sync_response" => Ok(ServerMessage::SyncResponse(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            "submit_events_result" => Ok(ServerMessage::SubmitEventsResult(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            "event_broadcast" => Ok(ServerMessage::EventBroadcast(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            "error" => Ok(ServerMessage::Error(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorPayload { code, message: message.into(), details: None })
    }
}
