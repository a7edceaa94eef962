//! Payloads de mensajes cliente → servidor (spec.md §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::Envelope;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectPayload {
    pub token: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPayload {
    pub partitions: Vec<String>,
    pub since_committed_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitItem {
    pub id: String,
    pub partitions: Vec<String>,
    pub event: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEventsPayload {
    pub events: Vec<SubmitItem>,
}

#[derive(Debug, Clone)]
pub enum ClientMessage {
    Connect(ConnectPayload),
    Sync(SyncPayload),
    SubmitEvents(SubmitEventsPayload),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("malformed payload for {0}: {1}")]
    MalformedPayload(String, String),
}

impl ClientMessage {
    pub fn msg_type(&self) -> &'static str {
        match self {
            ClientMessage::Connect(_) => "connect",
            ClientMessage::Sync(_) => "sync",
            ClientMessage::SubmitEvents(_) => "submit_events",
        }
    }

    pub fn into_envelope(self, msg_id: Option<String>) -> Envelope {
        let payload = match &self {
            ClientMessage::Connect(p) => serde_json::to_value(p),
            ClientMessage::Sync(p) => serde_json::to_value(p),
            ClientMessage::SubmitEvents(p) => serde_json::to_value(p),
        }
        .expect("client message payloads are always serializable");
        Envelope::new(self.msg_type(), payload).with_msg_id(msg_id)
    }

    pub fn from_envelope(env: &Envelope) -> Result<Self, DecodeError> {
        let map_err = |e: serde_json::Error| DecodeError::MalformedPayload(env.msg_type.clone(), e.to_string());
        match env.msg_type.as_str() {
            "connect" => Ok(ClientMessage::Connect(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            "sync" => Ok(ClientMessage::Sync(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            "submit_events" => Ok(ClientMessage::SubmitEvents(serde_json::from_value(env.payload.clone()).map_err(map_err)?)),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }
}
