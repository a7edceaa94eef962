//! Envelope de wire (spec.md §6): la forma literal que toma todo mensaje en
//! el wire, antes de decodificarse en un `ClientMessage`/`ServerMessage`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::PROTOCOL_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: Value,
    pub protocol_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl Envelope {
    pub fn new(msg_type: impl Into<String>, payload: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload,
            protocol_version: PROTOCOL_VERSION.to_string(),
            msg_id: None,
            timestamp: None,
        }
    }

    pub fn with_msg_id(mut self, msg_id: Option<String>) -> Self {
        self.msg_id = msg_id;
        self
    }

    pub fn is_supported_version(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}
