//! Envelope de wire y taxonomía de errores (spec.md §6, §7).

mod client_msg;
mod envelope;
mod error_code;
mod server_msg;

pub use client_msg::{ClientMessage, ConnectPayload, SubmitEventsPayload, SubmitItem, SyncPayload};
pub use envelope::Envelope;
pub use error_code::{ErrorCode, SessionEffect};
pub use server_msg::{
    ConnectedPayload, EventBroadcastPayload, ErrorPayload, FieldError, ServerMessage, SubmitEventsResultPayload, SubmitResultEntry, SubmitStatus,
    SyncResponsePayload,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_round_trips_through_envelope() {
        let msg = ClientMessage::Sync(SyncPayload { partitions: vec!["p1".into()], since_committed_id: 3, limit: Some(10) });
        let env = msg.into_envelope(Some("abc".into()));
        assert_eq!(env.msg_type, "sync");
        assert_eq!(env.msg_id.as_deref(), Some("abc"));
        assert!(env.is_supported_version());
        let decoded = ClientMessage::from_envelope(&env).unwrap();
        match decoded {
            ClientMessage::Sync(p) => {
                assert_eq!(p.partitions, vec!["p1".to_string()]);
                assert_eq!(p.since_committed_id, 3);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let env = Envelope::new("not_a_real_type", serde_json::json!({}));
        assert!(ClientMessage::from_envelope(&env).is_err());
    }
}
