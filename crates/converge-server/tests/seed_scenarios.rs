//! Escenarios semilla de punta a punta (spec.md §8).

use std::sync::Arc;

use converge_core::store::InMemorySyncStore;
use converge_core::wire::{ClientMessage, ConnectPayload, Envelope, ErrorCode, ServerMessage, SubmitEventsPayload, SubmitItem, SubmitStatus, SyncPayload};
use converge_server::collaborators::{AllowAllAuth, AllowAllAuthorizer, NoopValidator};
use converge_server::config::ServerConfig;
use converge_server::session::{ServerSession, SystemClock};
use converge_server::SessionRegistry;

async fn connected_session(
    connection_id: &str,
    client_id: &str,
    store: Arc<InMemorySyncStore>,
    registry: Arc<SessionRegistry>,
) -> (ServerSession, tokio::sync::mpsc::UnboundedReceiver<Envelope>) {
    let (mut session, mut rx) = ServerSession::new(
        connection_id.to_string(),
        store,
        registry,
        Arc::new(AllowAllAuth),
        Arc::new(AllowAllAuthorizer),
        Arc::new(NoopValidator),
        Arc::new(SystemClock),
        ServerConfig::default(),
    );
    let connect = ClientMessage::Connect(ConnectPayload { token: "tok".into(), client_id: client_id.into() }).into_envelope(None);
    session.handle_envelope(b"connect", &connect).await;
    let env = rx.try_recv().expect("connected reply");
    assert_eq!(env.msg_type, "connected");
    (session, rx)
}

fn decode(env: Envelope) -> ServerMessage {
    ServerMessage::from_envelope(&env).unwrap()
}

#[tokio::test]
async fn handshake_then_empty_sync() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut session, mut rx) = connected_session("c1", "client-1", store, registry).await;

    let sync = ClientMessage::Sync(SyncPayload { partitions: vec!["P1".into()], since_committed_id: 0, limit: None }).into_envelope(None);
    session.handle_envelope(b"sync", &sync).await;

    match decode(rx.try_recv().unwrap()) {
        ServerMessage::SyncResponse(p) => {
            assert_eq!(p.partitions, vec!["P1".to_string()]);
            assert!(p.events.is_empty());
            assert_eq!(p.next_since_committed_id, 0);
            assert!(!p.has_more);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn submit_then_broadcast_to_peer_not_origin() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut c1, mut c1_rx) = connected_session("c1", "client-1", store.clone(), registry.clone()).await;
    let (mut c2, mut c2_rx) = connected_session("c2", "client-2", store.clone(), registry.clone()).await;

    let sync = ClientMessage::Sync(SyncPayload { partitions: vec!["P1".into()], since_committed_id: 0, limit: None }).into_envelope(None);
    c2.handle_envelope(b"sync", &sync).await;
    c2_rx.try_recv().unwrap(); // drain c2's own sync_response

    let submit = ClientMessage::SubmitEvents(SubmitEventsPayload {
        events: vec![SubmitItem { id: "evt-1".into(), partitions: vec!["P1".into()], event: serde_json::json!({"a": 1}) }],
    })
    .into_envelope(None);
    c1.handle_envelope(b"submit", &submit).await;

    match decode(c1_rx.try_recv().unwrap()) {
        ServerMessage::SubmitEventsResult(p) => {
            assert_eq!(p.results.len(), 1);
            assert_eq!(p.results[0].status, SubmitStatus::Committed);
            assert_eq!(p.results[0].committed_id, Some(1));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(c1_rx.try_recv().is_err(), "origin must not receive its own broadcast");

    match decode(c2_rx.try_recv().unwrap()) {
        ServerMessage::EventBroadcast(p) => {
            assert_eq!(p.id, "evt-1");
            assert_eq!(p.committed_id, 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_retry_same_payload_dedupes_without_rebroadcast() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut c1, mut c1_rx) = connected_session("c1", "client-1", store.clone(), registry.clone()).await;
    let (mut c2, mut c2_rx) = connected_session("c2", "client-2", store.clone(), registry.clone()).await;
    let sync = ClientMessage::Sync(SyncPayload { partitions: vec!["P1".into()], since_committed_id: 0, limit: None }).into_envelope(None);
    c2.handle_envelope(b"sync", &sync).await;
    c2_rx.try_recv().unwrap();

    let submit = |event: serde_json::Value| {
        ClientMessage::SubmitEvents(SubmitEventsPayload { events: vec![SubmitItem { id: "evt-1".into(), partitions: vec!["P1".into()], event } ] })
            .into_envelope(None)
    };

    c1.handle_envelope(b"submit", &submit(serde_json::json!({"a": 1}))).await;
    c1_rx.try_recv().unwrap();
    c2_rx.try_recv().unwrap(); // the one and only broadcast

    c1.handle_envelope(b"submit", &submit(serde_json::json!({"a": 1}))).await;
    match decode(c1_rx.try_recv().unwrap()) {
        ServerMessage::SubmitEventsResult(p) => {
            assert_eq!(p.results[0].committed_id, Some(1));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(c2_rx.try_recv().is_err(), "a deduped resubmit must not rebroadcast");
}

#[tokio::test]
async fn same_id_different_payload_is_rejected() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut c1, mut c1_rx) = connected_session("c1", "client-1", store, registry).await;

    let submit = |event: serde_json::Value| {
        ClientMessage::SubmitEvents(SubmitEventsPayload { events: vec![SubmitItem { id: "evt-1".into(), partitions: vec!["P1".into()], event } ] })
            .into_envelope(None)
    };
    c1.handle_envelope(b"submit", &submit(serde_json::json!({"a": 1}))).await;
    c1_rx.try_recv().unwrap();

    c1.handle_envelope(b"submit", &submit(serde_json::json!({"a": 2}))).await;
    match decode(c1_rx.try_recv().unwrap()) {
        ServerMessage::SubmitEventsResult(p) => {
            assert_eq!(p.results[0].status, SubmitStatus::Rejected);
            let errors = p.results[0].errors.as_ref().unwrap();
            assert_eq!(errors[0].field, "event");
            assert_eq!(errors[0].message, "id already committed with different payload");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn paged_catch_up_suppresses_broadcast_until_final_page() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());

    // Seed a submitter session to populate committed ids 1..5 in P1.
    let (mut seeder, mut seeder_rx) = connected_session("seeder", "seeder", store.clone(), registry.clone()).await;
    for i in 1..=5 {
        let submit = ClientMessage::SubmitEvents(SubmitEventsPayload {
            events: vec![SubmitItem { id: format!("evt-{i}"), partitions: vec!["P1".into()], event: serde_json::json!({"i": i}) }],
        })
        .into_envelope(None);
        seeder.handle_envelope(b"submit", &submit).await;
        seeder_rx.try_recv().unwrap();
    }

    let (mut c1, mut c1_rx) = connected_session("c1", "client-1", store.clone(), registry.clone()).await;
    let sync = ClientMessage::Sync(SyncPayload { partitions: vec!["P1".into()], since_committed_id: 0, limit: Some(2) }).into_envelope(None);
    c1.handle_envelope(b"sync", &sync).await;

    let mut seen_ids = Vec::new();
    let mut has_more = true;
    let mut since = 0u64;
    let mut mid_cycle_commit_made = false;
    while has_more {
        match decode(c1_rx.try_recv().unwrap()) {
            ServerMessage::SyncResponse(p) => {
                seen_ids.extend(p.events.iter().map(|e| e.committed_id));
                has_more = p.has_more;
                since = p.next_since_committed_id;
                if has_more {
                    if !mid_cycle_commit_made {
                        // Committed mid-cycle: must not surface as a broadcast
                        // to c1 while its sync cycle is still open.
                        let mid = ClientMessage::SubmitEvents(SubmitEventsPayload {
                            events: vec![SubmitItem { id: "evt-mid".into(), partitions: vec!["P1".into()], event: serde_json::json!({}) }],
                        })
                        .into_envelope(None);
                        seeder.handle_envelope(b"submit", &mid).await;
                        seeder_rx.try_recv().unwrap();
                        assert!(c1_rx.try_recv().is_err(), "broadcast must be suppressed during an open sync cycle");
                        mid_cycle_commit_made = true;
                    }
                    let next = ClientMessage::Sync(SyncPayload { partitions: vec!["P1".into()], since_committed_id: since, limit: Some(2) }).into_envelope(None);
                    c1.handle_envelope(b"sync", &next).await;
                }
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
    assert_eq!(seen_ids, vec![1, 2, 3, 4, 5]);

    // A commit that lands while the cycle was open must not have reached c1
    // as a broadcast before the cycle closed — by this point the cycle is
    // closed, so a fresh commit SHOULD broadcast live.
    let submit = ClientMessage::SubmitEvents(SubmitEventsPayload {
        events: vec![SubmitItem { id: "evt-live".into(), partitions: vec!["P1".into()], event: serde_json::json!({}) }],
    })
    .into_envelope(None);
    seeder.handle_envelope(b"submit", &submit).await;
    seeder_rx.try_recv().unwrap();
    match decode(c1_rx.try_recv().unwrap()) {
        ServerMessage::EventBroadcast(p) => assert_eq!(p.id, "evt-live"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_message_type_is_bad_request_and_keeps_session_open() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut c1, mut c1_rx) = connected_session("c1", "client-1", store, registry).await;

    let bogus = Envelope::new("not_a_real_type", serde_json::json!({}));
    let closed = c1.handle_envelope(b"bogus", &bogus).await;
    assert!(!closed);
    match decode(c1_rx.try_recv().unwrap()) {
        ServerMessage::Error(p) => assert_eq!(p.code, ErrorCode::BadRequest),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_protocol_version_closes_session() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut c1, mut c1_rx) = connected_session("c1", "client-1", store, registry).await;

    let mut env = ClientMessage::Sync(SyncPayload { partitions: vec!["P1".into()], since_committed_id: 0, limit: None }).into_envelope(None);
    env.protocol_version = "9.9".into();
    let closed = c1.handle_envelope(b"sync", &env).await;
    assert!(closed);
    match decode(c1_rx.try_recv().unwrap()) {
        ServerMessage::Error(p) => assert_eq!(p.code, ErrorCode::ProtocolVersionUnsupported),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn empty_partitions_array_is_rejected() {
    let store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut c1, mut c1_rx) = connected_session("c1", "client-1", store, registry).await;

    let submit = ClientMessage::SubmitEvents(SubmitEventsPayload {
        events: vec![SubmitItem { id: "evt-1".into(), partitions: vec![], event: serde_json::json!({}) }],
    })
    .into_envelope(None);
    c1.handle_envelope(b"submit", &submit).await;
    match decode(c1_rx.try_recv().unwrap()) {
        ServerMessage::SubmitEventsResult(p) => assert_eq!(p.results[0].status, SubmitStatus::Rejected),
        other => panic!("unexpected: {other:?}"),
    }
}
