//! De punta a punta: un `ClientRuntime` hablando con un `ServerSession` real
//! sobre un par de transporte en proceso — el análogo del lado cliente de
//! los propios tests de escenarios semilla de `converge-server`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use converge_client::config::ClientConfig;
use converge_client::runtime::ClientRuntime;
use converge_client::transport::in_process::InProcessTransport;
use converge_core::model::Draft;
use converge_core::store::{ClientStore, InMemoryClientStore, InMemorySyncStore, SyncStore};
use converge_core::wire::Envelope;
use converge_server::collaborators::{AllowAllAuth, AllowAllAuthorizer, NoopValidator};
use converge_server::config::ServerConfig;
use converge_server::session::{ServerSession, SystemClock};
use converge_server::SessionRegistry;

#[tokio::test]
async fn startup_sync_drains_a_preexisting_draft_and_commits_it() {
    let sync_store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let (mut session, server_to_client_rx) = ServerSession::new(
        "conn-1",
        sync_store.clone(),
        registry,
        Arc::new(AllowAllAuth),
        Arc::new(AllowAllAuthorizer),
        Arc::new(NoopValidator),
        Arc::new(SystemClock),
        ServerConfig::default(),
    );

    let (client_to_server_tx, mut client_to_server_rx) = mpsc::unbounded_channel::<Envelope>();
    tokio::spawn(async move {
        while let Some(env) = client_to_server_rx.recv().await {
            if session.handle_envelope(b"test", &env).await {
                break;
            }
        }
    });

    let client_store = Arc::new(InMemoryClientStore::new());
    client_store
        .insert_draft(Draft { id: "evt-1".into(), client_id: "client-1".into(), partitions: vec!["P1".into()], event: json!({"a": 1}), draft_clock: 0, created_at: 0 })
        .unwrap();

    let transport = InProcessTransport::new(client_to_server_tx, server_to_client_rx);
    let mut runtime = ClientRuntime::new(Box::new(transport), client_store.clone(), ClientConfig::default(), "tok", "client-1", vec!["P1".into()]);

    tokio::spawn(async move {
        let _ = runtime.run().await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(client_store.load_drafts_ordered().is_empty(), "draft must be drained after startup sync");
    assert_eq!(sync_store.max_committed_id(), 1, "the drained draft must be committed server-side");
}
