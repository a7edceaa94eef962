//! Binario de demostración: conecta un servidor en memoria y dos clientes en
//! proceso de punta a punta — connect, submit, broadcast, catch-up sync — la
//! misma forma de "correr todo el pipeline en un proceso" usada para la
//! demo del motor de flujos, redirigida al motor de sincronización
//! (spec.md §4).

mod config;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use converge_client::config::ClientConfig;
use converge_client::runtime::ClientRuntime;
use converge_client::transport::in_process::InProcessTransport;
use converge_core::model::Draft;
use converge_core::store::{ClientStore, InMemoryClientStore, InMemorySyncStore};
use converge_core::wire::Envelope;
use converge_server::collaborators::{AllowAllAuth, AllowAllAuthorizer, NoopValidator};
use converge_server::session::{ServerSession, SystemClock};
use converge_server::SessionRegistry;

use crate::config::CONFIG;

fn new_session(
    connection_id: &str,
    sync_store: Arc<InMemorySyncStore>,
    registry: Arc<SessionRegistry>,
) -> (mpsc::UnboundedSender<Envelope>, mpsc::UnboundedReceiver<Envelope>) {
    let (mut session, server_to_client_rx) = ServerSession::new(
        connection_id,
        sync_store,
        registry,
        Arc::new(AllowAllAuth),
        Arc::new(AllowAllAuthorizer),
        Arc::new(NoopValidator),
        Arc::new(SystemClock),
        CONFIG.server.clone(),
    );

    let (client_to_server_tx, mut client_to_server_rx) = mpsc::unbounded_channel::<Envelope>();
    tokio::spawn(async move {
        while let Some(env) = client_to_server_rx.recv().await {
            if session.handle_envelope(b"demo", &env).await {
                break;
            }
        }
    });

    (client_to_server_tx, server_to_client_rx)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(CONFIG.log_filter.clone())).init();

    let sync_store = Arc::new(InMemorySyncStore::new());
    let registry = Arc::new(SessionRegistry::new());

    let (writer_to_server, server_to_writer) = new_session("writer", sync_store.clone(), registry.clone());
    let (reader_to_server, server_to_reader) = new_session("reader", sync_store.clone(), registry.clone());

    let writer_store = Arc::new(InMemoryClientStore::new());
    let reader_store = Arc::new(InMemoryClientStore::new());

    let mut reader = ClientRuntime::new(
        Box::new(InProcessTransport::new(reader_to_server, server_to_reader)),
        reader_store.clone(),
        ClientConfig::default(),
        "demo-token",
        "reader",
        vec!["docs/readme".into()],
    );
    tokio::spawn(async move {
        if let Err(e) = reader.run().await {
            tracing::warn!(error = %e, "reader runtime exited");
        }
    });
    // Give the reader time to complete its handshake and register in the
    // broadcast scope before the writer's commit lands.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Seeding the draft before `run()` starts exercises the same startup
    // drain path as the draft-on-reconnect scenario (spec.md §4.8): the
    // writer's handshake sync finds nothing to catch up on, then drains and
    // submits this draft.
    writer_store
        .insert_draft(Draft {
            id: "welcome-edit".into(),
            client_id: "writer".into(),
            partitions: vec!["docs/readme".into()],
            event: json!({ "kind": "append", "text": "hello from the demo binary" }),
            draft_clock: 0,
            created_at: 0,
        })
        .expect("insert_draft");

    let mut writer = ClientRuntime::new(
        Box::new(InProcessTransport::new(writer_to_server, server_to_writer)),
        writer_store.clone(),
        ClientConfig::default(),
        "demo-token",
        "writer",
        vec!["docs/readme".into()],
    );
    let writer_task = tokio::spawn(async move {
        if let Err(e) = writer.run().await {
            tracing::warn!(error = %e, "writer runtime exited");
        }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("committed events so far: {}", sync_store.max_committed_id());
    println!("reader's drafts outstanding: {}", reader_store.load_drafts_ordered().len());

    writer_task.abort();
}
