// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Paperlink server entrypoint.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paperlink_server::{
    api::router,
    config::{env_or_default, AppConfig},
    providers::{FirebaseVerifier, SmsClient},
    state::AppState,
    storage::{
        ContentStore, FsContentStore, MemoryContentStore, MemoryStore, RecordDatabase, RecordStore,
    },
    sweeper::Sweeper,
};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AppConfig::from_env();

    let (records, content): (Arc<dyn RecordStore>, Arc<dyn ContentStore>) =
        match config.data_dir.as_deref() {
            Some(dir) => {
                let root = Path::new(dir);
                std::fs::create_dir_all(root).expect("Failed to create data directory");
                let records = RecordDatabase::open(&root.join("paperlink.redb"))
                    .expect("Failed to open record database");
                let content = FsContentStore::open(root.join("content"))
                    .expect("Failed to open content store");
                info!(data_dir = %dir, "Persistent storage enabled");
                (Arc::new(records), Arc::new(content))
            }
            None => {
                warn!("DATA_DIR is not set; using in-memory storage, all data is lost on restart");
                (
                    Arc::new(MemoryStore::new()),
                    Arc::new(MemoryContentStore::new()),
                )
            }
        };

    let sms = SmsClient::from_env();

    let firebase = if FirebaseVerifier::is_configured() {
        match FirebaseVerifier::from_env() {
            Ok(verifier) => {
                info!(project_id = %verifier.project_id(), "Firebase token verification enabled");
                Some(verifier)
            }
            Err(err) => {
                warn!(error = %err, "Firebase configuration invalid, token verification disabled");
                None
            }
        }
    } else {
        None
    };

    let sweep_interval = config.sweep_interval_secs;
    let host = config.host.clone();
    let port = config.port;

    let state = AppState::new(config, records, content, sms, firebase);

    let shutdown = CancellationToken::new();
    if let Some(secs) = sweep_interval {
        let sweeper = Sweeper::new(
            state.records.clone(),
            state.content.clone(),
            state.sms.clone(),
        )
        .with_interval(Duration::from_secs(secs));
        tokio::spawn(sweeper.run(shutdown.clone()));
    } else {
        info!("SWEEP_INTERVAL_SECS is not set; background sweeper disabled");
    }

    let app = router(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");

    info!(%addr, "Paperlink server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("Server failed");
}

/// Wait for Ctrl-C, then stop the sweeper and let axum drain connections.
async fn shutdown_signal(token: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
    token.cancel();
}

/// JSON logs when `LOG_FORMAT=json`, human-readable console output otherwise.
/// `RUST_LOG` controls the filter (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if env_or_default("LOG_FORMAT", "pretty") == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
