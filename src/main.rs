// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use edge_auth_gate::api::router;
use edge_auth_gate::auth::{EnvSecretStore, FileSecretStore, SecretStore};
use edge_auth_gate::config::{GateConfig, LogFormat, ServerConfig};
use edge_auth_gate::state::AppState;

/// Time in-flight requests get to finish after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let server = ServerConfig::from_env().expect("Invalid server configuration");
    init_tracing(server.log_format);

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = GateConfig::from_env().expect("Invalid gate configuration");
    info!(
        issuer = %config.issuer,
        auth_domain = %config.auth_domain,
        client_id = %config.client_id,
        "Loaded gate configuration"
    );

    let secrets: Arc<dyn SecretStore> = match &server.secrets_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Resolving secrets from mounted files");
            Arc::new(FileSecretStore::new(dir))
        }
        None => Arc::new(EnvSecretStore),
    };

    let state = AppState::new(config, secrets).expect("Failed to initialize gate");
    let app = router(state, &server.origin_dir);

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, draining connections");
                handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            }
        }
    });

    let addr = server.addr;
    match &server.tls {
        Some((cert, key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .expect("Failed to load TLS certificate and key");
            info!(origin_dir = %server.origin_dir.display(), "Edge auth gate listening on https://{addr}");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            info!(origin_dir = %server.origin_dir.display(), "Edge auth gate listening on http://{addr}");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTP server failed");
        }
    }
}
