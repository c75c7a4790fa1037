//! Switchboard server library.
//!
//! Provides a reusable server function to serve Switchboard either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod cors;
mod health;

use std::{net::SocketAddr, time::Duration};

use anyhow::anyhow;
use axum::{Router, routing::get};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use config::Config;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

/// How long in-flight streams may continue after shutdown was requested.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Configuration for serving Switchboard.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized Switchboard TOML configuration.
    pub config: Config,
    /// Cancelled to stop accepting connections and shut the server down.
    pub shutdown: CancellationToken,
}

/// Starts and runs the Switchboard server with the provided configuration.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown,
    }: ServeConfig,
) -> anyhow::Result<()> {
    let mut app = Router::new();

    let cors = match &config.server.cors {
        Some(cors_config) => cors::generate(cors_config),
        None => CorsLayer::permissive(),
    };

    let mut llm_exposed = false;

    if config.llm.enabled() {
        match llm::router(&config.llm) {
            Ok(llm_router) => {
                app = app.merge(llm_router.layer(cors.clone()));
                llm_exposed = true;
            }
            Err(e) => {
                log::error!("Failed to initialize LLM router: {e}");
            }
        }
    } else {
        log::debug!("LLM endpoints are disabled in the configuration");
    }

    if config.server.health.enabled {
        if let Some(listen) = config.server.health.listen {
            let health_server = health::bind_health_endpoint(
                listen,
                config.server.tls.clone(),
                config.server.health.clone(),
                shutdown.clone(),
            );

            tokio::spawn(async move {
                if let Err(e) = health_server.await {
                    log::error!("Health endpoint failed: {e}");
                }
            });
        } else {
            let health_router = Router::new()
                .route(&config.server.health.path, get(health::health))
                .layer(cors.clone());

            app = app.merge(health_router);
        }
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    if !llm_exposed {
        log::warn!("Server starting with no functional endpoints. Configure LLM providers to enable functionality.");
    }

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            if llm_exposed {
                log::info!("LLM endpoints available at: https://{listen_address}{}", config.llm.path);
            }

            let handle = Handle::new();
            tokio::spawn(shutdown_on_cancel(handle.clone(), shutdown));

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
        }
        None => {
            if llm_exposed {
                log::info!("LLM endpoints available at: http://{listen_address}{}", config.llm.path);
            }

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
                .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;
        }
    }

    log::info!("Server stopped");

    Ok(())
}

/// Drains an `axum-server` instance once the token is cancelled.
pub(crate) async fn shutdown_on_cancel(handle: Handle, shutdown: CancellationToken) {
    shutdown.cancelled().await;
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
}
