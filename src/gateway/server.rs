//! Gateway HTTP server.
//!
//! Binds the listener, wires the introspection routes and proxy fallback
//! together with CORS and tracing middleware, and supports graceful
//! shutdown through a watch channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::GatewaySettings;
use crate::fingerprint::FingerprintClient;
use crate::gateway::registry::ActiveSessionRegistry;
use crate::gateway::routes::create_router;

/// Application state shared across all gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Resolved gateway settings.
    pub settings: Arc<GatewaySettings>,
    /// Retrying fingerprint client.
    pub fingerprint: FingerprintClient,
    /// Sessions currently believed open.
    pub registry: ActiveSessionRegistry,
    /// HTTP client used for proxy pass-through.
    pub http: reqwest::Client,
}

impl GatewayState {
    /// Assembles the shared state. The proxy client gets a connect timeout
    /// but no overall deadline: automation calls legitimately run long.
    pub fn new(
        settings: Arc<GatewaySettings>,
        fingerprint: FingerprintClient,
        registry: ActiveSessionRegistry,
    ) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            settings,
            fingerprint,
            registry,
            http,
        }
    }
}

/// HTTP gateway server.
pub struct GatewayServer {
    port: u16,
    enabled: bool,
    state: GatewayState,
    shutdown_tx: Option<watch::Sender<bool>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl GatewayServer {
    /// Creates a new server instance around existing state.
    pub fn new(port: u16, state: GatewayState) -> Self {
        Self {
            port,
            enabled: false,
            state,
            shutdown_tx: None,
            server_handle: None,
        }
    }

    /// Get the server port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Check if the server is running.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get a clone of the application state.
    pub fn state(&self) -> GatewayState {
        self.state.clone()
    }

    /// Configure CORS for browser-based automation clients.
    fn configure_cors() -> CorsLayer {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
                header::ORIGIN,
            ])
            .max_age(Duration::from_secs(3600))
    }

    /// Build the router with all middleware.
    fn build_router(&self) -> Router {
        create_router(self.state.clone())
            .layer(Self::configure_cors())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the HTTP server.
    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.enabled {
            warn!("gateway server is already running");
            return Ok(());
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.build_router();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let listener = TcpListener::bind(addr).await?;
        info!("gateway listening on http://{}", addr);

        self.enabled = true;

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    while !*shutdown_rx.borrow() {
                        if shutdown_rx.changed().await.is_err() {
                            break;
                        }
                    }
                    info!("gateway shutting down gracefully");
                })
                .await
                .unwrap_or_else(|e| {
                    error!("gateway server error: {}", e);
                });
        });

        self.server_handle = Some(handle);

        Ok(())
    }

    /// Stop the HTTP server gracefully.
    pub async fn stop(&mut self) {
        if !self.enabled {
            warn!("gateway server is not running");
            return;
        }

        info!("stopping gateway server...");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }

        if let Some(handle) = self.server_handle.take() {
            tokio::select! {
                _ = handle => {
                    info!("gateway server stopped");
                }
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    warn!("gateway shutdown timed out");
                }
            }
        }

        self.enabled = false;
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}
