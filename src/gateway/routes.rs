//! Gateway introspection endpoints.
//!
//! Three JSON endpoints sit next to the transparent proxy: on-demand
//! fingerprint generation, the active-session listing, and a health payload.
//! Everything else falls through to the reverse proxy.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::error;

use crate::fingerprint::FingerprintPayload;
use crate::gateway::proxy::proxy_handler;
use crate::gateway::registry::SessionEntry;
use crate::gateway::server::GatewayState;

/// Successful fingerprint-on-demand response.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub status: String,
    pub profile_id: String,
    pub fingerprint: FingerprintPayload,
}

/// Error envelope for introspection endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

/// Active-session listing.
#[derive(Debug, Serialize)]
pub struct ActiveResponse {
    pub status: String,
    pub active_fingerprints: Vec<SessionEntry>,
    pub count: usize,
}

/// Health payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub orbita_path: String,
    pub active_fingerprints: usize,
    pub gologin_configured: bool,
}

/// Builds the gateway router: introspection routes plus the proxy fallback.
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/gologin/generate", get(generate_fingerprint))
        .route("/gologin/active", get(list_active))
        .route("/health", get(health))
        .fallback(proxy_handler)
        .with_state(state)
}

/// `GET /gologin/generate` — fetch a fingerprint on demand.
async fn generate_fingerprint(State(state): State<GatewayState>) -> Response {
    match state
        .fingerprint
        .fetch(&state.settings.os_type, state.settings.os_spec.as_deref())
        .await
    {
        Ok(descriptor) => Json(GenerateResponse {
            status: "success".to_string(),
            profile_id: descriptor.session_id.clone(),
            fingerprint: descriptor.payload,
        })
        .into_response(),
        Err(err) => {
            error!(error = %err, "on-demand fingerprint generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: "error".to_string(),
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /gologin/active` — sessions currently believed open.
async fn list_active(State(state): State<GatewayState>) -> Json<ActiveResponse> {
    let active = state.registry.snapshot();
    Json(ActiveResponse {
        status: "success".to_string(),
        count: active.len(),
        active_fingerprints: active,
    })
}

/// `GET /health` — gateway health summary.
async fn health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        orbita_path: state.settings.orbita_path.display().to_string(),
        active_fingerprints: state.registry.len(),
        gologin_configured: state.settings.token_configured(),
    })
}
