//! Integration tests for the gateway introspection endpoints
//!
//! Exercises /health, /gologin/active, and /gologin/generate against the
//! real router with a mock fingerprint transport, plus the proxy fallback
//! when the backend is unreachable.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use orbita_gateway::{
    config::GatewaySettings,
    fingerprint::{
        FingerprintApi, FingerprintClient, FingerprintError, FingerprintPayload, NavigatorInfo,
    },
    gateway::{create_router, ActiveSessionRegistry, GatewayState},
};

/// Mock fingerprint transports for API testing
mod mock {
    use super::*;
    use async_trait::async_trait;

    pub fn sample_payload() -> FingerprintPayload {
        FingerprintPayload {
            navigator: NavigatorInfo {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
                resolution: "1920x1080".to_string(),
                language: "en-US,en".to_string(),
                platform: "Linux x86_64".to_string(),
                hardware_concurrency: Some(8),
                device_memory: Some(8),
            },
            canvas: None,
            webgl_metadata: None,
        }
    }

    /// Transport that always succeeds.
    pub struct HealthyApi;

    #[async_trait]
    impl FingerprintApi for HealthyApi {
        async fn fetch_raw(
            &self,
            _os_type: &str,
            _os_spec: Option<&str>,
        ) -> Result<FingerprintPayload, FingerprintError> {
            Ok(sample_payload())
        }
    }

    /// Transport that always fails.
    pub struct DownApi;

    #[async_trait]
    impl FingerprintApi for DownApi {
        async fn fetch_raw(
            &self,
            _os_type: &str,
            _os_spec: Option<&str>,
        ) -> Result<FingerprintPayload, FingerprintError> {
            Err(FingerprintError::Status {
                status: 503,
                body: "service down".to_string(),
            })
        }
    }
}

fn test_settings() -> GatewaySettings {
    GatewaySettings {
        api_token: Some("test-token".to_string()),
        // Nothing listens here: proxy tests expect a 502
        backend_port: 1,
        ..Default::default()
    }
}

fn state_with(api: Arc<dyn FingerprintApi>) -> GatewayState {
    let settings = Arc::new(test_settings());
    // No retries: endpoint failures should surface immediately in tests
    let fingerprint = FingerprintClient::new(api, 0);
    GatewayState::new(settings, fingerprint, ActiveSessionRegistry::new())
}

async fn get_json(state: GatewayState, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let state = state_with(Arc::new(mock::HealthyApi));
    let (status, body) = get_json(state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orbita_path"], "/usr/bin/orbita-browser");
    assert_eq!(body["active_fingerprints"], 0);
    assert_eq!(body["gologin_configured"], true);
}

#[tokio::test]
async fn test_health_without_token() {
    let settings = Arc::new(GatewaySettings {
        backend_port: 1,
        ..Default::default()
    });
    let fingerprint = FingerprintClient::new(Arc::new(mock::HealthyApi), 0);
    let state = GatewayState::new(settings, fingerprint, ActiveSessionRegistry::new());

    let (status, body) = get_json(state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gologin_configured"], false);
}

#[tokio::test]
async fn test_generate_returns_fingerprint() {
    let state = state_with(Arc::new(mock::HealthyApi));
    let (status, body) = get_json(state, "/gologin/generate").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(!body["profile_id"].as_str().unwrap().is_empty());
    assert_eq!(body["fingerprint"]["navigator"]["resolution"], "1920x1080");
}

#[tokio::test]
async fn test_generate_failure_returns_500() {
    let state = state_with(Arc::new(mock::DownApi));
    let (status, body) = get_json(state, "/gologin/generate").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn test_active_lists_recorded_sessions() {
    let state = state_with(Arc::new(mock::HealthyApi));

    let (status, body) = get_json(state.clone(), "/gologin/active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let descriptor =
        orbita_gateway::fingerprint::FingerprintDescriptor::from_payload(mock::sample_payload());
    state.registry.insert(&descriptor);

    let (status, body) = get_json(state, "/gologin/active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 1);
    assert_eq!(
        body["active_fingerprints"][0]["session_id"],
        descriptor.session_id.as_str()
    );
}

fn ws_upgrade_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("connection", "Upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_ws_upgrade_records_session() {
    let state = state_with(Arc::new(mock::HealthyApi));
    let response = create_router(state.clone())
        .oneshot(ws_upgrade_request("/devtools/browser/abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_ws_upgrade_proceeds_when_fingerprint_fails() {
    // Fingerprint service down: the upgrade must still be accepted, the
    // session just runs without a fresh identity.
    let state = state_with(Arc::new(mock::DownApi));
    let response = create_router(state.clone())
        .oneshot(ws_upgrade_request("/devtools/browser/abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(state.registry.len(), 0);
}

#[tokio::test]
async fn test_unknown_path_is_proxied() {
    // The backend is down, so the fallthrough surfaces as a proxy error
    // rather than a 404 from the gateway's own router.
    let state = state_with(Arc::new(mock::HealthyApi));
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/json/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_proxied_post_preserves_method() {
    let state = state_with(Arc::new(mock::HealthyApi));
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/function")
                .body(Body::from(r#"{"code":"return 1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // Reaches the forwarding path (and its unreachable backend), not a 405
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
