//! Integration tests for fingerprint acquisition
//!
//! Retry behavior and error surfacing for the fingerprint client, driven
//! through the transport seam with a paused clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use orbita_gateway::fingerprint::{
    FingerprintApi, FingerprintClient, FingerprintError, FingerprintPayload, NavigatorInfo,
};

fn payload() -> FingerprintPayload {
    FingerprintPayload {
        navigator: NavigatorInfo {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
            resolution: "2560x1440".to_string(),
            language: "de-DE,de,en".to_string(),
            platform: "Win32".to_string(),
            hardware_concurrency: Some(12),
            device_memory: Some(16),
        },
        canvas: None,
        webgl_metadata: None,
    }
}

/// Transport that records every request and fails a fixed number of times.
struct CountingApi {
    calls: AtomicU32,
    failures: u32,
}

impl CountingApi {
    fn failing(failures: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures,
        }
    }
}

#[async_trait]
impl FingerprintApi for CountingApi {
    async fn fetch_raw(
        &self,
        _os_type: &str,
        _os_spec: Option<&str>,
    ) -> Result<FingerprintPayload, FingerprintError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(FingerprintError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            })
        } else {
            Ok(payload())
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_descriptor_carries_session_identity() {
    let client = FingerprintClient::new(Arc::new(CountingApi::failing(0)), 2);

    let first = client.fetch("win", None).await.unwrap();
    let second = client.fetch("win", None).await.unwrap();

    assert_eq!(first.user_agent(), second.user_agent());
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(first.primary_language(), "de-DE");
    assert_eq!(first.languages(), "de-DE,de,en");
}

#[tokio::test(start_paused = true)]
async fn test_three_failures_exhaust_the_default_retries() {
    let api = Arc::new(CountingApi::failing(3));
    let client = FingerprintClient::new(api.clone(), 2);

    let start = tokio::time::Instant::now();
    let err = client.fetch("lin", None).await.unwrap_err();

    // Exactly 3 attempts, never a 4th even though it would have succeeded
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    // Linear backoff injected 1s + 2s of delay
    assert_eq!(start.elapsed(), Duration::from_secs(3));

    let FingerprintError::Unavailable { attempts, source } = err else {
        panic!("expected Unavailable");
    };
    assert_eq!(attempts, 3);
    assert!(matches!(
        *source,
        FingerprintError::Status { status: 502, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_last_attempt_success_is_not_an_error() {
    // Fails twice, succeeds on the third and final attempt
    let api = Arc::new(CountingApi::failing(2));
    let client = FingerprintClient::new(api.clone(), 2);

    let descriptor = client.fetch("lin", Some("ubuntu")).await.unwrap();
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    assert_eq!(descriptor.resolution(), "2560x1440");
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_is_session_abort_shaped() {
    let client = FingerprintClient::new(Arc::new(CountingApi::failing(u32::MAX)), 1);

    let err = client.fetch("mac", None).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("unavailable after 2 attempts"));
    assert!(message.contains("502"));
}
