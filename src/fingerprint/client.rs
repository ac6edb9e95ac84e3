//! GoLogin fingerprint API client.
//!
//! Fetches a fresh browser identity from the remote fingerprint-generation
//! service, with bounded retry. The HTTP transport sits behind the
//! [`FingerprintApi`] trait so retry behavior and gateway handlers can be
//! exercised against mock transports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GatewaySettings;
use crate::fingerprint::descriptor::{FingerprintDescriptor, FingerprintPayload};

/// Timeout for a single fingerprint request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised by fingerprint acquisition.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The HTTP request itself failed (connect, timeout, body).
    #[error("fingerprint request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("fingerprint API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },

    /// All attempts were exhausted. Callers must treat this as a
    /// session-abort condition, not a transient failure.
    #[error("fingerprint service unavailable after {attempts} attempts: {source}")]
    Unavailable {
        /// Total attempts made.
        attempts: u32,
        /// The last underlying error.
        #[source]
        source: Box<FingerprintError>,
    },
}

/// Raw transport to the fingerprint service.
#[async_trait]
pub trait FingerprintApi: Send + Sync {
    /// Performs a single fetch of a fingerprint payload for the requested OS.
    async fn fetch_raw(
        &self,
        os_type: &str,
        os_spec: Option<&str>,
    ) -> Result<FingerprintPayload, FingerprintError>;
}

/// The production transport: bearer-authorized GET against the GoLogin API.
pub struct GoLoginApi {
    http: reqwest::Client,
    api_url: String,
    token: String,
    workspace: Option<String>,
}

impl GoLoginApi {
    /// Builds a transport from gateway settings.
    ///
    /// An absent token is passed through as an empty bearer value; config
    /// validation rejects that long before a request is made.
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.api_token.clone().unwrap_or_default(),
            workspace: settings.workspace.clone(),
        }
    }
}

#[async_trait]
impl FingerprintApi for GoLoginApi {
    async fn fetch_raw(
        &self,
        os_type: &str,
        os_spec: Option<&str>,
    ) -> Result<FingerprintPayload, FingerprintError> {
        let url = format!("{}/browser/fingerprint", self.api_url);

        let mut query: Vec<(&str, &str)> = vec![("os", os_type)];
        if let Some(spec) = os_spec {
            query.push(("osSpec", spec));
        }
        if let Some(workspace) = self.workspace.as_deref() {
            query.push(("currentWorkspace", workspace));
        }

        debug!(%url, os = os_type, "requesting fingerprint");

        let response = self
            .http
            .get(&url)
            .query(&query)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FingerprintError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<FingerprintPayload>().await?)
    }
}

/// Fingerprint client with bounded linear-backoff retry.
///
/// `retries` counts attempts after the first, so the default of 2 makes
/// 3 attempts total, sleeping `attempt × 1s` between them.
#[derive(Clone)]
pub struct FingerprintClient {
    api: Arc<dyn FingerprintApi>,
    retries: u32,
}

impl FingerprintClient {
    /// Wraps a transport with the given retry bound.
    pub fn new(api: Arc<dyn FingerprintApi>, retries: u32) -> Self {
        Self { api, retries }
    }

    /// Builds the production client from gateway settings.
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        Self::new(
            Arc::new(GoLoginApi::from_settings(settings)),
            settings.fingerprint_retries,
        )
    }

    /// Fetches a fingerprint and binds a fresh session identifier to it.
    ///
    /// Retries transparently; when every attempt fails the result is
    /// [`FingerprintError::Unavailable`] carrying the last underlying error.
    pub async fn fetch(
        &self,
        os_type: &str,
        os_spec: Option<&str>,
    ) -> Result<FingerprintDescriptor, FingerprintError> {
        let attempts = self.retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.api.fetch_raw(os_type, os_spec).await {
                Ok(payload) => {
                    let descriptor = FingerprintDescriptor::from_payload(payload);
                    debug!(session_id = %descriptor.session_id, "fingerprint acquired");
                    return Ok(descriptor);
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "fingerprint fetch failed");
                    if attempt >= attempts {
                        return Err(FingerprintError::Unavailable {
                            attempts,
                            source: Box::new(err),
                        });
                    }
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::descriptor::NavigatorInfo;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample_payload() -> FingerprintPayload {
        FingerprintPayload {
            navigator: NavigatorInfo {
                user_agent: "UA".to_string(),
                resolution: "1920x1080".to_string(),
                language: "en-US,en".to_string(),
                platform: "Linux x86_64".to_string(),
                hardware_concurrency: Some(4),
                device_memory: Some(8),
            },
            canvas: None,
            webgl_metadata: None,
        }
    }

    /// Transport that fails a fixed number of times before succeeding.
    struct FlakyApi {
        calls: AtomicU32,
        failures: u32,
    }

    impl FlakyApi {
        fn new(failures: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
            }
        }
    }

    #[async_trait]
    impl FingerprintApi for FlakyApi {
        async fn fetch_raw(
            &self,
            _os_type: &str,
            _os_spec: Option<&str>,
        ) -> Result<FingerprintPayload, FingerprintError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(FingerprintError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            } else {
                Ok(sample_payload())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let api = Arc::new(FlakyApi::new(0));
        let client = FingerprintClient::new(api.clone(), 2);

        let descriptor = client.fetch("lin", None).await.unwrap();
        assert_eq!(descriptor.resolution(), "1920x1080");
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let api = Arc::new(FlakyApi::new(2));
        let client = FingerprintClient::new(api.clone(), 2);

        let descriptor = client.fetch("lin", None).await.unwrap();
        assert_eq!(descriptor.user_agent(), "UA");
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_three_attempts() {
        let api = Arc::new(FlakyApi::new(u32::MAX));
        let client = FingerprintClient::new(api.clone(), 2);

        let start = tokio::time::Instant::now();
        let err = client.fetch("lin", None).await.unwrap_err();

        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
        match err {
            FingerprintError::Unavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Unavailable, got {other}"),
        }
        // Linear backoff: 1s after attempt 1 plus 2s after attempt 2.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_single_attempt() {
        let api = Arc::new(FlakyApi::new(u32::MAX));
        let client = FingerprintClient::new(api.clone(), 0);

        let start = tokio::time::Instant::now();
        let err = client.fetch("win", Some("11")).await.unwrap_err();

        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            FingerprintError::Unavailable { attempts: 1, .. }
        ));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
