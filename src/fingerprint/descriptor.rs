//! Fingerprint descriptor types.
//!
//! These types mirror the JSON payload returned by the GoLogin fingerprint
//! API. A descriptor is immutable once fetched: it is owned by the session
//! that requested it and discarded when the session ends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Navigator-level identity signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorInfo {
    /// User agent string presented to remote sites.
    pub user_agent: String,

    /// Screen resolution as `"WxH"`, e.g. `"1920x1080"`.
    pub resolution: String,

    /// Accepted languages, comma-separated with the primary first,
    /// e.g. `"en-US,en"`.
    pub language: String,

    /// Navigator platform string, e.g. `"Win32"` or `"MacIntel"`.
    pub platform: String,

    /// Reported logical CPU count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_concurrency: Option<u32>,

    /// Reported device memory in GiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_memory: Option<u32>,
}

/// Behavior toggle for a rendering surface (canvas or WebGL).
///
/// The API ships more metadata per surface; only `mode` drives launch
/// behavior, so the rest is ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderToggle {
    /// `"off"` disables the surface; any other value leaves it untouched.
    #[serde(default)]
    pub mode: String,
}

/// The raw fingerprint document as returned by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintPayload {
    /// Navigator identity signals.
    pub navigator: NavigatorInfo,

    /// Canvas behavior, when the API specifies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<RenderToggle>,

    /// WebGL behavior, when the API specifies one.
    #[serde(
        default,
        rename = "webGLMetadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub webgl_metadata: Option<RenderToggle>,
}

/// A fetched fingerprint bound to a session identifier.
///
/// The identifier is generated locally after a successful fetch; the remote
/// API knows nothing about it. Each descriptor has exactly one profile
/// directory and at most one live browser process at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintDescriptor {
    /// Unique session identifier (UUID v4), process-wide.
    pub session_id: String,

    /// The fingerprint document itself.
    #[serde(flatten)]
    pub payload: FingerprintPayload,
}

impl FingerprintDescriptor {
    /// Binds a freshly generated session identifier to a fetched payload.
    pub fn from_payload(payload: FingerprintPayload) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            payload,
        }
    }

    /// The user agent string.
    pub fn user_agent(&self) -> &str {
        &self.payload.navigator.user_agent
    }

    /// The raw `"WxH"` resolution string.
    pub fn resolution(&self) -> &str {
        &self.payload.navigator.resolution
    }

    /// The full accept-language string, primary first.
    pub fn languages(&self) -> &str {
        &self.payload.navigator.language
    }

    /// The primary language, i.e. everything before the first comma.
    pub fn primary_language(&self) -> &str {
        self.payload
            .navigator
            .language
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
    }

    /// The navigator platform string.
    pub fn platform(&self) -> &str {
        &self.payload.navigator.platform
    }

    /// Device memory hint in GiB, when reported.
    pub fn device_memory(&self) -> Option<u32> {
        self.payload.navigator.device_memory
    }

    /// Whether the canvas surface should be disabled at launch.
    pub fn canvas_disabled(&self) -> bool {
        matches!(&self.payload.canvas, Some(c) if c.mode == "off")
    }

    /// Whether WebGL should be disabled at launch.
    pub fn webgl_disabled(&self) -> bool {
        matches!(&self.payload.webgl_metadata, Some(w) if w.mode == "off")
    }
}
