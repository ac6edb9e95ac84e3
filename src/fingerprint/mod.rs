//! Fingerprint acquisition for orbita-gateway.
//!
//! A fingerprint is a bundle of browser-identity signals (user agent,
//! resolution, language, hardware hints, rendering toggles) fetched from the
//! remote GoLogin API and bound to exactly one browser session. This module
//! holds the wire types and the retrying HTTP client.
//!
//! # Example
//!
//! ```rust,no_run
//! use orbita_gateway::config::GatewaySettings;
//! use orbita_gateway::fingerprint::FingerprintClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = GatewaySettings::from_env();
//! let client = FingerprintClient::from_settings(&settings);
//! let descriptor = client.fetch(&settings.os_type, settings.os_spec.as_deref()).await?;
//! println!("session {} as {}", descriptor.session_id, descriptor.user_agent());
//! # Ok(())
//! # }
//! ```

mod client;
mod descriptor;

pub use client::{FingerprintApi, FingerprintClient, FingerprintError, GoLoginApi};
pub use descriptor::{FingerprintDescriptor, FingerprintPayload, NavigatorInfo, RenderToggle};
