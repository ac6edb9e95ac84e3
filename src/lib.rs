//! # Orbita Gateway
//!
//! A fingerprint-injecting front for headless-browser automation, written in Rust.
//!
//! Orbita Gateway sits between automation clients and an automation backend,
//! swapping the backend's browser for the fingerprint-customized Orbita build
//! and stamping every new session with a fresh identity fetched from the
//! GoLogin API.
//!
//! ## Features
//!
//! - **Fingerprint Client**: remote identity acquisition with bounded retry
//! - **Profile Manager**: isolated per-session profile directories with
//!   age-based sweeping
//! - **Argument Builder**: deterministic browser command-line composition
//! - **Process Supervisor**: launch, monitor, restart, and signal relay for
//!   the browser or backend process
//! - **Session Gateway**: transparent reverse proxy with WebSocket session
//!   interception and introspection endpoints
//!
//! ## Module Overview
//!
//! - [`fingerprint`]: descriptor types and the retrying GoLogin client
//! - [`profile`]: per-session profile directory lifecycle
//! - [`launch`]: argument building and process supervision
//! - [`gateway`]: HTTP server, reverse proxy, session registry
//! - [`config`]: configuration loading and management
//!
//! ## Architecture
//!
//! ```text
//! client ──ws──▶ Session Gateway ──ws──▶ automation backend ──▶ Orbita
//!                   │    │                       ▲
//!                   │    └── Fingerprint Client  │
//!                   │            │               │
//!                   │     Profile Manager ── Argument Builder
//!                   │            │
//!                   └──── Process Supervisor ────┘
//! ```
//!
//! ## Configuration
//!
//! Configuration follows a precedence chain:
//! 1. Default values
//! 2. Configuration file (TOML/JSON)
//! 3. Environment variables (`GOLOGIN_*`, `ORBITA_PATH`, ...)
//! 4. CLI arguments
//!
//! See [`config::GatewaySettings`] for all available options.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Full version string with name
pub const FULL_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Module Exports
// ============================================================================

/// Configuration management for loading settings from files, env, and CLI.
pub mod config;

/// Fingerprint descriptor types and the retrying GoLogin API client.
pub mod fingerprint;

/// Per-session browser profile directory lifecycle.
pub mod profile;

/// Browser argument composition and process supervision.
pub mod launch;

/// HTTP gateway: reverse proxy, session interception, introspection.
pub mod gateway;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

// Config types
pub use config::{CliArgs, ConfigError, GatewaySettings};

// Fingerprint types
pub use fingerprint::{
    FingerprintApi, FingerprintClient, FingerprintDescriptor, FingerprintError,
    FingerprintPayload, GoLoginApi, NavigatorInfo, RenderToggle,
};

// Profile types
pub use profile::{ProfileHandle, ProfileManager};

// Launch types
pub use launch::{
    build_launch_args, ExitOutcome, LaunchError, ProcessHandle, ProcessSupervisor, StdioMode,
    SupervisorConfig, SupervisorState, BASELINE_FLAGS,
};

// Gateway types
pub use gateway::{ActiveSessionRegistry, GatewayServer, GatewayState, SessionEntry};

// ============================================================================
// Prelude Module
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use orbita_gateway::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{CliArgs, GatewaySettings};
    pub use crate::fingerprint::{FingerprintClient, FingerprintDescriptor};
    pub use crate::gateway::{ActiveSessionRegistry, GatewayServer, GatewayState};
    pub use crate::launch::{build_launch_args, ProcessSupervisor, SupervisorConfig};
    pub use crate::profile::ProfileManager;
    pub use crate::{FULL_VERSION, NAME, VERSION};
}
