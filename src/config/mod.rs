//! Configuration module for orbita-gateway.
//!
//! This module provides configuration management for the gateway, including:
//! - Loading settings from files (TOML/JSON)
//! - Environment variable overrides
//! - CLI argument parsing
//! - Validation and defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use orbita_gateway::config::GatewaySettings;
//!
//! // Load from defaults plus environment
//! let settings = GatewaySettings::from_env();
//!
//! // Load from a specific file
//! let settings = GatewaySettings::from_file("gateway.toml").unwrap();
//! ```

mod settings;

pub use settings::{CliArgs, ConfigError, GatewaySettings};
