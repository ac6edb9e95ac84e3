//! HTTP/WebSocket gateway for orbita-gateway.
//!
//! The gateway fronts the automation backend: introspection endpoints under
//! `/gologin/*` and `/health`, everything else reverse-proxied verbatim.
//! New WebSocket sessions are intercepted just long enough to attach a
//! fingerprint before traffic flows through untouched.

pub mod proxy;
pub mod registry;
pub mod routes;
pub mod server;

pub use registry::{ActiveSessionRegistry, SessionEntry};
pub use routes::create_router;
pub use server::{GatewayServer, GatewayState};
