//! Browser launch pipeline: argument composition and process supervision.
//!
//! The launcher path runs `sweep → fetch fingerprint → prepare profile →
//! build args → spawn → wait → reclaim`; the gateway path reuses the same
//! supervisor in keep-alive mode for the automation backend.

pub mod args;
pub mod supervisor;

pub use args::{build_launch_args, BASELINE_FLAGS};
pub use supervisor::{
    ExitOutcome, LaunchError, ProcessHandle, ProcessSupervisor, StdioMode, SupervisorConfig,
    SupervisorState,
};
