//! Browser command-line composition.
//!
//! Translates a fingerprint descriptor, an optional profile directory, and
//! caller-supplied arguments into the final Orbita argument list. Building is
//! a pure function: identical inputs always yield the identical ordered list.

use crate::fingerprint::FingerprintDescriptor;
use crate::profile::ProfileHandle;

/// Stability and sandboxing flags applied to every launch unless the
/// accumulated list already carries a flag with the same name.
pub const BASELINE_FLAGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-background-timer-throttling",
    "--disable-renderer-backgrounding",
    "--disable-background-networking",
    "--disable-ipc-flooding-protection",
    "--enable-features=NetworkService,NetworkServiceInProcess",
    "--remote-debugging-port=0",
    "--allow-pre-commit-input",
];

/// The flag name of an argument: everything before the first `=`.
fn flag_name(arg: &str) -> &str {
    arg.split('=').next().unwrap_or(arg)
}

/// Builds the launch argument list.
///
/// Caller arguments come first, then fingerprint-derived flags, then the
/// baseline set — each baseline flag added only when nothing earlier shares
/// its flag name, so caller- and fingerprint-derived flags win.
///
/// Values are not validated: a resolution without an `x` separator produces
/// a malformed `--window-size` value rather than an error.
pub fn build_launch_args(
    descriptor: &FingerprintDescriptor,
    profile: &ProfileHandle,
    caller_args: &[String],
) -> Vec<String> {
    let mut args: Vec<String> = caller_args.to_vec();

    if let Some(path) = &profile.path {
        args.push(format!("--user-data-dir={}", path.display()));
    }

    if !descriptor.user_agent().is_empty() {
        args.push(format!("--user-agent={}", descriptor.user_agent()));
    }

    let mut parts = descriptor.resolution().splitn(2, 'x');
    let width = parts.next().unwrap_or("");
    let height = parts.next().unwrap_or("");
    args.push(format!("--window-size={width},{height}"));

    args.push(format!("--lang={}", descriptor.primary_language()));
    args.push(format!("--accept-lang={}", descriptor.languages()));

    if descriptor.platform().contains("Mac") {
        args.push("--disable-font-subpixel-positioning".to_string());
    }

    let memory_mb = u64::from(descriptor.device_memory().unwrap_or(8)) * 1024;
    args.push(format!("--js-flags=--max-old-space-size={memory_mb}"));

    if descriptor.canvas_disabled() {
        args.push("--disable-reading-from-canvas".to_string());
        args.push("--disable-accelerated-2d-canvas".to_string());
    }

    if descriptor.webgl_disabled() {
        args.push("--disable-webgl".to_string());
        args.push("--disable-webgl2".to_string());
    }

    for baseline in BASELINE_FLAGS {
        let name = flag_name(baseline);
        if !args.iter().any(|arg| flag_name(arg) == name) {
            args.push((*baseline).to_string());
        }
    }

    args
}
