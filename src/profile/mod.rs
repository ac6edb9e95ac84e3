//! Per-session browser profile directories.
//!
//! Each session gets an isolated on-disk profile keyed by its session
//! identifier, seeded with a minimal `Default/Preferences` document derived
//! from the fingerprint. Profile operations are best-effort: a profile is a
//! nicety, not a requirement, so failures here log a warning and the launch
//! proceeds without one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::fingerprint::FingerprintDescriptor;

/// Handle to one session's profile directory.
///
/// An empty handle (no path) means preparation failed and the session runs
/// without persistent profile state.
#[derive(Debug, Clone)]
pub struct ProfileHandle {
    /// Session identifier the profile belongs to.
    pub session_id: String,
    /// Directory on disk, when preparation succeeded.
    pub path: Option<PathBuf>,
}

impl ProfileHandle {
    /// A handle with no backing directory.
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            path: None,
        }
    }
}

/// Creates, reclaims, and sweeps per-session profile directories under a
/// fixed root.
#[derive(Debug, Clone)]
pub struct ProfileManager {
    root: PathBuf,
}

impl ProfileManager {
    /// Creates a manager rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The profile root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Prepares a profile directory for the descriptor's session.
    ///
    /// Writes a minimal preference document: geolocation default-deny plus
    /// the descriptor's accept-language string. A failure to create or write
    /// is logged and yields an empty handle — never an error.
    pub fn prepare(&self, descriptor: &FingerprintDescriptor) -> ProfileHandle {
        let dir = self.root.join(&descriptor.session_id);

        match self.write_preferences(&dir, descriptor) {
            Ok(()) => {
                debug!(path = %dir.display(), "profile prepared");
                ProfileHandle {
                    session_id: descriptor.session_id.clone(),
                    path: Some(dir),
                }
            }
            Err(err) => {
                warn!(
                    session_id = %descriptor.session_id,
                    error = %err,
                    "failed to prepare profile, launching without one"
                );
                ProfileHandle::empty(descriptor.session_id.clone())
            }
        }
    }

    fn write_preferences(
        &self,
        dir: &Path,
        descriptor: &FingerprintDescriptor,
    ) -> io::Result<()> {
        let default_dir = dir.join("Default");
        fs::create_dir_all(&default_dir)?;

        // Chrome preference schema: content setting 2 = deny.
        let preferences = json!({
            "profile": {
                "default_content_setting_values": {
                    "geolocation": 2
                }
            },
            "intl": {
                "accept_languages": descriptor.languages()
            }
        });

        fs::write(
            default_dir.join("Preferences"),
            serde_json::to_vec(&preferences)?,
        )
    }

    /// Deletes the handle's directory. Idempotent and best-effort.
    pub fn reclaim(&self, handle: &ProfileHandle) {
        let Some(path) = &handle.path else {
            return;
        };

        match fs::remove_dir_all(path) {
            Ok(()) => debug!(path = %path.display(), "profile reclaimed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to reclaim profile");
            }
        }
    }

    /// Removes profile directories whose last modification is older than
    /// `max_age`. Returns how many were removed.
    ///
    /// Individual directory errors are logged and skipped; a missing root
    /// simply means nothing to sweep.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return 0,
            Err(err) => {
                warn!(root = %self.root.display(), error = %err, "cannot scan profile root");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| mtime.elapsed().ok());

            match age {
                Some(age) if age > max_age => match fs::remove_dir_all(&path) {
                    Ok(()) => {
                        debug!(path = %path.display(), age_secs = age.as_secs(), "swept stale profile");
                        removed += 1;
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "failed to sweep profile");
                    }
                },
                _ => {}
            }
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{FingerprintPayload, NavigatorInfo};

    fn sample_descriptor() -> FingerprintDescriptor {
        FingerprintDescriptor::from_payload(FingerprintPayload {
            navigator: NavigatorInfo {
                user_agent: "UA".to_string(),
                resolution: "1920x1080".to_string(),
                language: "fr-FR,fr,en".to_string(),
                platform: "Linux x86_64".to_string(),
                hardware_concurrency: None,
                device_memory: None,
            },
            canvas: None,
            webgl_metadata: None,
        })
    }

    #[test]
    fn test_prepare_writes_preferences() {
        let root = tempfile::tempdir().unwrap();
        let manager = ProfileManager::new(root.path());
        let descriptor = sample_descriptor();

        let handle = manager.prepare(&descriptor);
        let path = handle.path.as_ref().expect("profile should be created");
        assert_eq!(path, &root.path().join(&descriptor.session_id));

        let raw = fs::read_to_string(path.join("Default").join("Preferences")).unwrap();
        let prefs: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            prefs["profile"]["default_content_setting_values"]["geolocation"],
            2
        );
        assert_eq!(prefs["intl"]["accept_languages"], "fr-FR,fr,en");
    }

    #[test]
    fn test_reclaim_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let manager = ProfileManager::new(root.path());
        let handle = manager.prepare(&sample_descriptor());

        let path = handle.path.clone().unwrap();
        assert!(path.exists());

        manager.reclaim(&handle);
        assert!(!path.exists());

        // Second reclaim must not panic or log an error path
        manager.reclaim(&handle);
        manager.reclaim(&ProfileHandle::empty("never-created"));
    }

    #[test]
    fn test_sweep_removes_only_stale_directories() {
        let root = tempfile::tempdir().unwrap();
        let manager = ProfileManager::new(root.path());

        let stale = manager.prepare(&sample_descriptor());
        std::thread::sleep(Duration::from_millis(20));

        // Everything is older than a zero cutoff
        assert_eq!(manager.sweep(Duration::ZERO), 1);
        assert!(!stale.path.unwrap().exists());

        // A fresh profile survives a generous cutoff
        let fresh = manager.prepare(&sample_descriptor());
        assert_eq!(manager.sweep(Duration::from_secs(3600)), 0);
        assert!(fresh.path.unwrap().exists());
    }

    #[test]
    fn test_sweep_missing_root_is_noop() {
        let manager = ProfileManager::new("/nonexistent/orbita-gateway-test");
        assert_eq!(manager.sweep(Duration::from_secs(1)), 0);
    }

    #[test]
    fn test_sweep_ignores_plain_files() {
        let root = tempfile::tempdir().unwrap();
        let manager = ProfileManager::new(root.path());
        let file = root.path().join("stray.txt");
        fs::write(&file, "keep me").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(manager.sweep(Duration::ZERO), 0);
        assert!(file.exists());
    }
}
