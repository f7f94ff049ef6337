use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RigConfig {
    /// Root directory for persisted artifacts; screenshots land in a
    /// per-session subdirectory keyed by session id.
    pub artifacts_root: PathBuf,
    /// Default for sessions that do not specify `headless` themselves.
    pub headless: bool,
    /// Budget applied to navigation and wait operations.
    pub navigation_timeout_ms: u64,
}

impl Default for RigConfig {
    fn default() -> Self {
        let artifacts_root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webrig")
            .join("artifacts");
        Self {
            artifacts_root,
            headless: true,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl RigConfig {
    /// Environment overrides on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var("WEBRIG_ARTIFACTS_DIR") {
            config.artifacts_root = PathBuf::from(root);
        }
        if let Ok(headless) = std::env::var("WEBRIG_HEADLESS") {
            config.headless = headless != "0" && !headless.eq_ignore_ascii_case("false");
        }
        if let Ok(timeout) = std::env::var("WEBRIG_NAV_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.navigation_timeout_ms = ms;
            }
        }
        config
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}
