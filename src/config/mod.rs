//! Configuration module for portflow
//!
//! This module handles:
//! - Component profiles loaded from a directory of TOML files ([`ConfigStore`])
//! - Process-wide runtime settings ([`RuntimeConfig`])
//!
//! # Config Directory Location
//!
//! The profile directory is resolved in this order:
//! 1. An explicit path in [`RuntimeConfig::config_dir`]
//! 2. The `PORTFLOW_CONFIG_DIR` environment variable
//! 3. `./config` if it exists
//! 4. The platform config directory (`~/.config/portflow/` on Linux)
//!
//! # Example
//!
//! ```ignore
//! use portflow::config::{ConfigStore, RuntimeConfig};
//!
//! let config = RuntimeConfig::default();
//! let store = ConfigStore::load_dir(config.resolve_config_dir().unwrap())?;
//! let profile = store.resolve("cartesian_interpolator", &["default"], true, &["period"])?;
//! ```

pub mod profile;

pub use profile::{ConfigProfile, ConfigStore, CONFIG_FILE_EXTENSION};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application identifier for the platform config directory
pub const APP_ID: &str = "portflow";

/// Environment variable overriding the profile directory
pub const CONFIG_DIR_ENV: &str = "PORTFLOW_CONFIG_DIR";

/// Directory searched relative to the working directory
pub const LOCAL_CONFIG_DIR: &str = "config";

/// Default component period in milliseconds
pub const DEFAULT_PERIOD_MS: u64 = 10;

/// Platform config directory for portflow
pub fn platform_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Process-wide runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Explicit profile directory; skips the search when set
    #[serde(default)]
    pub config_dir: Option<PathBuf>,

    /// Period used by components whose profile sets none
    #[serde(default = "default_period", with = "duration_ms")]
    pub default_period: Duration,
}

fn default_period() -> Duration {
    Duration::from_millis(DEFAULT_PERIOD_MS)
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_dir: None,
            default_period: default_period(),
        }
    }
}

impl RuntimeConfig {
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Find the profile directory, or `None` if no candidate exists
    ///
    /// An explicit directory is returned even if it does not exist, so that
    /// loading reports the error instead of silently using another directory.
    pub fn resolve_config_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.config_dir {
            return Some(dir.clone());
        }
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(dir));
        }
        let local = PathBuf::from(LOCAL_CONFIG_DIR);
        if local.is_dir() {
            return Some(local);
        }
        platform_config_dir().filter(|p| p.is_dir())
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
