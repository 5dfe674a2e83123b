use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Errors raised while loading settings from disk.
///
/// These only surface from the explicit load entry points; the session
/// itself never reads configuration files on its own.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Settings for a joystick session.
///
/// The defaults match the reference device setup: `/dev/input/js0`, a 2
/// second uniform retry interval, and a 5 second bound on shutdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickSettings {
    /// Path of the joystick device special file.
    pub device_path: PathBuf,

    /// Uniform wait between device probes and post-failure retries, in
    /// milliseconds. There is no backoff: device reappearance is not
    /// latency-sensitive.
    pub retry_interval_ms: u64,

    /// How long shutdown waits for the worker to exit before proceeding
    /// anyway, in milliseconds.
    pub shutdown_timeout_ms: u64,

    /// Capacity of the broadcast channel carrying change events.
    pub event_capacity: usize,
}

impl Default for JoystickSettings {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/input/js0"),
            retry_interval_ms: 2000,
            shutdown_timeout_ms: 5000,
            event_capacity: 256,
        }
    }
}

impl JoystickSettings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&raw)?;
        debug!("Loaded joystick settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings from the conventional per-user location, falling back
    /// to the defaults when no usable file exists.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_config_path() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(settings) => {
                info!("Using joystick settings from {}", path.display());
                settings
            }
            Err(e) => {
                debug!("Falling back to default settings: {}", e);
                Self::default()
            }
        }
    }

    /// Conventional config location, e.g. `~/.config/joyport/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("joyport").join("config.toml"))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
