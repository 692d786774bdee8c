use crate::error::{KeymapError, KmResult};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const TIMEOUT_ENV: &str = "KEYMAPPING_TIMEOUT_MS";
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Settings for a [`crate::service::KeyboardService`].
#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryConfig {
    /// Upper bound on a single OS query, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Pass every untranslatable key/modifier pair to the error hook.
    #[arg(long, default_value_t = false)]
    pub report_unresolved: bool,

    /// Query the OS on the calling thread instead of a bounded worker.
    /// Hosts whose platform wants keyboard calls on the main thread (macOS
    /// Text Input Sources) set this and call from that thread.
    #[arg(long, default_value_t = false)]
    pub run_inline: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            report_unresolved: false,
            run_inline: false,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reads a JSON config; absent fields keep their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KmResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KmResult<()> {
        if self.timeout_ms == 0 {
            return Err(KeymapError::Config(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies a textual timeout override such as the value of
    /// `KEYMAPPING_TIMEOUT_MS`.
    pub fn with_timeout_override(mut self, value: Option<&str>) -> KmResult<Self> {
        let Some(raw) = value else {
            return Ok(self);
        };
        self.timeout_ms = raw.trim().parse().map_err(|_| {
            KeymapError::Config(format!("invalid timeout '{}': expected milliseconds", raw))
        })?;
        self.validate()?;
        Ok(self)
    }

    /// Defaults plus the environment override. A bad value is logged and ignored.
    pub fn from_env() -> Self {
        let value = env::var(TIMEOUT_ENV).ok();
        match Self::default().with_timeout_override(value.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring {}: {}", TIMEOUT_ENV, e);
                Self::default()
            }
        }
    }
}
