//! # Runtime configuration.
//!
//! Provides [`Config`], the centralized settings of the service runtime.
//!
//! Config is used in three ways:
//! 1. **Runtime creation**: `Runtime::builder(config)`
//! 2. **Service defaults**: restart/backoff for specs that don't override them
//! 3. **Service settings**: factories read their own section via
//!    [`ServiceContext::settings`](crate::ServiceContext::settings)
//!
//! ## Sources
//! - [`Config::default`]
//! - [`Config::from_json_file`] (every field optional)
//! - [`Config::apply_env`] overlays `RUNTIME_HOST`, `RUNTIME_PORT`,
//!   `RUNTIME_GRACE_SECS`, `RUNTIME_LOG_PRETTY`
//!
//! ## File format
//! ```json
//! {
//!   "grace": 10,
//!   "restart": { "kind": "on_failure", "max_restarts": 5, "reset_after": 30 },
//!   "backoff": { "first": 500, "max": 15000, "factor": 2.0, "jitter": "equal" },
//!   "control": { "enabled": true, "host": "127.0.0.1", "port": 6060 },
//!   "services": { "thumbnails": { "workers": 4 } }
//! }
//! ```
//! `grace` and `reset_after` are seconds, backoff durations are milliseconds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use thiserror::Error;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Environment variable overriding the control endpoint host.
pub const ENV_HOST: &str = "RUNTIME_HOST";
/// Environment variable overriding the control endpoint port.
pub const ENV_PORT: &str = "RUNTIME_PORT";
/// Environment variable overriding the shutdown grace (seconds).
pub const ENV_GRACE_SECS: &str = "RUNTIME_GRACE_SECS";
/// Environment variable enabling pretty log output.
pub const ENV_LOG_PRETTY: &str = "RUNTIME_LOG_PRETTY";

/// Errors produced while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path:?}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config document is malformed.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Settings of the control endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Serve the control endpoint at all.
    pub enabled: bool,
    /// Bind host.
    pub host: String,
    /// Bind port (`0` picks an ephemeral port).
    pub port: u16,
}

impl Default for ControlConfig {
    /// `127.0.0.1:6060`, enabled.
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 6060,
        }
    }
}

impl ControlConfig {
    /// Returns `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Global configuration for the service runtime.
///
/// ## Field semantics
/// - `grace`: how long draining waits for services to exit before abandoning them
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `restart` / `backoff`: defaults for services without overrides
/// - `control`: control endpoint listener
/// - `log_pretty`: human-oriented log output in the binary
/// - `services`: opaque per-service settings keyed by service name
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum time to wait for services to exit during shutdown.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers lagging more than this many events skip the oldest ones.
    pub bus_capacity: usize,

    /// Default restart policy.
    pub restart: RestartPolicy,

    /// Default restart backoff.
    pub backoff: BackoffPolicy,

    /// Control endpoint settings.
    pub control: ControlConfig,

    /// Pretty (multi-line, colored) log output.
    pub log_pretty: bool,

    /// Per-service settings sections.
    pub services: BTreeMap<String, serde_json::Value>,
}

impl Default for Config {
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    /// - `restart = RestartPolicy::default()`
    /// - `backoff = BackoffPolicy::default()`
    /// - `control = 127.0.0.1:6060`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            control: ControlConfig::default(),
            log_pretty: false,
            services: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the control endpoint address, `None` when it is disabled.
    pub fn control_addr(&self) -> Option<String> {
        self.control.enabled.then(|| self.control.addr())
    }

    /// Parses a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Overlays process environment variables onto `self`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|var| std::env::var(var).ok())
    }

    /// Overlays variables resolved by `lookup`. Empty values are ignored.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let get = |var| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_HOST) {
            self.control.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.control.port = parse_var(ENV_PORT, port)?;
        }
        if let Some(grace) = get(ENV_GRACE_SECS) {
            self.grace = Duration::from_secs(parse_var(ENV_GRACE_SECS, grace)?);
        }
        if let Some(pretty) = get(ENV_LOG_PRETTY) {
            self.log_pretty = parse_var(ENV_LOG_PRETTY, pretty)?;
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = Config::from_json_str("{}").unwrap();
        assert_eq!(cfg.grace, Duration::from_secs(10));
        assert_eq!(cfg.control, ControlConfig::default());
        assert_eq!(cfg.restart, RestartPolicy::default());
    }

    #[test]
    fn parses_full_document() {
        let cfg = Config::from_json_str(
            r#"{
                "grace": 3,
                "bus_capacity": 0,
                "restart": { "kind": "never" },
                "control": { "port": 7070 },
                "services": { "thumbnails": { "workers": 4 } }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.grace, Duration::from_secs(3));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.restart, RestartPolicy::Never);
        assert_eq!(cfg.control_addr().as_deref(), Some("127.0.0.1:7070"));
        assert_eq!(cfg.services["thumbnails"]["workers"], 4);
    }

    #[test]
    fn env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_PORT, "9999"),
            (ENV_HOST, "0.0.0.0"),
            (ENV_GRACE_SECS, " 2 "),
            (ENV_LOG_PRETTY, ""),
        ]);
        let mut cfg = Config::default();
        cfg.apply_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.control.addr(), "0.0.0.0:9999");
        assert_eq!(cfg.grace, Duration::from_secs(2));
        assert!(!cfg.log_pretty);
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_vars(|k| (k == ENV_PORT).then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_PORT, .. }));
    }
}
