//! Configuration loading.
//!
//! Settings come from a YAML document.  The built-in
//! [`config/application.yaml`](DEFAULTS) is always loaded first; an optional
//! user file is deep-merged over it.  Both are run through `${VAR}` /
//! `${VAR:default}` interpolation before merging, so:
//!
//! * every built-in setting can be overridden from the environment, and
//! * a user file that writes `${VAR}` without a default makes `VAR`
//!   mandatory: if it is unset, loading fails instead of guessing.

mod error;
mod placeholder;

pub use error::{ConfigError, ConfigResult};

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use placeholder::duration;

/// The built-in defaults document.
pub const DEFAULTS: &str = include_str!("../../config/application.yaml");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    pub beers: BeersSettings,
    pub server: ServerSettings,
}

/// Everything the poller needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BeersSettings {
    pub url: String,
    #[serde(with = "duration")]
    pub initial_delay: Duration,
    #[serde(with = "duration")]
    pub fixed_delay: Duration,
    /// Limit for one request including its body; `0s` means none.
    #[serde(with = "duration")]
    pub timeout: Duration,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl BeersSettings {
    /// The HTTP request timeout, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetrySettings {
    pub attempts: u32,
    #[serde(with = "duration")]
    pub delay: Duration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CircuitBreakerSettings {
    /// Consecutive failed fetches before the circuit opens.
    pub attempts: u32,
    /// Base pause before a fetch that follows a failed one.
    #[serde(with = "duration")]
    pub delay: Duration,
    pub multiplier: f64,
    #[serde(with = "duration")]
    pub max_delay: Duration,
    /// How long the circuit stays open before a probe.
    #[serde(with = "duration")]
    pub reset: Duration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Pause before each item streamed by `GET /beers`.
    #[serde(with = "duration")]
    pub emit_delay: Duration,
}

impl ServerSettings {
    pub fn addr(&self) -> ConfigResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::invalid("server.host", format!("{e}")))
    }
}

impl Settings {
    /// Load the defaults, plus `path` if given, resolving placeholders from
    /// the process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load) with an explicit variable lookup, so tests
    /// don't have to touch the process environment.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overlay = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Some(text)
            }
            None => None,
        };
        Self::from_layers(overlay.as_deref(), &lookup)
    }

    /// Build settings from the defaults plus a YAML overlay.
    #[cfg(test)]
    pub fn from_yaml_str<F>(overlay: &str, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_layers(Some(overlay), &lookup)
    }

    fn from_layers<F>(overlay: Option<&str>, lookup: &F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = parse_layer(DEFAULTS, lookup)?;
        if let Some(overlay) = overlay {
            merge(&mut merged, parse_layer(overlay, lookup)?);
        }

        let settings: Settings = serde_yaml::from_value(merged)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> ConfigResult<()> {
        let beers = &self.beers;
        reqwest::Url::parse(&beers.url).map_err(|e| ConfigError::invalid("beers.url", e.to_string()))?;
        if beers.retry.attempts == 0 {
            return Err(ConfigError::invalid("beers.retry.attempts", "must be at least 1"));
        }
        if beers.circuit_breaker.attempts == 0 {
            return Err(ConfigError::invalid("beers.circuit-breaker.attempts", "must be at least 1"));
        }
        let multiplier = beers.circuit_breaker.multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "beers.circuit-breaker.multiplier",
                format!("must be a finite number >= 1, got {multiplier}"),
            ));
        }
        self.server.addr()?;
        Ok(())
    }
}

fn parse_layer<F>(text: &str, lookup: &F) -> ConfigResult<Value>
where
    F: Fn(&str) -> Option<String>,
{
    let mut value: Value = serde_yaml::from_str(text)?;
    // An empty document parses as null; treat it as "no overrides".
    if value.is_null() {
        return Ok(Value::Mapping(Default::default()));
    }
    placeholder::resolve_tree(&mut value, "", lookup)?;
    Ok(value)
}

/// Deep-merge `overlay` into `base`: mappings merge key by key, anything else
/// in the overlay replaces what was there.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
