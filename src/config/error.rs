//! Errors raised while loading [`Settings`](super::Settings).

use std::path::PathBuf;

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything that can stop the configuration from loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A key was referenced but nothing provides its value.
    #[error("{key} has no value{}", unset_hint(.var))]
    MissingValue { key: String, var: Option<String> },

    #[error("{key}: unterminated ${{...}} placeholder")]
    UnterminatedPlaceholder { key: String },

    #[error("{key}: {reason}")]
    Invalid { key: String, reason: String },
}

fn unset_hint(var: &Option<String>) -> String {
    match var {
        Some(var) => format!(": environment variable {var} is not set and no default is given"),
        None => String::new(),
    }
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
