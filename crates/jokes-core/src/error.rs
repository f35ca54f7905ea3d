//! Error types for the joke gateway core
//!
//! Provides error handling for:
//! - Startup configuration failures (fatal)
//! - Joke-store processes that cannot be launched or time out
//! - Joke-store output that fails parsing or shape validation
//! - Mutating commands the joke store reports as failed

use std::path::PathBuf;
use std::time::Duration;

/// Joke-store process could not be run to completion
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Executable missing, not executable, or spawn otherwise refused
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was spawned (shim launcher or binary)
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Configured command timeout elapsed; the child was killed
    #[error("joke store did not finish within {}s", after.as_secs())]
    TimedOut {
        /// Configured limit
        after: Duration,
    },
}

/// Joke service failures
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The joke store could not be executed
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// Read command output was a failure, not JSON, or the wrong shape
    #[error("received an invalid joke format: {0}")]
    InvalidFormat(String),

    /// Mutating command reported failure
    #[error("joke store command `{command}` failed")]
    OperationFailed {
        /// Store command name (`add`, `delete`)
        command: &'static str,
    },
}

impl ServiceError {
    /// Whether the joke store was never reached
    #[inline]
    #[must_use]
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

/// Startup configuration errors
///
/// Any of these prevents the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required setting absent from every source
    #[error("{0} is not set")]
    Missing(&'static str),

    /// Setting present but unusable
    #[error("invalid {key}: {reason}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for the expected keys
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// Create invalid-setting error
    #[inline]
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
