//! Joke-store process invocation
//!
//! Runs the external joke-store executable once per operation and
//! classifies the outcome:
//! - Argument vector: `[shim.., binary, db_path, command, params..]`
//! - Stdout is captured whole before classification, never streamed
//! - Success is decided by exactly one `SuccessPolicy` per invoker
//!
//! Invocations are never retried; `add` and `delete` are not idempotent
//! from this layer's point of view.

use crate::config::StoreConfig;
use crate::error::ExecutionError;
use crate::types::CommandResult;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;

/// Stdout prefix signalling failure under `SuccessPolicy::Sentinel`
pub const ERROR_SENTINEL: &str = "ERROR";

/// How a finished joke-store process is judged successful
///
/// Pinned per deployment to match the joke-store build in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessPolicy {
    /// Exit status zero means success
    #[default]
    ExitCode,
    /// Stdout not starting with `ERROR_SENTINEL` means success
    Sentinel,
}

impl SuccessPolicy {
    /// Classify a finished process
    #[inline]
    #[must_use]
    pub fn succeeded(self, status: ExitStatus, output: &str) -> bool {
        match self {
            Self::ExitCode => status.success(),
            Self::Sentinel => !output.starts_with(ERROR_SENTINEL),
        }
    }

    /// Stable name used in configuration
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExitCode => "exit-code",
            Self::Sentinel => "sentinel",
        }
    }
}

impl fmt::Display for SuccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exit-code" | "exit_code" | "exitcode" => Ok(Self::ExitCode),
            "sentinel" => Ok(Self::Sentinel),
            other => Err(format!("unknown success policy `{other}` (expected `exit-code` or `sentinel`)")),
        }
    }
}

/// Launcher prefixed when the joke store targets another CPU architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchShim {
    /// Architecture the joke-store binary was built for (`std::env::consts::ARCH` naming)
    pub expected_arch: String,
    /// Launcher program and its arguments
    pub launcher: Vec<String>,
}

impl ArchShim {
    /// Shim for `expected_arch` using the platform's default launcher
    #[must_use]
    pub fn new(expected_arch: impl Into<String>) -> Self {
        let expected_arch = expected_arch.into();
        let launcher = Self::default_launcher(&expected_arch);
        Self {
            expected_arch,
            launcher,
        }
    }

    /// Replace the launcher
    #[must_use]
    pub fn with_launcher(mut self, launcher: Vec<String>) -> Self {
        self.launcher = launcher;
        self
    }

    /// `arch -<arch>` on macOS, `qemu-<arch>` user-mode emulation elsewhere
    #[must_use]
    pub fn default_launcher(arch: &str) -> Vec<String> {
        if cfg!(target_os = "macos") {
            vec!["arch".to_owned(), format!("-{arch}")]
        } else {
            vec![format!("qemu-{arch}")]
        }
    }

    /// Whether the shim is needed on a host of `host_arch`
    #[inline]
    #[must_use]
    pub fn applies_to(&self, host_arch: &str) -> bool {
        self.expected_arch != host_arch
    }
}

/// Executes joke-store commands
#[async_trait::async_trait]
pub trait CommandInvoker: Send + Sync {
    /// Run the store with `args` after the binary and database path
    ///
    /// # Errors
    /// Returns `ExecutionError` only if the process could not be run at all;
    /// a store-reported failure is a `CommandResult` with `succeeded = false`.
    async fn invoke(&self, args: &[String]) -> Result<CommandResult, ExecutionError>;
}

/// Invoker for the real joke-store executable
#[derive(Debug, Clone)]
pub struct JokeStoreInvoker {
    binary: PathBuf,
    db_path: PathBuf,
    policy: SuccessPolicy,
    shim: Option<ArchShim>,
    host_arch: &'static str,
    timeout: Option<Duration>,
}

impl JokeStoreInvoker {
    /// Create invoker with exit-code policy, no shim and no timeout
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            db_path: db_path.into(),
            policy: SuccessPolicy::default(),
            shim: None,
            host_arch: std::env::consts::ARCH,
            timeout: None,
        }
    }

    /// Build from validated store configuration
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        let mut invoker = Self::new(&config.binary, &config.db_path).with_policy(config.success_policy);
        invoker.shim = config.arch_shim.clone();
        invoker.timeout = config.command_timeout;
        invoker
    }

    /// With success policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: SuccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With architecture shim
    #[inline]
    #[must_use]
    pub fn with_arch_shim(mut self, shim: ArchShim) -> Self {
        self.shim = Some(shim);
        self
    }

    /// With command timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Pretend to run on `host_arch` when deciding whether to shim
    #[doc(hidden)]
    #[must_use]
    pub fn with_host_arch(mut self, host_arch: &'static str) -> Self {
        self.host_arch = host_arch;
        self
    }

    fn active_shim(&self) -> Option<&[String]> {
        self.shim
            .as_ref()
            .filter(|shim| shim.applies_to(self.host_arch))
            .map(|shim| shim.launcher.as_slice())
            .filter(|launcher| !launcher.is_empty())
    }

    /// Full argument vector for `args`, program first
    #[must_use]
    pub fn argv(&self, args: &[String]) -> Vec<OsString> {
        let shim = self.active_shim().unwrap_or_default();
        let mut argv = Vec::with_capacity(shim.len() + 2 + args.len());
        argv.extend(shim.iter().map(OsString::from));
        argv.push(self.binary.clone().into_os_string());
        argv.push(self.db_path.clone().into_os_string());
        argv.extend(args.iter().map(OsString::from));
        argv
    }
}

#[async_trait::async_trait]
impl CommandInvoker for JokeStoreInvoker {
    async fn invoke(&self, args: &[String]) -> Result<CommandResult, ExecutionError> {
        let mut argv = self.argv(args).into_iter();
        let program = argv
            .next()
            .unwrap_or_else(|| self.binary.clone().into_os_string());
        tracing::debug!(?program, args = ?args, "invoking joke store");

        let mut command = Command::new(&program);
        command
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawned = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| ExecutionError::TimedOut { after: limit })?,
            None => command.output().await,
        };
        let output = spawned.map_err(|source| ExecutionError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %String::from_utf8_lossy(&output.stderr), "joke store stderr");
        }
        tracing::debug!(status = %output.status, stdout = %stdout, "joke store finished");

        let succeeded = self.policy.succeeded(output.status, &stdout);
        Ok(CommandResult::from_status(succeeded, stdout, output.status))
    }
}
