//! Gateway configuration
//!
//! Settings arrive from up to three layers (TOML file, environment,
//! command line) as an all-optional `RawConfig`. Layers are overlaid and
//! then validated once into an immutable `GatewayConfig`; any missing or
//! invalid required setting is a single fatal `ConfigError`.

use crate::error::ConfigError;
use crate::invoker::{ArchShim, SuccessPolicy};
use crate::sanitize::MaxStringLength;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Setting names, as used in the environment and in error messages
pub mod keys {
    /// Joke-store executable
    pub const JOKES_BINARY: &str = "JOKES_BINARY";
    /// Joke-store database file
    pub const JOKES_DB_PATH: &str = "JOKES_DB_PATH";
    /// Accounts service base URL
    pub const ACCOUNTS_SERVICE_URL: &str = "ACCOUNTS_SERVICE_URL";
    /// Maximum sanitized field length
    pub const MAX_STRING_LENGTH: &str = "MAX_STRING_LENGTH";
    /// Listening port
    pub const PORT: &str = "PORT";
    /// Listening address
    pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
    /// Success detection policy
    pub const SUCCESS_POLICY: &str = "JOKES_SUCCESS_POLICY";
    /// Architecture the joke-store binary targets
    pub const BINARY_ARCH: &str = "JOKES_BINARY_ARCH";
    /// Launcher override for foreign-architecture binaries
    pub const ARCH_SHIM: &str = "JOKES_ARCH_SHIM";
    /// Joke-store command timeout
    pub const COMMAND_TIMEOUT_SECS: &str = "JOKES_COMMAND_TIMEOUT_SECS";
    /// Accounts round-trip timeout
    pub const AUTH_TIMEOUT_SECS: &str = "ACCOUNTS_TIMEOUT_SECS";
    /// Log output format
    pub const LOG_FORMAT: &str = "JOKES_LOG_FORMAT";
    /// Optional TOML configuration file
    pub const CONFIG_FILE: &str = "JOKES_CONFIG";
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}` (expected `text` or `json`)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Unvalidated settings from one source
///
/// Every value is kept as text so that the file, environment and command
/// line are validated by the same rules.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jokes_binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jokes_db_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts_service_url: Option<String>,
    #[serde(default, deserialize_with = "stringly", skip_serializing_if = "Option::is_none")]
    pub max_string_length: Option<String>,
    #[serde(default, deserialize_with = "stringly", skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch_shim: Option<String>,
    #[serde(default, deserialize_with = "stringly", skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<String>,
    #[serde(default, deserialize_with = "stringly", skip_serializing_if = "Option::is_none")]
    pub auth_timeout_secs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_format: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stringly {
    Text(String),
    Int(i64),
}

fn stringly<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Stringly>::deserialize(deserializer)?.map(|value| match value {
        Stringly::Text(s) => s,
        Stringly::Int(n) => n.to_string(),
    }))
}

impl RawConfig {
    /// Load a TOML configuration file
    ///
    /// # Errors
    /// `ConfigError::Read` if the file cannot be read, `ConfigError::Parse`
    /// if it is not valid TOML or contains unknown keys.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns the TOML error for malformed input or unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overlay `higher` on top of `self`; values set in `higher` win
    #[must_use]
    pub fn overlay(self, higher: RawConfig) -> RawConfig {
        RawConfig {
            jokes_binary: higher.jokes_binary.or(self.jokes_binary),
            jokes_db_path: higher.jokes_db_path.or(self.jokes_db_path),
            accounts_service_url: higher.accounts_service_url.or(self.accounts_service_url),
            max_string_length: higher.max_string_length.or(self.max_string_length),
            port: higher.port.or(self.port),
            bind_address: higher.bind_address.or(self.bind_address),
            success_policy: higher.success_policy.or(self.success_policy),
            binary_arch: higher.binary_arch.or(self.binary_arch),
            arch_shim: higher.arch_shim.or(self.arch_shim),
            command_timeout_secs: higher.command_timeout_secs.or(self.command_timeout_secs),
            auth_timeout_secs: higher.auth_timeout_secs.or(self.auth_timeout_secs),
            log_format: higher.log_format.or(self.log_format),
        }
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns the serializer error, which does not occur for string-only values.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// Joke-store invocation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Joke-store executable
    pub binary: PathBuf,
    /// Database file handed to the executable
    pub db_path: PathBuf,
    /// How success is detected
    pub success_policy: SuccessPolicy,
    /// Launcher for foreign-architecture binaries
    pub arch_shim: Option<ArchShim>,
    /// Upper bound on one invocation
    pub command_timeout: Option<Duration>,
    /// Maximum sanitized field length
    pub max_string_length: MaxStringLength,
}

/// Accounts service settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountsConfig {
    /// Base URL; `/admin` is appended for authorization checks
    pub base_url: Url,
    /// Upper bound on one authorization round trip
    pub timeout: Option<Duration>,
}

impl AccountsConfig {
    /// URL of the admin check endpoint
    #[must_use]
    pub fn admin_url(&self) -> String {
        format!("{}/admin", self.base_url.as_str().trim_end_matches('/'))
    }
}

/// Validated, immutable gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Joke-store settings
    pub store: StoreConfig,
    /// Accounts service settings
    pub accounts: AccountsConfig,
    /// Address to listen on
    pub listen: SocketAddr,
    /// Log output format
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Back to raw form, e.g. for printing the effective configuration
    #[must_use]
    pub fn to_raw(&self) -> RawConfig {
        let shim = self.store.arch_shim.as_ref();
        RawConfig {
            jokes_binary: Some(self.store.binary.display().to_string()),
            jokes_db_path: Some(self.store.db_path.display().to_string()),
            accounts_service_url: Some(self.accounts.base_url.to_string()),
            max_string_length: Some(self.store.max_string_length.to_string()),
            port: Some(self.listen.port().to_string()),
            bind_address: Some(self.listen.ip().to_string()),
            success_policy: Some(self.store.success_policy.to_string()),
            binary_arch: shim.map(|s| s.expected_arch.clone()),
            arch_shim: shim.map(|s| s.launcher.join(" ")),
            command_timeout_secs: self.store.command_timeout.map(|d| d.as_secs().to_string()),
            auth_timeout_secs: self.accounts.timeout.map(|d| d.as_secs().to_string()),
            log_format: Some(self.log_format.to_string()),
        }
    }
}

impl TryFrom<RawConfig> for GatewayConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let binary = PathBuf::from(required(keys::JOKES_BINARY, raw.jokes_binary)?);
        let db_path = PathBuf::from(required(keys::JOKES_DB_PATH, raw.jokes_db_path)?);
        let base_url = parse_base_url(&required(keys::ACCOUNTS_SERVICE_URL, raw.accounts_service_url)?)?;
        let max_string_length: MaxStringLength =
            required(keys::MAX_STRING_LENGTH, raw.max_string_length)?.parse()?;
        let port = parse_with(keys::PORT, &required(keys::PORT, raw.port)?, |s| {
            s.parse::<u16>().map_err(|e| e.to_string())
        })?;

        let bind: IpAddr = optional(raw.bind_address)
            .map(|s| parse_with(keys::BIND_ADDRESS, &s, |s| s.parse::<IpAddr>().map_err(|e| e.to_string())))
            .transpose()?
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let success_policy = optional(raw.success_policy)
            .map(|s| parse_with(keys::SUCCESS_POLICY, &s, SuccessPolicy::from_str))
            .transpose()?
            .unwrap_or_default();

        let launcher = optional(raw.arch_shim).map(|s| s.split_whitespace().map(str::to_owned).collect::<Vec<_>>());
        let arch_shim = match (optional(raw.binary_arch), launcher) {
            (Some(arch), Some(launcher)) => Some(ArchShim::new(arch).with_launcher(launcher)),
            (Some(arch), None) => Some(ArchShim::new(arch)),
            (None, Some(_)) => {
                return Err(ConfigError::invalid(
                    keys::ARCH_SHIM,
                    format!("requires {} to be set", keys::BINARY_ARCH),
                ))
            }
            (None, None) => None,
        };

        let command_timeout = optional(raw.command_timeout_secs)
            .map(|s| parse_secs(keys::COMMAND_TIMEOUT_SECS, &s))
            .transpose()?;
        let auth_timeout = optional(raw.auth_timeout_secs)
            .map(|s| parse_secs(keys::AUTH_TIMEOUT_SECS, &s))
            .transpose()?;

        let log_format = optional(raw.log_format)
            .map(|s| parse_with(keys::LOG_FORMAT, &s, LogFormat::from_str))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            store: StoreConfig {
                binary,
                db_path,
                success_policy,
                arch_shim,
                command_timeout,
                max_string_length,
            },
            accounts: AccountsConfig {
                base_url,
                timeout: auth_timeout,
            },
            listen: SocketAddr::new(bind, port),
            log_format,
        })
    }
}

/// Present and non-blank, trimmed
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn required(key: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::Missing(key))
}

fn parse_with<T, E: fmt::Display>(
    key: &'static str,
    value: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    parse(value).map_err(|e| ConfigError::invalid(key, format!("`{value}`: {e}")))
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::invalid(
            key,
            format!("`{value}` is not a positive number of seconds"),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::invalid(keys::ACCOUNTS_SERVICE_URL, format!("`{value}`: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::invalid(
            keys::ACCOUNTS_SERVICE_URL,
            format!("`{value}` is not an http(s) URL"),
        ));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn complete() -> RawConfig {
        RawConfig {
            jokes_binary: Some("/opt/jokes/bin".into()),
            jokes_db_path: Some("/var/lib/jokes.db".into()),
            accounts_service_url: Some("http://accounts:8080/".into()),
            max_string_length: Some("280".into()),
            port: Some("3000".into()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = GatewayConfig::try_from(complete()).unwrap();
        assert_eq!(config.store.max_string_length.get(), 280);
        assert_eq!(config.store.success_policy, SuccessPolicy::ExitCode);
        assert_eq!(config.store.arch_shim, None);
        assert_eq!(config.store.command_timeout, None);
        assert_eq!(config.listen, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.accounts.admin_url(), "http://accounts:8080/admin");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn each_required_key_is_reported() {
        let cases: [(&str, fn(&mut RawConfig)); 5] = [
            (keys::JOKES_BINARY, |r| r.jokes_binary = None),
            (keys::JOKES_DB_PATH, |r| r.jokes_db_path = Some("  ".into())),
            (keys::ACCOUNTS_SERVICE_URL, |r| r.accounts_service_url = None),
            (keys::MAX_STRING_LENGTH, |r| r.max_string_length = None),
            (keys::PORT, |r| r.port = None),
        ];
        for (key, clear) in cases {
            let mut raw = complete();
            clear(&mut raw);
            match GatewayConfig::try_from(raw) {
                Err(ConfigError::Missing(missing)) => assert_eq!(missing, key),
                other => panic!("expected Missing({key}), got {other:?}"),
            }
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad: [fn(&mut RawConfig); 7] = [
            |r| r.max_string_length = Some("0".into()),
            |r| r.max_string_length = Some("lots".into()),
            |r| r.port = Some("70000".into()),
            |r| r.accounts_service_url = Some("accounts:8080".into()),
            |r| r.accounts_service_url = Some("ftp://accounts".into()),
            |r| r.success_policy = Some("maybe".into()),
            |r| r.command_timeout_secs = Some("0".into()),
        ];
        for mutate in bad {
            let mut raw = complete();
            mutate(&mut raw);
            assert!(matches!(
                GatewayConfig::try_from(raw),
                Err(ConfigError::Invalid { .. })
            ));
        }
    }

    #[test]
    fn shim_launcher_requires_arch() {
        let mut raw = complete();
        raw.arch_shim = Some("qemu-x86_64 -L /usr".into());
        assert!(GatewayConfig::try_from(raw.clone()).is_err());

        raw.binary_arch = Some("x86_64".into());
        let config = GatewayConfig::try_from(raw).unwrap();
        assert_eq!(
            config.store.arch_shim.unwrap().launcher,
            vec!["qemu-x86_64", "-L", "/usr"]
        );
    }

    #[test]
    fn higher_layer_wins() {
        let file = RawConfig {
            port: Some("1000".into()),
            log_format: Some("json".into()),
            ..complete()
        };
        let env = RawConfig {
            port: Some("2000".into()),
            ..RawConfig::default()
        };
        let merged = file.overlay(env);
        assert_eq!(merged.port.as_deref(), Some("2000"));
        assert_eq!(merged.log_format.as_deref(), Some("json"));
        assert_eq!(merged.jokes_binary.as_deref(), Some("/opt/jokes/bin"));
    }

    #[test]
    fn toml_accepts_numbers_and_rejects_unknown_keys() {
        let raw = RawConfig::from_toml(
            r#"
            jokes_binary = "/bin/jokes"
            max_string_length = 64
            port = 8080
            success_policy = "sentinel"
            "#,
        )
        .unwrap();
        assert_eq!(raw.max_string_length.as_deref(), Some("64"));
        assert_eq!(raw.port.as_deref(), Some("8080"));

        assert!(RawConfig::from_toml("jokes_bin = \"/bin/jokes\"").is_err());
    }

    #[test]
    fn effective_config_round_trips_through_toml() {
        let mut raw = complete();
        raw.binary_arch = Some("x86_64".into());
        raw.auth_timeout_secs = Some("5".into());
        let config = GatewayConfig::try_from(raw).unwrap();

        let text = config.to_raw().to_toml().unwrap();
        let reparsed = GatewayConfig::try_from(RawConfig::from_toml(&text).unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }
}
