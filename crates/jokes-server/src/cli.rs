//! Command-line and environment configuration
//!
//! Every setting can be given as a flag or an environment variable (flags
//! win), on top of an optional TOML file named by `--config`.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use jokes_core::config::keys;
use jokes_core::{ConfigError, GatewayConfig, RawConfig};
use std::path::PathBuf;

/// (flag, environment variable, value name, help)
const SETTINGS: [(&str, &str, &str, &str); 12] = [
    ("jokes-binary", keys::JOKES_BINARY, "PATH", "Joke-store executable"),
    ("jokes-db-path", keys::JOKES_DB_PATH, "PATH", "Joke-store database file"),
    ("accounts-service-url", keys::ACCOUNTS_SERVICE_URL, "URL", "Accounts service base URL"),
    ("max-string-length", keys::MAX_STRING_LENGTH, "N", "Maximum length of joke fields, in characters"),
    ("port", keys::PORT, "PORT", "Port to listen on"),
    ("bind-address", keys::BIND_ADDRESS, "IP", "Address to listen on [default: 0.0.0.0]"),
    ("success-policy", keys::SUCCESS_POLICY, "POLICY", "How joke-store success is detected: exit-code or sentinel"),
    ("binary-arch", keys::BINARY_ARCH, "ARCH", "CPU architecture the joke store was built for"),
    ("arch-shim", keys::ARCH_SHIM, "COMMAND", "Launcher used when the joke store targets another architecture"),
    ("command-timeout-secs", keys::COMMAND_TIMEOUT_SECS, "SECS", "Kill joke-store commands after this many seconds"),
    ("auth-timeout-secs", keys::AUTH_TIMEOUT_SECS, "SECS", "Give up on the accounts service after this many seconds"),
    ("log-format", keys::LOG_FORMAT, "FORMAT", "Log output: text or json"),
];

/// Build the `jokes-server` command
#[must_use]
pub fn command() -> Command {
    let cmd = Command::new("jokes-server")
        .version(jokes_core::VERSION)
        .about("HTTP gateway for the joke store")
        .arg(
            Arg::new("config")
                .long("config")
                .env(keys::CONFIG_FILE)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with default settings"),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .action(ArgAction::SetTrue)
                .help("Validate the configuration, print it as TOML and exit"),
        );

    SETTINGS.iter().fold(cmd, |cmd, (flag, env, value_name, help)| {
        cmd.arg(
            Arg::new(*flag)
                .long(*flag)
                .env(*env)
                .value_name(*value_name)
                .help(*help),
        )
    })
}

/// Settings given as flags or environment variables
#[must_use]
pub fn raw_from_matches(matches: &ArgMatches) -> RawConfig {
    let get = |id: &str| matches.get_one::<String>(id).cloned();
    RawConfig {
        jokes_binary: get("jokes-binary"),
        jokes_db_path: get("jokes-db-path"),
        accounts_service_url: get("accounts-service-url"),
        max_string_length: get("max-string-length"),
        port: get("port"),
        bind_address: get("bind-address"),
        success_policy: get("success-policy"),
        binary_arch: get("binary-arch"),
        arch_shim: get("arch-shim"),
        command_timeout_secs: get("command-timeout-secs"),
        auth_timeout_secs: get("auth-timeout-secs"),
        log_format: get("log-format"),
    }
}

/// Resolve and validate the configuration
///
/// # Errors
/// Returns `ConfigError` if the config file cannot be loaded or any
/// required setting is missing or invalid.
pub fn load_config(matches: &ArgMatches) -> Result<GatewayConfig, ConfigError> {
    let file = match matches.get_one::<PathBuf>("config") {
        Some(path) => RawConfig::from_file(path)?,
        None => RawConfig::default(),
    };
    GatewayConfig::try_from(file.overlay(raw_from_matches(matches)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jokes_core::SuccessPolicy;
    use std::io::Write;

    const REQUIRED: [&str; 10] = [
        "jokes-server",
        "--jokes-binary=/opt/jokes",
        "--jokes-db-path=/var/jokes.db",
        "--accounts-service-url=http://accounts.local",
        "--max-string-length=120",
        "--port=8080",
        "--success-policy=sentinel",
        "--bind-address=127.0.0.1",
        "--log-format=json",
        "--command-timeout-secs=5",
    ];

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn flags_produce_config() {
        let matches = command().try_get_matches_from(REQUIRED).unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.store.max_string_length.get(), 120);
        assert_eq!(config.store.success_policy, SuccessPolicy::Sentinel);
        assert_eq!(config.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.accounts.admin_url(), "http://accounts.local/admin");
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9999\nmax_string_length = 7\narch_shim = \"box64\"\nbinary_arch = \"x86_64\"").unwrap();

        let mut args: Vec<&str> = REQUIRED.to_vec();
        let config_flag = format!("--config={}", file.path().display());
        args.push(&config_flag);

        let config = load_config(&command().try_get_matches_from(args).unwrap()).unwrap();
        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.store.max_string_length.get(), 120);
        assert_eq!(config.store.arch_shim.unwrap().launcher, vec!["box64"]);
    }

    #[test]
    fn unreadable_config_file_is_fatal() {
        let mut args: Vec<&str> = REQUIRED.to_vec();
        args.push("--config=/nonexistent/jokes.toml");
        let err = load_config(&command().try_get_matches_from(args).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
