//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::Parser;
use research_protocol::DEFAULT_SERVER_URL;

pub const SERVER_URL_ENV_VAR: &str = "STEER_RESEARCH_SERVER_URL";
pub const LOG_FILTER_ENV_VAR: &str = "STEER_RESEARCH_LOG";
pub const LOG_FILE_ENV_VAR: &str = "STEER_RESEARCH_LOG_FILE";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "steer-research",
    version,
    about = "Steer a deep research run from the terminal"
)]
pub struct ClientArgs {
    /// Backend address; the session stream is `<url>/ws/<session-id>`.
    #[arg(long, env = SERVER_URL_ENV_VAR, default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Log filter in `tracing` directive syntax.
    #[arg(long, env = LOG_FILTER_ENV_VAR, default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = LOG_FILE_ENV_VAR)]
    pub log_file: Option<PathBuf>,

    /// Disable ANSI colors.
    #[arg(long, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    pub no_color: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filter: String,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub logging: LoggingConfig,
    pub color: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            logging: LoggingConfig {
                filter: DEFAULT_LOG_FILTER.to_string(),
                file: None,
            },
            color: true,
        }
    }
}

impl ClientConfig {
    pub fn from_args(args: ClientArgs) -> Self {
        Self {
            server_url: non_blank(args.server_url)
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            logging: LoggingConfig {
                filter: non_blank(args.log_filter)
                    .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                file: args
                    .log_file
                    .filter(|path| !path.as_os_str().to_string_lossy().trim().is_empty()),
            },
            color: !args.no_color,
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn clear_env() -> Vec<EnvGuard> {
        vec![
            set_env_guard(SERVER_URL_ENV_VAR, None),
            set_env_guard(LOG_FILTER_ENV_VAR, None),
            set_env_guard(LOG_FILE_ENV_VAR, None),
            set_env_guard("NO_COLOR", None),
        ]
    }

    #[test]
    fn defaults_without_flags_or_env() {
        let _lock = env_lock();
        let _guards = clear_env();

        let args = ClientArgs::try_parse_from(["steer-research"]).expect("no flags parse");
        assert_eq!(ClientConfig::from_args(args), ClientConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let _lock = env_lock();
        let _guards = clear_env();

        let args = ClientArgs::try_parse_from([
            "steer-research",
            "--server-url",
            "wss://research.example",
            "--log-filter",
            "debug",
            "--log-file",
            "/tmp/steer.log",
            "--no-color",
        ])
        .expect("flags parse");
        let config = ClientConfig::from_args(args);

        assert_eq!(config.server_url, "wss://research.example");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/steer.log")));
        assert!(!config.color);
    }

    #[test]
    fn env_values_apply_and_blank_values_fall_back() {
        let _lock = env_lock();
        let _guards = clear_env();
        let _server = set_env_guard(SERVER_URL_ENV_VAR, Some("  http://127.0.0.1:9000  "));
        let _filter = set_env_guard(LOG_FILTER_ENV_VAR, Some("   "));

        let args = ClientArgs::try_parse_from(["steer-research"]).expect("env parse");
        let config = ClientConfig::from_args(args);

        assert_eq!(config.server_url, "http://127.0.0.1:9000");
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.color);
    }
}
