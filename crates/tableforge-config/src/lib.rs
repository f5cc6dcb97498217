//! Environment-variable configuration for the live interaction server.
//!
//! Every tunable in the server is read from the environment, never from a
//! config file: `RawConfig` declares each variable's name, default, and
//! type via `clap`'s `env` feature, and [`AppConfig::load`] turns that into
//! a validated, fully-populated configuration or a [`ConfigError`] listing
//! every missing required variable at once.

mod error;

use std::time::Duration;

use clap::Parser;

pub use error::ConfigError;

/// Recognized values for `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The `tracing_subscriber::EnvFilter` directive for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Raw command-line/environment parse target.
///
/// Every field either has a default (matching spec.md's recognized-options
/// table) or is `None` when unset, so validation can happen in a second
/// pass that reports every missing required field together instead of
/// clap bailing out on the first one it hits.
#[derive(Debug, Parser)]
#[command(name = "tableforge", disable_help_subcommand = true)]
struct RawConfig {
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    #[arg(long, env = "FRONTEND_URL")]
    frontend_url: Option<String>,

    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    #[arg(long, env = "CLERK_SECRET_KEY")]
    clerk_secret_key: Option<String>,

    #[arg(long, env = "CLERK_PUBLISHABLE_KEY")]
    clerk_publishable_key: Option<String>,

    #[arg(long, env = "CONVEX_URL")]
    convex_url: Option<String>,

    #[arg(long, env = "CONVEX_DEPLOY_KEY")]
    convex_deploy_key: Option<String>,

    #[arg(long, env = "WS_HEARTBEAT_INTERVAL", default_value_t = 30_000)]
    ws_heartbeat_interval_ms: u64,

    #[arg(long, env = "WS_CONNECTION_TIMEOUT", default_value_t = 60_000)]
    ws_connection_timeout_ms: u64,

    #[arg(long, env = "ROOM_INACTIVITY_TIMEOUT", default_value_t = 1_800_000)]
    room_inactivity_timeout_ms: u64,

    #[arg(long, env = "MAX_ROOMS_PER_SERVER", default_value_t = 100)]
    max_rooms_per_server: usize,

    #[arg(long, env = "TURN_TIME_LIMIT", default_value_t = 90_000)]
    turn_time_limit_ms: u64,

    #[arg(long, env = "RATE_LIMIT_WINDOW", default_value_t = 60_000)]
    rate_limit_window_ms: u64,

    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 100)]
    rate_limit_max_requests: u32,

    #[arg(long, env = "MESSAGE_BATCH_SIZE", default_value_t = 10)]
    message_batch_size: usize,

    #[arg(long, env = "MESSAGE_BATCH_TIMEOUT", default_value_t = 100)]
    message_batch_timeout_ms: u64,

    #[arg(long, env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[arg(long, env = "HEALTH_CHECK_TIMEOUT", default_value_t = 5_000)]
    health_check_timeout_ms: u64,
}

/// Credentials and endpoints delegated to external services. Grouped apart
/// from the tuning knobs below because every field here is required — the
/// server can't run without somewhere to validate callers and somewhere to
/// persist state.
#[derive(Debug, Clone)]
pub struct ExternalServices {
    pub clerk_secret_key: String,
    pub clerk_publishable_key: String,
    pub convex_url: String,
    pub convex_deploy_key: String,
}

/// Fully validated server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub frontend_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub external: ExternalServices,
    pub ws_heartbeat_interval: Duration,
    pub ws_connection_timeout: Duration,
    pub room_inactivity_timeout: Duration,
    pub max_rooms_per_server: usize,
    pub turn_time_limit: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub message_batch_size: usize,
    pub message_batch_timeout: Duration,
    pub log_level: LogLevel,
    pub health_check_timeout: Duration,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// [`ConfigError::MissingRequired`] naming every required variable
    /// (`CLERK_SECRET_KEY`, `CLERK_PUBLISHABLE_KEY`, `CONVEX_URL`,
    /// `CONVEX_DEPLOY_KEY`) that has no value.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = RawConfig::parse_from(std::iter::once("tableforge".to_string()));
        Self::from_raw(raw)
    }

    /// Parses from an explicit argument list (`--port 3001 ...`) instead of
    /// the process environment. Used by tests so configuration can be
    /// exercised without mutating shared process-global env vars.
    pub fn load_from<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let raw = RawConfig::try_parse_from(args).map_err(|err| {
            ConfigError::InvalidValue {
                name: "<args>".to_string(),
                value: String::new(),
                reason: err.to_string(),
            }
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        if raw.clerk_secret_key.is_none() {
            missing.push("CLERK_SECRET_KEY".to_string());
        }
        if raw.clerk_publishable_key.is_none() {
            missing.push("CLERK_PUBLISHABLE_KEY".to_string());
        }
        if raw.convex_url.is_none() {
            missing.push("CONVEX_URL".to_string());
        }
        if raw.convex_deploy_key.is_none() {
            missing.push("CONVEX_DEPLOY_KEY".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        Ok(Self {
            port: raw.port,
            frontend_url: raw.frontend_url,
            cors_origins: raw.cors_origins,
            external: ExternalServices {
                clerk_secret_key: raw.clerk_secret_key.expect("checked above"),
                clerk_publishable_key: raw.clerk_publishable_key.expect("checked above"),
                convex_url: raw.convex_url.expect("checked above"),
                convex_deploy_key: raw.convex_deploy_key.expect("checked above"),
            },
            ws_heartbeat_interval: Duration::from_millis(raw.ws_heartbeat_interval_ms),
            ws_connection_timeout: Duration::from_millis(raw.ws_connection_timeout_ms),
            room_inactivity_timeout: Duration::from_millis(raw.room_inactivity_timeout_ms),
            max_rooms_per_server: raw.max_rooms_per_server,
            turn_time_limit: Duration::from_millis(raw.turn_time_limit_ms),
            rate_limit_window: Duration::from_millis(raw.rate_limit_window_ms),
            rate_limit_max_requests: raw.rate_limit_max_requests,
            message_batch_size: raw.message_batch_size,
            message_batch_timeout: Duration::from_millis(raw.message_batch_timeout_ms),
            log_level: raw.log_level,
            health_check_timeout: Duration::from_millis(raw.health_check_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_args() -> Vec<&'static str> {
        vec![
            "--clerk-secret-key=sk_test",
            "--clerk-publishable-key=pk_test",
            "--convex-url=https://example.convex.cloud",
            "--convex-deploy-key=deploy_test",
        ]
    }

    fn base_args() -> Vec<String> {
        let mut args = vec!["tableforge".to_string()];
        args.extend(required_args().into_iter().map(String::from));
        args
    }

    #[test]
    fn test_load_from_applies_defaults_when_only_required_fields_given() {
        let config = AppConfig::load_from(base_args()).expect("should load");
        assert_eq!(config.port, 3001);
        assert_eq!(config.max_rooms_per_server, 100);
        assert_eq!(config.turn_time_limit, Duration::from_secs(90));
        assert_eq!(config.rate_limit_max_requests, 100);
        assert!(matches!(config.log_level, LogLevel::Info));
    }

    #[test]
    fn test_load_from_missing_all_required_lists_every_name() {
        let result = AppConfig::load_from(["tableforge"]);
        match result {
            Err(ConfigError::MissingRequired(names)) => {
                assert!(names.contains(&"CLERK_SECRET_KEY".to_string()));
                assert!(names.contains(&"CLERK_PUBLISHABLE_KEY".to_string()));
                assert!(names.contains(&"CONVEX_URL".to_string()));
                assert!(names.contains(&"CONVEX_DEPLOY_KEY".to_string()));
                assert_eq!(names.len(), 4);
            }
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_missing_one_required_lists_only_that_one() {
        let args = vec![
            "tableforge".to_string(),
            "--clerk-secret-key=sk_test".to_string(),
            "--clerk-publishable-key=pk_test".to_string(),
            "--convex-url=https://example.convex.cloud".to_string(),
        ];
        let result = AppConfig::load_from(args);
        assert!(matches!(result, Err(ConfigError::MissingRequired(names)) if names == vec!["CONVEX_DEPLOY_KEY".to_string()]));
    }

    #[test]
    fn test_load_from_overrides_defaults_with_explicit_values() {
        let mut args = base_args();
        args.push("--port=8080".to_string());
        args.push("--max-rooms-per-server=5".to_string());
        let config = AppConfig::load_from(args).expect("should load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_rooms_per_server, 5);
    }

    #[test]
    fn test_load_from_parses_cors_origins_as_comma_list() {
        let mut args = base_args();
        args.push("--cors-origins=https://a.example,https://b.example".to_string());
        let config = AppConfig::load_from(args).expect("should load");
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_log_level_as_filter_matches_tracing_directive() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::Error.as_filter(), "error");
    }
}
