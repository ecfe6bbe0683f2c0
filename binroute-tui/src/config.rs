//! Runtime configuration read from `.env` and the process environment.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use binroute_core::{FieldWorker, Strategies, StrategyId, StrategyRegistry};
use binroute_provider_firebase::FirebaseConfig;
use binroute_provider_twilio::TwilioConfig;

const DEFAULT_ROUTE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_ROUTE_REQUESTS: usize = 4;
const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FILE: &str = "binroute.log";

#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a non-negative integer, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("unknown assignment strategy `{name}`, expected one of: {known}")]
    UnknownStrategy { name: String, known: String },
    #[error("cannot load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("cannot read workers file {path}: {source}")]
    WorkersFile { path: PathBuf, source: io::Error },
    #[error("workers file {path} is not a valid worker list: {source}")]
    WorkersFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Log filter and destination.
#[derive(Debug, Clone)]
pub(crate) struct LoggingConfig {
    pub log_level: String,
    pub log_file: PathBuf,
}

/// Top-level configuration for the dashboard.
#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub firebase: FirebaseConfig,
    pub gmaps_api_key: String,
    pub twilio: Option<TwilioConfig>,
    pub strategy: StrategyId,
    pub route_timeout: Duration,
    pub max_route_requests: usize,
    pub refresh_interval: Option<Duration>,
    pub workers_file: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub(crate) fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }

        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let firebase = FirebaseConfig {
            database_url: require("FIREBASE_DATABASE_URL")?,
            auth_token: get("FIREBASE_AUTH_TOKEN"),
        };
        let gmaps_api_key = require("GMAPS_API_KEY")?;

        // All three or nothing; a partial set disables SMS.
        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let strategy = get("BINROUTE_STRATEGY")
            .map_or_else(|| Strategies::Nearest.into(), |name| StrategyId(name.to_lowercase()));
        let registry = StrategyRegistry::standard();
        if registry.strategy(&strategy).is_err() {
            let known = registry
                .strategies()
                .into_iter()
                .map(|(id, _)| id.0)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ConfigError::UnknownStrategy {
                name: strategy.0,
                known,
            });
        }

        let route_timeout = Duration::from_secs(number(
            "BINROUTE_ROUTE_TIMEOUT_SECS",
            get("BINROUTE_ROUTE_TIMEOUT_SECS"),
            DEFAULT_ROUTE_TIMEOUT_SECS,
        )?);
        if route_timeout.is_zero() {
            return Err(ConfigError::Zero("BINROUTE_ROUTE_TIMEOUT_SECS"));
        }
        let max_route_requests = number(
            "BINROUTE_MAX_ROUTE_REQUESTS",
            get("BINROUTE_MAX_ROUTE_REQUESTS"),
            DEFAULT_MAX_ROUTE_REQUESTS,
        )?;
        let refresh_secs = number(
            "BINROUTE_REFRESH_SECS",
            get("BINROUTE_REFRESH_SECS"),
            DEFAULT_REFRESH_SECS,
        )?;
        let refresh_interval = (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs));

        let logging = LoggingConfig {
            log_level: get("BINROUTE_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
            log_file: get("BINROUTE_LOG_FILE")
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
        };

        Ok(Self {
            firebase,
            gmaps_api_key,
            twilio,
            strategy,
            route_timeout,
            max_route_requests,
            refresh_interval,
            workers_file: get("BINROUTE_WORKERS_FILE").map(PathBuf::from),
            logging,
        })
    }
}

/// Read the field worker roster, a JSON array of workers.
pub(crate) fn load_workers(path: &Path) -> Result<Vec<FieldWorker>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::WorkersFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::WorkersFormat {
        path: path.to_path_buf(),
        source,
    })
}

fn number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .ok()
            .ok_or(ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("FIREBASE_DATABASE_URL", "https://bins-default-rtdb.firebaseio.com"),
        ("GMAPS_API_KEY", "test-key"),
    ];

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let config = config_from(&REQUIRED).expect("required values present");
        assert_eq!(config.strategy, StrategyId("nearest".to_owned()));
        assert_eq!(config.route_timeout, Duration::from_secs(10));
        assert_eq!(config.max_route_requests, 4);
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(30)));
        assert!(config.twilio.is_none());
        assert!(config.firebase.auth_token.is_none());
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.logging.log_file, PathBuf::from("binroute.log"));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = config_from(&REQUIRED[..1]).expect_err("maps key missing");
        assert!(matches!(err, ConfigError::Missing("GMAPS_API_KEY")));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BINROUTE_ROUTE_TIMEOUT_SECS", "ten"));
        let err = config_from(&pairs).expect_err("not a number");
        assert_eq!(
            err.to_string(),
            "BINROUTE_ROUTE_TIMEOUT_SECS must be a non-negative integer, got `ten`"
        );
    }

    #[test]
    fn zero_route_timeout_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BINROUTE_ROUTE_TIMEOUT_SECS", "0"));
        let err = config_from(&pairs).expect_err("zero timeout");
        assert!(matches!(err, ConfigError::Zero("BINROUTE_ROUTE_TIMEOUT_SECS")));
        assert_eq!(
            err.to_string(),
            "BINROUTE_ROUTE_TIMEOUT_SECS must be greater than zero"
        );
    }

    #[test]
    fn zero_refresh_disables_auto_refresh() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BINROUTE_REFRESH_SECS", "0"));
        let config = config_from(&pairs).expect("valid");
        assert!(config.refresh_interval.is_none());
    }

    #[test]
    fn partial_twilio_credentials_disable_sms() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TWILIO_ACCOUNT_SID", "AC123"));
        pairs.push(("TWILIO_AUTH_TOKEN", "secret"));
        assert!(config_from(&pairs).expect("valid").twilio.is_none());

        pairs.push(("TWILIO_PHONE_NUMBER", "+15005550006"));
        let twilio = config_from(&pairs).expect("valid").twilio.expect("complete");
        assert_eq!(twilio.from_number, "+15005550006");
    }

    #[test]
    fn strategy_name_is_normalized() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BINROUTE_STRATEGY", " Balanced "));
        let config = config_from(&pairs).expect("valid");
        assert_eq!(config.strategy, StrategyId("balanced".to_owned()));
    }

    #[test]
    fn unknown_strategy_lists_the_known_ones() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BINROUTE_STRATEGY", "fastest"));
        let err = config_from(&pairs).expect_err("unknown strategy");
        assert_eq!(
            err.to_string(),
            "unknown assignment strategy `fastest`, expected one of: balanced, capacity, nearest"
        );
    }

    #[test]
    fn worker_roster_parses_from_json() {
        let path = env::temp_dir().join(format!("binroute-workers-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"[{"id": 101, "name": "Rajesh", "zone": "North", "phone": "+918368164831"}]"#,
        )
        .expect("write roster");

        let workers = load_workers(&path).expect("valid roster");
        fs::remove_file(&path).ok();

        assert_eq!(workers.len(), 1);
        assert_eq!(workers.first().map(|worker| worker.zone.as_str()), Some("North"));
    }
}
