use std::collections::HashMap;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use notesync_core::db::{ReplicaConfig, StoreConfig};
use notesync_core::sync::SyncOptions;
use thiserror::Error;

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub remote_db: Option<RemoteDbConfig>,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: String,
    pub auth_clock_skew: Duration,
    pub rate_limit_window: Duration,
    pub sync_rate_limit_per_window: u32,
    pub sync_max_events: usize,
    pub request_timeout: Duration,
}

#[derive(Clone, PartialEq, Eq)]
pub struct RemoteDbConfig {
    pub url: String,
    pub auth_token: String,
}

impl fmt::Debug for RemoteDbConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteDbConfig")
            .field("url", &self.url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("remote_db", &self.remote_db)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "sync_rate_limit_per_window",
                &self.sync_rate_limit_per_window,
            )
            .field("sync_max_events", &self.sync_max_events)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "NOTESYNC_BIND_ADDR", "127.0.0.1:8080");
        let db_path = PathBuf::from(value_or_default(&lookup, "NOTESYNC_DB_PATH", "notesync.db"));

        let remote_url = optional_trimmed(&lookup, "NOTESYNC_REMOTE_DB_URL");
        let remote_token = optional_trimmed(&lookup, "NOTESYNC_REMOTE_DB_TOKEN");
        let remote_db = match (remote_url, remote_token) {
            (None, None) => None,
            (Some(url), Some(auth_token)) => {
                if db_path.as_os_str() == ":memory:" {
                    return Err(ConfigError::Invalid(
                        "NOTESYNC_REMOTE_DB_URL requires NOTESYNC_DB_PATH to be a file".to_string(),
                    ));
                }
                Some(RemoteDbConfig { url, auth_token })
            }
            (Some(_), None) => return Err(ConfigError::MissingVar("NOTESYNC_REMOTE_DB_TOKEN")),
            (None, Some(_)) => return Err(ConfigError::MissingVar("NOTESYNC_REMOTE_DB_URL")),
        };

        let jwt_secret = required_trimmed(&lookup, "NOTESYNC_JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "NOTESYNC_JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes"
            )));
        }
        let jwt_issuer = optional_trimmed(&lookup, "NOTESYNC_JWT_ISSUER");
        let jwt_audience = value_or_default(&lookup, "NOTESYNC_JWT_AUDIENCE", "authenticated");

        let auth_clock_skew_secs: u64 =
            bounded(&lookup, "AUTH_CLOCK_SKEW_SECS", "60", 0..=300)?;
        let rate_limit_window_secs: u64 =
            bounded(&lookup, "RATE_LIMIT_WINDOW_SECS", "60", 10..=3_600)?;
        let sync_rate_limit_per_window: u32 =
            bounded(&lookup, "SYNC_RATE_LIMIT_PER_WINDOW", "60", 1..=1_000)?;
        let sync_max_events: usize = bounded(&lookup, "SYNC_MAX_EVENTS", "500", 1..=10_000)?;
        let request_timeout_secs: u64 = bounded(&lookup, "REQUEST_TIMEOUT_SECS", "30", 1..=300)?;

        Ok(Self {
            bind_addr,
            db_path,
            remote_db,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            sync_rate_limit_per_window,
            sync_max_events,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::local(self.db_path.clone());
        match &self.remote_db {
            Some(remote) => {
                config.with_replica(ReplicaConfig::new(remote.url.clone(), remote.auth_token.clone()))
            }
            None => config,
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions::default().with_max_events(self.sync_max_events)
    }
}

/// Parse `name` (or `default`) and require it to fall inside `range`.
fn bounded<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display,
{
    let describe = || {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    };
    let value = value_or_default(lookup, name, default)
        .parse::<T>()
        .map_err(|_| describe())?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(describe())
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
