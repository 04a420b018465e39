use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Process configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub video: VideoConfig,
    pub webhook_secret: Option<String>,
    pub realtime: Option<RealtimeConfig>,
}

#[derive(Debug, Clone)]
pub struct VideoConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Hosted realtime backend used by browsers for chat delivery and presence.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub url: String,
    pub anon_key: String,
    pub jwt_secret: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} is not set"),
            ConfigError::Invalid { key, reason } => write!(f, "{key} is invalid: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let realtime = match (get("REALTIME_URL"), get("REALTIME_ANON_KEY"), get("REALTIME_JWT_SECRET")) {
            (Some(url), Some(anon_key), Some(jwt_secret)) => Some(RealtimeConfig { url, anon_key, jwt_secret }),
            (None, None, None) => None,
            _ => {
                log::warn!("Realtime backend partially configured; token endpoints disabled");
                None
            }
        };

        let webhook_secret = get("WEBHOOK_SECRET");
        if webhook_secret.is_none() {
            log::warn!("No WEBHOOK_SECRET set; provider webhooks will be rejected");
        }

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 8)?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            jwt_secret: require("JWT_SECRET")?,
            video: VideoConfig {
                api_url: get("VIDEO_API_URL").unwrap_or_else(|| "https://api.daily.co/v1".to_string()),
                api_key: require("VIDEO_API_KEY")?,
                timeout: Duration::from_secs(parse_or(get("VIDEO_TIMEOUT_SECS"), "VIDEO_TIMEOUT_SECS", 10)?),
            },
            webhook_secret,
            realtime,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
