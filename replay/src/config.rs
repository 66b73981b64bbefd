use std::{path::PathBuf, str::FromStr, time::Duration};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE: &str = "replay.toml";
pub const ENV_PREFIX: &str = "REPLAY_";
pub const DB_ENV_PREFIX: &str = "DB_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Figment(#[from] figment::Error),
    #[error("invalid api url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("api url {0:?} must use http or https")]
    UnsupportedScheme(String),
    #[error("request delay must be a non-negative number of seconds that fits a duration, got {0}")]
    InvalidDelay(f64),
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Which response codes count as a successful request.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum SuccessRange {
    #[default]
    #[serde(rename = "any-2xx")]
    Any2xx,
    #[serde(rename = "ok-only")]
    OkOnly,
}

impl SuccessRange {
    pub fn accepts(&self, status: StatusCode) -> bool {
        match self {
            SuccessRange::Any2xx => status.is_success(),
            SuccessRange::OkOnly => status == StatusCode::OK,
        }
    }
}

impl std::fmt::Display for SuccessRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuccessRange::Any2xx => write!(f, "any-2xx"),
            SuccessRange::OkOnly => write!(f, "ok-only"),
        }
    }
}

#[derive(Debug)]
pub struct SuccessRangeParseError(String);
impl std::fmt::Display for SuccessRangeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown success range {:?}, expected any-2xx or ok-only", self.0)
    }
}
impl std::error::Error for SuccessRangeParseError {}

impl FromStr for SuccessRange {
    type Err = SuccessRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any-2xx" => Ok(SuccessRange::Any2xx),
            "ok-only" => Ok(SuccessRange::OkOnly),
            _ => Err(SuccessRangeParseError(s.to_string())),
        }
    }
}

/// Settings for a replay run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReplayConfig {
    pub api_url: String,
    pub request_delay_secs: f64,
    pub requests_file: PathBuf,
    pub timeout_secs: u64,
    pub success_range: SuccessRange,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            api_url: String::from("http://localhost:8000/api/analyze"),
            request_delay_secs: 0.5,
            requests_file: PathBuf::from("test_requests.json"),
            timeout_secs: 60,
            success_range: SuccessRange::Any2xx,
        }
    }
}

impl ReplayConfig {
    /// Defaults, then `replay.toml` if present, then `REPLAY_*` variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(ReplayConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::figment().extract()?)
    }

    pub fn url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.api_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ConfigError::UnsupportedScheme(self.api_url.clone())),
        }
    }

    pub fn request_delay(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.request_delay_secs)
            .map_err(|_| ConfigError::InvalidDelay(self.request_delay_secs))
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Duration::from_secs(self.timeout_secs))
    }
}

/// Connection and naming settings for the database bootstrap. Read from the
/// same `DB_*` variables the analysis API uses.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub charset: String,
    pub collation: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 3306,
            user: String::from("root"),
            password: String::new(),
            name: String::from("carmen"),
            charset: String::from("utf8mb4"),
            collation: String::from("utf8mb4_unicode_ci"),
        }
    }
}

impl DatabaseConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(DatabaseConfig::default()))
            .merge(Env::prefixed(DB_ENV_PREFIX))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::figment().extract()?)
    }
}
