//! Backend configuration.
//!
//! Precedence for every setting:
//! 1) explicit override (CLI flag)
//! 2) environment variable
//! 3) default
//!
//! Timeouts are whole seconds; `0` disables them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const LABGRAPH_REST_URL_ENV: &str = "LABGRAPH_REST_URL";
pub const LABGRAPH_REST_USERNAME_ENV: &str = "LABGRAPH_REST_USERNAME";
pub const LABGRAPH_REST_PASSWORD_ENV: &str = "LABGRAPH_REST_PASSWORD";
pub const LABGRAPH_REST_TIMEOUT_SECS_ENV: &str = "LABGRAPH_REST_TIMEOUT_SECS";
pub const LABGRAPH_REST_PAGE_SIZE_ENV: &str = "LABGRAPH_REST_PAGE_SIZE";
pub const LABGRAPH_QUERY_DEADLINE_SECS_ENV: &str = "LABGRAPH_QUERY_DEADLINE_SECS";

pub const DEFAULT_REST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REST_PAGE_SIZE: usize = 500;
pub const DEFAULT_QUERY_DEADLINE_SECS: u64 = 0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}={value:?} ({expected})")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read {name}: {message}")]
    UnreadableEnv { name: &'static str, message: String },
    #[error("no record store URL configured; pass --url or set LABGRAPH_REST_URL")]
    MissingUrl,
    #[error("invalid record store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Connection settings for [`crate::RestSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Per-request HTTP timeout; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REST_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_REST_PAGE_SIZE
}

impl SourceConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_REST_TIMEOUT_SECS,
            page_size: DEFAULT_REST_PAGE_SIZE,
        }
    }

    /// Resolve from the environment, with `url_override` taking precedence
    /// over `LABGRAPH_REST_URL`.
    pub fn from_env(url_override: Option<&str>) -> Result<Self, ConfigError> {
        let base_url = match url_override {
            Some(url) => url.to_string(),
            None => read_env(LABGRAPH_REST_URL_ENV)?.ok_or(ConfigError::MissingUrl)?,
        };
        url::Url::parse(&base_url)?;

        let timeout_secs = parse_u64(
            LABGRAPH_REST_TIMEOUT_SECS_ENV,
            read_env(LABGRAPH_REST_TIMEOUT_SECS_ENV)?,
            DEFAULT_REST_TIMEOUT_SECS,
        )?;
        let page_size = parse_u64(
            LABGRAPH_REST_PAGE_SIZE_ENV,
            read_env(LABGRAPH_REST_PAGE_SIZE_ENV)?,
            DEFAULT_REST_PAGE_SIZE as u64,
        )?
        .max(1) as usize;

        Ok(Self {
            base_url,
            username: read_env(LABGRAPH_REST_USERNAME_ENV)?,
            password: read_env(LABGRAPH_REST_PASSWORD_ENV)?,
            timeout_secs,
            page_size,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        secs_to_duration(self.timeout_secs)
    }
}

/// Whole-query deadline: `override_secs`, else `LABGRAPH_QUERY_DEADLINE_SECS`,
/// else none.
pub fn query_deadline(override_secs: Option<u64>) -> Result<Option<Duration>, ConfigError> {
    let secs = match override_secs {
        Some(v) => v,
        None => parse_u64(
            LABGRAPH_QUERY_DEADLINE_SECS_ENV,
            read_env(LABGRAPH_QUERY_DEADLINE_SECS_ENV)?,
            DEFAULT_QUERY_DEADLINE_SECS,
        )?,
    };
    Ok(secs_to_duration(secs))
}

fn secs_to_duration(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// Trimmed, non-empty value of an env var.
fn read_env(name: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            Ok((!v.is_empty()).then(|| v.to_string()))
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::UnreadableEnv {
            name,
            message: e.to_string(),
        }),
    }
}

fn parse_u64(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
            name,
            value: v,
            expected: "expected a non-negative integer",
        }),
    }
}
