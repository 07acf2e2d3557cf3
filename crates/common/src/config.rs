//! Process configuration, read from the environment at startup.
//!
//! `main` loads `.env` through `dotenvy` first, so every variable below can
//! live in either place. Only `DATABASE_URL` is mandatory.

use faststr::FastStr;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:19981";
pub const DEFAULT_UNREAD_COUNT_TTL_SECS: u64 = 90;
pub const DEFAULT_FEED_LIST_TTL_SECS: u64 = 20 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 200;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 5;
/// Upper bound for every duration setting: one year.
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: FastStr },
    #[error("{0}")]
    MsgError(FastStr),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Default and maximum number of articles per listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub default: usize,
    pub max:     usize,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            default: DEFAULT_PAGE_SIZE,
            max:     DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub unread_count_ttl: Duration,
    pub feed_list_ttl:    Duration,
    pub sweep_interval:   Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            unread_count_ttl: Duration::from_secs(DEFAULT_UNREAD_COUNT_TTL_SECS),
            feed_list_ttl:    Duration::from_secs(DEFAULT_FEED_LIST_TTL_SECS),
            sweep_interval:   Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url:  FastStr,
    pub listen_addr:   SocketAddr,
    pub cache:         CacheConfig,
    pub page_sizes:    PageSizes,
    pub query_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let listen_addr: SocketAddr = match lookup("LISTEN_ADDR") {
            Some(v) => v.parse().map_err(|_| invalid("LISTEN_ADDR", &v))?,
            None => DEFAULT_LISTEN_ADDR
                .parse()
                .map_err(|_| invalid("LISTEN_ADDR", DEFAULT_LISTEN_ADDR))?,
        };

        let cache = CacheConfig {
            unread_count_ttl: secs(
                &lookup,
                "UNREAD_COUNT_TTL_SECS",
                DEFAULT_UNREAD_COUNT_TTL_SECS,
            )?,
            feed_list_ttl:    secs(&lookup, "FEED_LIST_TTL_SECS", DEFAULT_FEED_LIST_TTL_SECS)?,
            sweep_interval:   secs(
                &lookup,
                "CACHE_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?,
        };

        let page_sizes = PageSizes {
            default: positive(&lookup, "PAGE_SIZE_DEFAULT", DEFAULT_PAGE_SIZE as u64)? as usize,
            max:     positive(&lookup, "PAGE_SIZE_MAX", DEFAULT_MAX_PAGE_SIZE as u64)? as usize,
        };
        if page_sizes.default > page_sizes.max {
            return Err(ConfigError::MsgError(
                format!(
                    "PAGE_SIZE_DEFAULT ({}) exceeds PAGE_SIZE_MAX ({})",
                    page_sizes.default, page_sizes.max
                )
                .into(),
            ));
        }

        Ok(Self {
            database_url: database_url.into(),
            listen_addr,
            cache,
            page_sizes,
            query_timeout: secs(&lookup, "QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT_SECS)?,
        })
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_owned().into(),
    }
}

fn positive<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(invalid(name, &raw)),
        Ok(v) => Ok(v),
    }
}

fn secs<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let v = positive(lookup, name, default)?;
    if v > MAX_DURATION_SECS {
        return Err(invalid(name, &v.to_string()));
    }
    Ok(Duration::from_secs(v))
}
