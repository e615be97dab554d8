use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::pipeline::{PipelineConfig, DEFAULT_TOP_N, MAX_DESCRIPTION_LEN};

/// Process configuration, read from `REVIEWS_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub redis_url: Option<String>,
    pub leaderboard_top_n: usize,
    pub description_max_len: usize,
    pub rescore_on_edit: bool,
    pub projection_poll_ms: u64,
    pub store_timeout_ms: u64,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Missing or invalid values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            port: try_load(&lookup, "REVIEWS_PORT", 3000),
            redis_url: lookup("REVIEWS_REDIS_URL").filter(|url| !url.trim().is_empty()),
            leaderboard_top_n: try_load(&lookup, "REVIEWS_LEADERBOARD_TOP_N", DEFAULT_TOP_N),
            description_max_len: try_load(&lookup, "REVIEWS_DESCRIPTION_MAX_LEN", MAX_DESCRIPTION_LEN),
            rescore_on_edit: try_load(&lookup, "REVIEWS_RESCORE_ON_EDIT", false),
            projection_poll_ms: try_load(&lookup, "REVIEWS_PROJECTION_POLL_MS", 500),
            store_timeout_ms: try_load(&lookup, "REVIEWS_STORE_TIMEOUT_MS", 250),
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            description_max_len: self.description_max_len,
            rescore_on_edit: self.rescore_on_edit,
            projection_poll_interval: Duration::from_millis(self.projection_poll_ms),
            default_top_n: self.leaderboard_top_n,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
    }
}
