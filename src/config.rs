use crate::profile::DEFAULT_MAX_PROFILE_SIZE;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the evstore server.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Upper bound on a single request, applied on top of the client's own
    /// deadline. Default: 30s.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Largest accepted pprof payload in bytes, measured after gzip
    /// decompression. Default: 64MiB.
    #[serde(default = "default_max_profile_size")]
    pub max_profile_size: usize,

    /// Largest accepted gRPC message in bytes. Default: 64MiB.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Maximum number of series kept in memory, 0 for no limit.
    #[serde(default)]
    pub max_series: usize,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_profile_size() -> usize {
    DEFAULT_MAX_PROFILE_SIZE
}

fn default_max_message_size() -> usize {
    64 << 20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            max_profile_size: default_max_profile_size(),
            max_message_size: default_max_message_size(),
            max_series: 0,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("validating config file {}", path.display()))?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be positive");
        }

        if self.max_profile_size == 0 {
            bail!("max_profile_size must be positive");
        }

        if self.max_message_size == 0 {
            bail!("max_message_size must be positive");
        }

        Ok(())
    }
}
