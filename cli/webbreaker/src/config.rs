//! Configuration loading.
//!
//! Handles:
//! - Locating the config file (flag, environment, or platform config dir)
//! - The WebInspect endpoint pool and its size tiers
//! - Transport settings for scan-engine requests

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use webbreaker_scheduler::{Endpoint, TierTable, DEFAULT_TIER};

use crate::error::CliError;

/// Configuration file name.
const CONFIG_FILE: &str = "config.toml";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "webbreaker", "webbreaker")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// Path of the config file, preferring an explicit location.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config_dir()?.join(CONFIG_FILE)),
    }
}

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub webinspect: WebInspectConfig,
}

/// WebInspect engine pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebInspectConfig {
    /// Size used when none is requested.
    #[serde(default = "default_size")]
    pub default_size: String,

    /// Per-request timeout for scan-engine calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Verify scan-engine TLS certificates.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Concurrent scans allowed per size.
    #[serde(default = "default_sizes")]
    pub sizes: BTreeMap<String, u32>,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

fn default_size() -> String {
    DEFAULT_TIER.to_string()
}

fn default_sizes() -> BTreeMap<String, u32> {
    BTreeMap::from([("large".to_string(), 2), ("medium".to_string(), 1)])
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_verify_tls() -> bool {
    true
}

impl Default for WebInspectConfig {
    fn default() -> Self {
        Self {
            default_size: default_size(),
            request_timeout_secs: default_request_timeout_secs(),
            verify_tls: default_verify_tls(),
            sizes: default_sizes(),
            endpoints: Vec::new(),
        }
    }
}

/// One configured scan engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub size: EndpointSize,
}

/// Capacity of an engine, either literal or by size name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndpointSize {
    Scans(u32),
    Named(String),
}

impl Config {
    /// Load config from `path`, or return default if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config from {:?}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl WebInspectConfig {
    pub fn tier_table(&self) -> TierTable {
        TierTable::new(self.sizes.clone()).with_default(self.default_size.clone())
    }

    /// Resolve every configured engine to an endpoint.
    ///
    /// A size name must exist in `sizes`.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>, CliError> {
        self.endpoints
            .iter()
            .map(|endpoint| {
                let max_scans = match &endpoint.size {
                    EndpointSize::Scans(count) => *count,
                    EndpointSize::Named(name) => {
                        self.sizes.get(name).copied().ok_or_else(|| {
                            CliError::Config(format!(
                                "endpoint '{}' refers to unknown size '{}'",
                                endpoint.url, name
                            ))
                        })?
                    }
                };
                Ok(Endpoint::new(endpoint.url.trim_end_matches('/'), max_scans))
            })
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
