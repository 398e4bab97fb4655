//! Livy source configuration.

use clap::Args;
use quarry_source::{FileConfig, SourceError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::{LivyError, LivyResult};

fn default_poll_interval_ms() -> u64 {
    500
}

/// Connection settings, from the command line or a serialized config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Args)]
pub struct LivyConfig {
    /// Base URL of the Livy server; selects the Spark source when set.
    #[arg(long = "livy", env = "LIVY_URI")]
    pub url: Option<String>,

    /// Milliseconds between polls of a starting session or running statement.
    #[arg(long = "livy-poll-ms", default_value_t = default_poll_interval_ms())]
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl LivyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The server URL without a trailing slash.
    pub fn base_url(&self) -> LivyResult<&str> {
        self.url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| LivyError::invalid_config("no Livy URL configured"))
    }
}

/// The data directory `config.json` as read by the Spark source: the file
/// source settings plus files and jars to ship to the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparkFileConfig {
    #[serde(flatten)]
    pub file: FileConfig,
    /// Extra files, already reachable by the cluster, to register as views.
    #[serde(default)]
    pub remote_files: Vec<String>,
    #[serde(default)]
    pub jars: Vec<String>,
}

impl SparkFileConfig {
    /// Read a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> LivyResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> LivyResult<Self> {
        Ok(serde_json::from_str::<Self>(text).map_err(|e| SourceError::config(e.to_string()))?)
    }
}
