//! Command-line arguments and the optional JSON configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use dispatch::{DispatcherConfig, Headers, Params, Verb};
use serde::{Deserialize, Serialize};
use transport::HttpTransportConfig;

/// Issue the same REST request several times at once and watch the
/// dispatcher coalesce them into a single HTTP call.
#[derive(Parser, Debug)]
#[command(name = "restbus", author, version, about, long_about = None)]
pub struct Args {
    /// HTTP verb: GET, PUT, POST or DELETE.
    pub verb: Verb,

    /// Endpoint URL, without query string.
    pub url: String,

    /// Request parameter as `key=value`. Repeatable.
    #[arg(short, long = "param", value_parser = parse_pair)]
    pub params: Vec<(String, String)>,

    /// Request header as `name=value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_pair)]
    pub headers: Vec<(String, String)>,

    /// Number of identical requests to submit concurrently.
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// JSON file with `dispatcher` and `transport` sections.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overrides `dispatcher.max_in_flight`.
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Overrides `transport.timeout_ms`.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl Args {
    /// `--param` values as a parameter set; later duplicates win.
    pub fn params(&self) -> Params {
        self.params.iter().cloned().collect()
    }

    /// `--header` values as a header map; later duplicates win.
    pub fn headers(&self) -> Headers {
        self.headers.iter().cloned().collect()
    }

    /// Loads the configuration file, if any, and applies flag overrides.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(workers) = self.max_in_flight {
            config.dispatcher.max_in_flight = Some(workers);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.transport.timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}

/// Contents of the `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Worker pool and bus settings.
    pub dispatcher: DispatcherConfig,
    /// HTTP client settings.
    pub transport: HttpTransportConfig,
}

impl AppConfig {
    /// Reads and parses the JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}
