//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file,
//! then environment variables.  CLI flags are applied on top in `main`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::agent::DEFAULT_MAX_STEPS;
use crate::models::openai::DEFAULT_BASE_URL;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Model identifier sent to the chat completions API.
    pub model: String,
    /// API key for the model endpoint.  Required to serve.
    pub api_key: Option<String>,
    /// API base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Directory that relative tool file paths resolve against.
    pub data_dir: PathBuf,
    /// Maximum model calls per reply, tool rounds included.
    pub max_agent_steps: usize,
    /// Maximum turns kept per connection.  `None` keeps everything for
    /// the life of the socket.
    pub max_history_turns: Option<usize>,
    /// HTTP timeout for a single model request.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8765,
            model: "gpt-4".into(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            data_dir: PathBuf::from("."),
            max_agent_steps: DEFAULT_MAX_STEPS,
            max_history_turns: None,
            request_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Parse a YAML config file.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml_ng::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Defaults (or `path`, when given) overridden by the process
    /// environment.
    pub async fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::load(p).await?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Apply environment overrides read through `get`.  Empty values are
    /// treated as unset.
    pub fn apply_env<F>(&mut self, get: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("WS_HOST") {
            self.host = v;
        }
        if let Some(v) = var("WS_PORT") {
            self.port = parse_env("WS_PORT", &v)?;
        }
        if let Some(v) = var("MODEL") {
            self.model = v;
        }
        if let Some(v) = var("OPENAI_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = var("OPENAI_API_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = var("DATAGEN_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("DATAGEN_MAX_AGENT_STEPS") {
            self.max_agent_steps = parse_env("DATAGEN_MAX_AGENT_STEPS", &v)?;
        }
        if let Some(v) = var("DATAGEN_MAX_HISTORY_TURNS") {
            self.max_history_turns = Some(parse_env("DATAGEN_MAX_HISTORY_TURNS", &v)?);
        }
        if let Some(v) = var("DATAGEN_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("DATAGEN_REQUEST_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    /// `host:port` as given, for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The API key, or an error explaining how to set it.
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set (or `api_key` in the config file)"))
    }
}

fn parse_env<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {value:?}"))
}
