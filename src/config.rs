use crate::scaling::{Resolution, ScaleBounds, ScaleError, ScaleTransform};
use crate::types::ComputerModel;
use crate::util::parse_resolution;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/chat";
pub const DEFAULT_RESOLUTION: Resolution = Resolution::new(1024, 720);
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 300_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent endpoint that accepts the chat request and streams events back.
    pub api_url: String,
    pub model: ComputerModel,
    pub environment: Option<String>,
    /// True desktop resolution requested for the remote session.
    pub resolution: Resolution,
    /// Bounds for the model-facing resolution.
    pub bounds: ScaleBounds,
    pub session_timeout_ms: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: ComputerModel::default(),
            environment: None,
            resolution: DEFAULT_RESOLUTION,
            bounds: ScaleBounds::default(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the optional TOML file, then applies `DESKSURF_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config '{}'", path.display()))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(api_url) = env_value("DESKSURF_API_URL") {
            self.api_url = api_url;
        }
        if let Some(model) = env_value("DESKSURF_MODEL") {
            self.model = match ComputerModel::parse(&model) {
                Some(model) => model,
                None => bail!("Invalid DESKSURF_MODEL '{model}': expected 'openai' or 'anthropic'"),
            };
        }
        if let Some(environment) = env_value("DESKSURF_ENVIRONMENT") {
            self.environment = Some(environment);
        }
        if let Some(resolution) = env_value("DESKSURF_RESOLUTION") {
            self.resolution = match parse_resolution(&resolution) {
                Some(resolution) => resolution,
                None => bail!("Invalid DESKSURF_RESOLUTION '{resolution}': expected WIDTHxHEIGHT"),
            };
        }
        if let Some(timeout) = env_value("DESKSURF_SESSION_TIMEOUT_MS") {
            self.session_timeout_ms = timeout.parse().with_context(|| {
                format!("Invalid DESKSURF_SESSION_TIMEOUT_MS '{timeout}': expected milliseconds")
            })?;
        }
        if let Some(level) = env_value("DESKSURF_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid api_url '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if self.session_timeout_ms == 0 {
            bail!("session_timeout_ms must be greater than zero");
        }

        self.scale_transform()?;
        Ok(())
    }

    pub fn session_budget(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn scale_transform(&self) -> Result<ScaleTransform, ScaleError> {
        ScaleTransform::new(self.resolution, self.bounds)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
