use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::info;

pub const DEFAULT_STREAM_BASE_URL: &str = "https://chat.stream-io-api.com";

/// Top-level server configuration, loaded from chat-join.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub stream: StreamSection,
    pub join: JoinSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub web_address: String,
    /// Origin allowed by CORS. Unset or localhost allows any origin.
    pub public_url: Option<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            web_address: "0.0.0.0:8080".into(),
            public_url: None,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Credentials and connection settings for the chat backend.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    /// Timeout for a single backend HTTP call.
    pub timeout_secs: u64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: DEFAULT_STREAM_BASE_URL.into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct JoinSection {
    /// Upper bound on the whole join flow.
    pub deadline_secs: u64,
}

impl Default for JoinSection {
    fn default() -> Self {
        Self { deadline_secs: 30 }
    }
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {}", path))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("PORT")
            && !v.trim().is_empty()
        {
            let port: u16 = v
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", v))?;
            self.server.web_address = format!("0.0.0.0:{}", port);
        }
        if let Ok(v) = std::env::var("WEB_ADDRESS") {
            self.server.web_address = v;
        }
        if let Ok(v) = std::env::var("PUBLIC_URL") {
            self.server.public_url = Some(v);
        }
        if let Ok(v) = std::env::var("MAX_BODY_BYTES")
            && let Ok(bytes) = v.parse()
        {
            self.server.max_body_bytes = bytes;
        }
        if let Ok(v) = std::env::var("STREAM_API_KEY") {
            self.stream.api_key = v;
        }
        if let Ok(v) = std::env::var("STREAM_API_SECRET") {
            self.stream.api_secret = v;
        }
        if let Ok(v) = std::env::var("STREAM_BASE_URL") {
            self.stream.base_url = v;
        }
        if let Ok(v) = std::env::var("STREAM_TIMEOUT_SECS")
            && let Ok(secs) = v.parse()
        {
            self.stream.timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("JOIN_DEADLINE_SECS")
            && let Ok(secs) = v.parse()
        {
            self.join.deadline_secs = secs;
        }
        Ok(())
    }

    /// The backend credentials have no usable default.
    pub fn validate(&self) -> Result<()> {
        if self.stream.api_key.trim().is_empty() {
            bail!("STREAM_API_KEY is not set");
        }
        if self.stream.api_secret.trim().is_empty() {
            bail!("STREAM_API_SECRET is not set");
        }
        if self.join.deadline_secs == 0 {
            bail!("join deadline must be at least one second");
        }
        Ok(())
    }
}
