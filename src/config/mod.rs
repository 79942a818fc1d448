use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "LEARN_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "learnserver.toml";
pub const ENV_PREFIX: &str = "LEARN_";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub events: EventsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Http,
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Http,
            base_url: "http://localhost:8000/api".to_string(),
            api_token: None,
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Bounded intake queue for learner interactions.
    pub queue_capacity: usize,
    /// Buffer of the progress event broadcast; slow subscribers lag past it.
    pub broadcast_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            broadcast_capacity: 256,
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file named by `LEARN_CONFIG` (or
    /// `learnserver.toml`), then `LEARN_*` environment variables with `__`
    /// separating nested keys (`LEARN_BACKEND__BASE_URL`).
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_file(path)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults and environment", path.display());
        }
        Self::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: AppConfig = figment.extract()?;
        Ok(config.sanitized())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn sanitized(mut self) -> Self {
        if self.events.queue_capacity < 1 {
            warn!("Event queue capacity 0 is invalid, setting to 1");
            self.events.queue_capacity = 1;
        }
        if self.events.broadcast_capacity < 16 {
            warn!(
                "Broadcast capacity {} is too low, setting to minimum of 16",
                self.events.broadcast_capacity
            );
            self.events.broadcast_capacity = 16;
        }
        if self.backend.timeout_secs < 1 {
            warn!("Backend timeout 0 is invalid, setting to minimum of 1 second");
            self.backend.timeout_secs = 1;
        }
        if self.backend.kind == BackendKind::Http && self.backend.base_url.trim().is_empty() {
            warn!("Backend base_url is empty; collaborator requests will fail");
        }
        self
    }
}
