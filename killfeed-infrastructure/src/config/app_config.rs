use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use killfeed_domain::{
    normalize_optional_text, ChannelId, ChannelRouting, RuntimeConfig, TrackedServer,
    DUPLICATE_THRESHOLD_MS,
};

use crate::config::validation::{ensure_unique_tenants, validate_server};
use crate::utils::resolve_path;

pub const CONFIG_ENV: &str = "KILLFEED_CONFIG";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub store_path: Option<String>,
    pub log_dir: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
    pub request_timeout_seconds: u64,
    pub io_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub dedup_window_ms: i64,
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub guild_id: u64,
    pub server_id: String,
    pub name: Option<String>,
    pub log_path: Option<String>,
    pub death_log_path: Option<String>,
    pub killfeed_channel_id: Option<u64>,
    pub events_channel_id: Option<u64>,
    pub connection_channel_id: Option<u64>,
    pub poll_interval_seconds: Option<u64>,
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            guild_id: 0,
            server_id: String::new(),
            name: None,
            log_path: None,
            death_log_path: None,
            killfeed_channel_id: None,
            events_channel_id: None,
            connection_channel_id: None,
            poll_interval_seconds: None,
            enabled: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            store_path: None,
            log_dir: None,
            webhook_url: None,
            webhook_token: None,
            request_timeout_seconds: 15,
            io_timeout_seconds: 10,
            poll_interval_seconds: 30,
            dedup_window_ms: DUPLICATE_THRESHOLD_MS,
            servers: Vec::new(),
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| "./config.toml".to_string());
        Self::load_from(Path::new(&path)).await
    }

    pub async fn load_from(file_path: &Path) -> Result<Self> {
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path)
                .await
                .with_context(|| format!("reading {}", file_path.display()))?;
            Self::from_toml_str(&content)?
        } else {
            warn!(path = %file_path.display(), "config file not found, using defaults");
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| anyhow!("invalid config: {}", err))
    }

    pub fn normalize(&mut self) {
        self.api_token = normalize_optional_text(self.api_token.take());
        self.store_path = normalize_optional_text(self.store_path.take());
        self.log_dir = normalize_optional_text(self.log_dir.take());
        self.webhook_url = normalize_optional_text(self.webhook_url.take());
        self.webhook_token = normalize_optional_text(self.webhook_token.take());
        for server in &mut self.servers {
            server.server_id = server.server_id.trim().to_string();
            server.name = normalize_optional_text(server.name.take());
            server.log_path = normalize_optional_text(server.log_path.take());
            server.death_log_path = normalize_optional_text(server.death_log_path.take());
            server.killfeed_channel_id = server.killfeed_channel_id.filter(|id| *id > 0);
            server.events_channel_id = server.events_channel_id.filter(|id| *id > 0);
            server.connection_channel_id = server.connection_channel_id.filter(|id| *id > 0);
            server.poll_interval_seconds = server.poll_interval_seconds.filter(|secs| *secs > 0);
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        let resolve = |value: &mut Option<String>| {
            if let Some(path) = value.as_mut() {
                *path = resolve_path(base, path);
            }
        };
        resolve(&mut self.store_path);
        resolve(&mut self.log_dir);
        for server in &mut self.servers {
            resolve(&mut server.log_path);
            resolve(&mut server.death_log_path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.io_timeout_seconds == 0 {
            return Err(anyhow!("io_timeout_seconds must be greater than 0"));
        }
        if self.poll_interval_seconds == 0 {
            return Err(anyhow!("poll_interval_seconds must be greater than 0"));
        }
        if self.dedup_window_ms < 0 {
            return Err(anyhow!("dedup_window_ms must not be negative"));
        }
        if let Some(url) = &self.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow!("webhook_url must be an http(s) url"));
            }
        }
        let mut tenants = Vec::with_capacity(self.servers.len());
        for (index, server) in self.servers.iter().enumerate() {
            let tenant = validate_server(server)
                .map_err(|err| anyhow!("servers[{}]: {}", index, err))?;
            tenants.push(tenant);
        }
        ensure_unique_tenants(&tenants)?;
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            webhook_url: self.webhook_url.clone(),
            webhook_token: self.webhook_token.clone(),
            request_timeout_seconds: self.request_timeout_seconds,
            io_timeout_seconds: self.io_timeout_seconds,
            poll_interval_seconds: self.poll_interval_seconds,
            dedup_window_ms: self.dedup_window_ms,
        }
    }

    pub fn to_tracked_servers(&self) -> Result<Vec<TrackedServer>> {
        self.servers
            .iter()
            .map(|server| {
                let tenant = validate_server(server)?;
                let interval = server
                    .poll_interval_seconds
                    .unwrap_or(self.poll_interval_seconds);
                Ok(TrackedServer {
                    name: server
                        .name
                        .clone()
                        .unwrap_or_else(|| tenant.server_id().to_string()),
                    tenant,
                    log_path: server.log_path.clone(),
                    death_log_path: server.death_log_path.clone(),
                    channels: ChannelRouting {
                        killfeed: server.killfeed_channel_id.map(ChannelId),
                        connections: server.connection_channel_id.map(ChannelId),
                        events: server.events_channel_id.map(ChannelId),
                    },
                    poll_interval: Duration::from_secs(interval),
                    enabled: server.enabled,
                })
            })
            .collect()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("KILLFEED_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("KILLFEED_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("KILLFEED_STORE_PATH") {
            self.store_path = Some(value);
        }
        if let Ok(value) = env::var("KILLFEED_LOG_DIR") {
            self.log_dir = Some(value);
        }
        if let Ok(value) = env::var("KILLFEED_WEBHOOK_URL") {
            self.webhook_url = Some(value);
        }
        if let Ok(value) = env::var("KILLFEED_WEBHOOK_TOKEN") {
            self.webhook_token = Some(value);
        }
        if let Ok(value) = env::var("KILLFEED_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
        if let Ok(value) = env::var("KILLFEED_IO_TIMEOUT_SECONDS") {
            self.io_timeout_seconds = value.parse().unwrap_or(self.io_timeout_seconds);
        }
        if let Ok(value) = env::var("KILLFEED_POLL_INTERVAL_SECONDS") {
            self.poll_interval_seconds = value.parse().unwrap_or(self.poll_interval_seconds);
        }
        if let Ok(value) = env::var("KILLFEED_DEDUP_WINDOW_MS") {
            self.dedup_window_ms = value.parse().unwrap_or(self.dedup_window_ms);
        }
    }
}
