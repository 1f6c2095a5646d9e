use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use killfeed_application::{AppState, IngestDeps, Metrics};
use killfeed_domain::ports::{SystemClock, TenantStore};
use killfeed_domain::TrackedServer;
use killfeed_infrastructure::{
    build_notifier, AppConfig, InMemoryTenantStore, JsonFileTenantStore, LocalFileStore,
};

pub struct AppContext {
    pub config: AppConfig,
    pub state: AppState,
    pub servers: Vec<TrackedServer>,
}

impl AppContext {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let runtime_config = config.to_runtime_config();

        let store: Arc<dyn TenantStore> = match &config.store_path {
            Some(path) => Arc::new(JsonFileTenantStore::open(path).await?),
            None => {
                warn!("store_path not configured; cursors and stats are kept in memory only");
                Arc::new(InMemoryTenantStore::new())
            }
        };
        let notifier = build_notifier(&runtime_config)?;
        let servers = config.to_tracked_servers()?;
        info!(servers = servers.len(), "configuration loaded");

        let state = AppState {
            config: runtime_config,
            store,
            notifier,
            metrics: Arc::new(Metrics::default()),
        };

        Ok(Self {
            config,
            state,
            servers,
        })
    }

    pub fn ingest_deps(&self) -> IngestDeps {
        IngestDeps {
            store: self.state.store.clone(),
            files: Arc::new(LocalFileStore::new()),
            notifier: self.state.notifier.clone(),
            clock: Arc::new(SystemClock),
            metrics: self.state.metrics.clone(),
            io_timeout: Duration::from_secs(self.state.config.io_timeout_seconds),
            dedup_window_ms: self.state.config.dedup_window_ms,
        }
    }
}
