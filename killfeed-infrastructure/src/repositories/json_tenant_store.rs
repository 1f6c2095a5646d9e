//! Tenant store persisted as one JSON snapshot file.
//!
//! Every mutation is applied to a copy of the index, written to a temp file
//! and renamed over the snapshot. The in-memory index is swapped only after
//! the rename succeeds, so a failed write leaves both views at the old state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use killfeed_domain::ports::TenantStore;
use killfeed_domain::{FileRole, PlayerId, PlayerStat, ServerCursor, TenantKey};

use crate::repositories::memory_tenant_store::{TenantIndex, TenantSnapshot};
use crate::utils::ensure_parent_dir;

pub struct JsonFileTenantStore {
    path: PathBuf,
    index: RwLock<TenantIndex>,
}

impl JsonFileTenantStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let index = if path.exists() {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading tenant store {}", path.display()))?;
            let snapshot: TenantSnapshot = serde_json::from_str(&content)
                .with_context(|| format!("parsing tenant store {}", path.display()))?;
            info!(
                path = %path.display(),
                cursors = snapshot.cursors.len(),
                player_stats = snapshot.player_stats.len(),
                "tenant store loaded"
            );
            TenantIndex::from_snapshot(snapshot)
        } else {
            info!(path = %path.display(), "tenant store not found, starting empty");
            TenantIndex::default()
        };
        Ok(Self {
            path,
            index: RwLock::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut TenantIndex),
    {
        let mut guard = self.index.write().await;
        let mut next = guard.clone();
        apply(&mut next);
        write_snapshot(&self.path, &next.to_snapshot()).await?;
        *guard = next;
        Ok(())
    }
}

async fn write_snapshot(path: &Path, snapshot: &TenantSnapshot) -> Result<()> {
    ensure_parent_dir(path).await?;
    let content = serde_json::to_vec_pretty(snapshot)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "tenants.json".to_string());
    let temp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
    fs::write(&temp, &content)
        .await
        .with_context(|| format!("writing {}", temp.display()))?;
    if let Err(err) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(err).with_context(|| format!("replacing {}", path.display()));
    }
    debug!(path = %path.display(), bytes = content.len(), "tenant snapshot written");
    Ok(())
}

#[async_trait]
impl TenantStore for JsonFileTenantStore {
    async fn upsert_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
        cursor: &ServerCursor,
    ) -> anyhow::Result<()> {
        self.mutate(|index| index.upsert_cursor(tenant, role, cursor))
            .await
    }

    async fn find_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
    ) -> anyhow::Result<Option<ServerCursor>> {
        Ok(self.index.read().await.find_cursor(tenant, role))
    }

    async fn delete_cursor(&self, tenant: &TenantKey, role: FileRole) -> anyhow::Result<()> {
        self.mutate(|index| {
            index.delete_cursor(tenant, role);
        })
        .await
    }

    async fn upsert_player_stat(&self, tenant: &TenantKey, stat: &PlayerStat) -> anyhow::Result<()> {
        self.mutate(|index| index.upsert_player_stat(tenant, stat))
            .await
    }

    async fn find_player_stat(
        &self,
        tenant: &TenantKey,
        player_id: &PlayerId,
    ) -> anyhow::Result<Option<PlayerStat>> {
        Ok(self.index.read().await.find_player_stat(tenant, player_id))
    }

    async fn list_player_stats(&self, tenant: &TenantKey) -> anyhow::Result<Vec<PlayerStat>> {
        Ok(self.index.read().await.list_player_stats(tenant))
    }

    async fn commit_cycle(
        &self,
        tenant: &TenantKey,
        stats: &[PlayerStat],
        cursor: &ServerCursor,
    ) -> anyhow::Result<()> {
        self.mutate(|index| index.commit_cycle(tenant, stats, cursor))
            .await
    }

    async fn enumerate_tenants(&self) -> anyhow::Result<Vec<TenantKey>> {
        Ok(self.index.read().await.tenants())
    }
}
