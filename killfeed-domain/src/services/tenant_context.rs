//! Explicit tenant scope for every cursor and stat access.
//!
//! A `TenantContext` pairs one validated [`TenantKey`] with the store. Writes
//! refuse records owned by another tenant, and reads refuse records the store
//! hands back for another tenant, so a misbehaving store cannot leak data
//! across the boundary.

use std::sync::Arc;

use tracing::error;

use crate::entities::{PlayerStat, ServerCursor};
use crate::error::{IngestError, TenantError};
use crate::ports::TenantStore;
use crate::value_objects::{FileRole, PlayerId, TenantKey};

#[derive(Clone)]
pub struct TenantContext {
    tenant: TenantKey,
    store: Arc<dyn TenantStore>,
}

impl std::fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContext")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

impl TenantContext {
    pub fn new(tenant: TenantKey, store: Arc<dyn TenantStore>) -> Self {
        Self { tenant, store }
    }

    pub fn resolve(
        guild_id: Option<u64>,
        server_id: Option<&str>,
        store: Arc<dyn TenantStore>,
    ) -> Result<Self, TenantError> {
        match TenantKey::resolve(guild_id, server_id) {
            Ok(tenant) => Ok(Self::new(tenant, store)),
            Err(err) => {
                error!(?guild_id, ?server_id, error = %err, "rejecting operation without a resolvable tenant");
                Err(err)
            }
        }
    }

    pub fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    pub async fn find_cursor(&self, role: FileRole) -> Result<Option<ServerCursor>, IngestError> {
        let cursor = self
            .store
            .find_cursor(&self.tenant, role)
            .await
            .map_err(|source| self.persistence(source))?;
        if let Some(cursor) = &cursor {
            self.ensure_owned("cursor", &cursor.tenant)?;
        }
        Ok(cursor)
    }

    pub async fn save_cursor(&self, cursor: &ServerCursor) -> Result<(), IngestError> {
        self.ensure_owned("cursor", &cursor.tenant)?;
        self.store
            .upsert_cursor(&self.tenant, cursor.role, cursor)
            .await
            .map_err(|source| self.persistence(source))
    }

    pub async fn find_player_stat(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<PlayerStat>, IngestError> {
        let stat = self
            .store
            .find_player_stat(&self.tenant, player_id)
            .await
            .map_err(|source| self.persistence(source))?;
        if let Some(stat) = &stat {
            self.ensure_owned("player_stat", &stat.tenant)?;
        }
        Ok(stat)
    }

    /// The stored stat for `player_id`, or a zeroed one owned by this tenant.
    pub async fn load_player_stat(&self, player_id: &PlayerId) -> Result<PlayerStat, IngestError> {
        Ok(self
            .find_player_stat(player_id)
            .await?
            .unwrap_or_else(|| PlayerStat::new(self.tenant.clone(), player_id.clone())))
    }

    pub async fn list_player_stats(&self) -> Result<Vec<PlayerStat>, IngestError> {
        let stats = self
            .store
            .list_player_stats(&self.tenant)
            .await
            .map_err(|source| self.persistence(source))?;
        for stat in &stats {
            self.ensure_owned("player_stat", &stat.tenant)?;
        }
        Ok(stats)
    }

    pub async fn commit_cycle(
        &self,
        stats: &[PlayerStat],
        cursor: &ServerCursor,
    ) -> Result<(), IngestError> {
        self.ensure_owned("cursor", &cursor.tenant)?;
        for stat in stats {
            self.ensure_owned("player_stat", &stat.tenant)?;
        }
        self.store
            .commit_cycle(&self.tenant, stats, cursor)
            .await
            .map_err(|source| self.persistence(source))
    }

    fn ensure_owned(&self, record: &'static str, found: &TenantKey) -> Result<(), TenantError> {
        if found == &self.tenant {
            return Ok(());
        }
        error!(
            record,
            expected = %self.tenant,
            found = %found,
            "tenant boundary violation; operation aborted"
        );
        Err(TenantError::BoundaryViolation {
            record,
            expected: self.tenant.clone(),
            found: found.clone(),
        })
    }

    fn persistence(&self, source: anyhow::Error) -> IngestError {
        IngestError::Persistence {
            tenant: self.tenant.clone(),
            source,
        }
    }
}
