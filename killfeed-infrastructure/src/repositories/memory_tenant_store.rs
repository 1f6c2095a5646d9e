//! Tenant store held in memory under one lock.
//!
//! Records are indexed by compound keys that lead with the [`TenantKey`], so
//! every per-tenant read is a range over a single tenant's slice.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use killfeed_domain::ports::TenantStore;
use killfeed_domain::{FileRole, PlayerId, PlayerStat, ServerCursor, TenantKey};

/// Serializable form of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub cursors: Vec<ServerCursor>,
    pub player_stats: Vec<PlayerStat>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TenantIndex {
    cursors: BTreeMap<(TenantKey, FileRole), ServerCursor>,
    stats: BTreeMap<(TenantKey, PlayerId), PlayerStat>,
}

impl TenantIndex {
    pub(crate) fn from_snapshot(snapshot: TenantSnapshot) -> Self {
        let mut index = Self::default();
        for cursor in snapshot.cursors {
            index
                .cursors
                .insert((cursor.tenant.clone(), cursor.role), cursor);
        }
        for stat in snapshot.player_stats {
            index
                .stats
                .insert((stat.tenant.clone(), stat.player_id.clone()), stat);
        }
        index
    }

    pub(crate) fn to_snapshot(&self) -> TenantSnapshot {
        TenantSnapshot {
            cursors: self.cursors.values().cloned().collect(),
            player_stats: self.stats.values().cloned().collect(),
        }
    }

    pub(crate) fn upsert_cursor(&mut self, tenant: &TenantKey, role: FileRole, cursor: &ServerCursor) {
        self.cursors.insert((tenant.clone(), role), cursor.clone());
    }

    pub(crate) fn find_cursor(&self, tenant: &TenantKey, role: FileRole) -> Option<ServerCursor> {
        self.cursors.get(&(tenant.clone(), role)).cloned()
    }

    pub(crate) fn delete_cursor(&mut self, tenant: &TenantKey, role: FileRole) -> bool {
        self.cursors.remove(&(tenant.clone(), role)).is_some()
    }

    pub(crate) fn upsert_player_stat(&mut self, tenant: &TenantKey, stat: &PlayerStat) {
        self.stats
            .insert((tenant.clone(), stat.player_id.clone()), stat.clone());
    }

    pub(crate) fn find_player_stat(&self, tenant: &TenantKey, player_id: &PlayerId) -> Option<PlayerStat> {
        self.stats.get(&(tenant.clone(), player_id.clone())).cloned()
    }

    pub(crate) fn list_player_stats(&self, tenant: &TenantKey) -> Vec<PlayerStat> {
        self.stats
            .iter()
            .skip_while(|((key, _), _)| key < tenant)
            .take_while(|((key, _), _)| key == tenant)
            .map(|(_, stat)| stat.clone())
            .collect()
    }

    pub(crate) fn commit_cycle(&mut self, tenant: &TenantKey, stats: &[PlayerStat], cursor: &ServerCursor) {
        for stat in stats {
            self.upsert_player_stat(tenant, stat);
        }
        self.upsert_cursor(tenant, cursor.role, cursor);
    }

    pub(crate) fn tenants(&self) -> Vec<TenantKey> {
        let mut tenants: Vec<TenantKey> = self
            .cursors
            .keys()
            .map(|(tenant, _)| tenant.clone())
            .chain(self.stats.keys().map(|(tenant, _)| tenant.clone()))
            .collect();
        tenants.sort();
        tenants.dedup();
        tenants
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    index: RwLock<TenantIndex>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn upsert_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
        cursor: &ServerCursor,
    ) -> anyhow::Result<()> {
        self.index.write().await.upsert_cursor(tenant, role, cursor);
        Ok(())
    }

    async fn find_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
    ) -> anyhow::Result<Option<ServerCursor>> {
        Ok(self.index.read().await.find_cursor(tenant, role))
    }

    async fn delete_cursor(&self, tenant: &TenantKey, role: FileRole) -> anyhow::Result<()> {
        self.index.write().await.delete_cursor(tenant, role);
        Ok(())
    }

    async fn upsert_player_stat(&self, tenant: &TenantKey, stat: &PlayerStat) -> anyhow::Result<()> {
        self.index.write().await.upsert_player_stat(tenant, stat);
        Ok(())
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
        self.index.write().await.commit_cycle(tenant, stats, cursor);
        Ok(())
    }

    async fn enumerate_tenants(&self) -> anyhow::Result<Vec<TenantKey>> {
        Ok(self.index.read().await.tenants())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(guild: u64, server: &str) -> TenantKey {
        TenantKey::new(guild, server).unwrap()
    }

    fn stat(tenant: &TenantKey, player: &str, kills: u64) -> PlayerStat {
        let mut stat = PlayerStat::new(tenant.clone(), PlayerId::new(player));
        stat.kills = kills;
        stat
    }

    #[tokio::test]
    async fn stats_are_scoped_by_compound_key() {
        let store = InMemoryTenantStore::new();
        let alpha = key(1, "alpha");
        let beta = key(1, "beta");
        let other = key(2, "alpha");
        for (tenant, kills) in [(&alpha, 1), (&beta, 2), (&other, 3)] {
            store
                .upsert_player_stat(tenant, &stat(tenant, "X", kills))
                .await
                .unwrap();
        }
        store
            .upsert_player_stat(&alpha, &stat(&alpha, "Y", 4))
            .await
            .unwrap();

        let found = store
            .find_player_stat(&alpha, &PlayerId::new("X"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.kills, 1);
        assert_eq!(found.tenant, alpha);

        let listed = store.list_player_stats(&alpha).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|stat| stat.tenant == alpha));
        assert_eq!(store.list_player_stats(&beta).await.unwrap().len(), 1);

        assert_eq!(
            store.enumerate_tenants().await.unwrap(),
            vec![alpha, beta, other]
        );
    }

    #[tokio::test]
    async fn commit_cycle_writes_stats_and_cursor() {
        let store = InMemoryTenantStore::new();
        let alpha = key(1, "alpha");
        let mut cursor = ServerCursor::new(alpha.clone(), FileRole::DeathLog, "/srv/deathlog.csv");
        cursor.line_offset = 42;

        store
            .commit_cycle(&alpha, &[stat(&alpha, "X", 5)], &cursor)
            .await
            .unwrap();

        let stored = store
            .find_cursor(&alpha, FileRole::DeathLog)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.line_offset, 42);
        assert!(store
            .find_cursor(&alpha, FileRole::ServerLog)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            store
                .find_player_stat(&alpha, &PlayerId::new("X"))
                .await
                .unwrap()
                .unwrap()
                .kills,
            5
        );

        store.delete_cursor(&alpha, FileRole::DeathLog).await.unwrap();
        assert!(store
            .find_cursor(&alpha, FileRole::DeathLog)
            .await
            .unwrap()
            .is_none());
    }
}
