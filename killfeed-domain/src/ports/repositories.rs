use async_trait::async_trait;

use crate::entities::{PlayerStat, ServerCursor};
use crate::value_objects::{FileRole, PlayerId, TenantKey};

/// Durable tenant-scoped storage for cursors and player stats.
///
/// Every method takes the tenant explicitly. `enumerate_tenants` is the only
/// call that spans tenants and exists for administrative iteration.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn upsert_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
        cursor: &ServerCursor,
    ) -> anyhow::Result<()>;
    async fn find_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
    ) -> anyhow::Result<Option<ServerCursor>>;
    async fn delete_cursor(&self, tenant: &TenantKey, role: FileRole) -> anyhow::Result<()>;

    async fn upsert_player_stat(&self, tenant: &TenantKey, stat: &PlayerStat) -> anyhow::Result<()>;
    async fn find_player_stat(
        &self,
        tenant: &TenantKey,
        player_id: &PlayerId,
    ) -> anyhow::Result<Option<PlayerStat>>;
    async fn list_player_stats(&self, tenant: &TenantKey) -> anyhow::Result<Vec<PlayerStat>>;

    /// Persists the stats touched by one cycle together with the advanced cursor.
    ///
    /// The default writes stats first and the cursor last, so a failure in
    /// between re-reads the range on the next cycle. Stores able to do better
    /// override this with a single atomic write.
    async fn commit_cycle(
        &self,
        tenant: &TenantKey,
        stats: &[PlayerStat],
        cursor: &ServerCursor,
    ) -> anyhow::Result<()> {
        for stat in stats {
            self.upsert_player_stat(tenant, stat).await?;
        }
        self.upsert_cursor(tenant, cursor.role, cursor).await
    }

    async fn enumerate_tenants(&self) -> anyhow::Result<Vec<TenantKey>>;
}
