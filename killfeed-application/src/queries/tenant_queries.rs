use crate::tenants::for_each_tenant;
use crate::{AppError, AppState};
use killfeed_domain::{FileRole, IngestError, TenantSummary};

/// One summary per stored tenant, each assembled inside its own tenant scope.
pub async fn list_tenant_summaries(state: &AppState) -> Result<Vec<TenantSummary>, AppError> {
    let result = for_each_tenant(state.store.clone(), |context| async move {
        let stats = context.list_player_stats().await?;
        let server_log = context.find_cursor(FileRole::ServerLog).await?;
        let death_log = context.find_cursor(FileRole::DeathLog).await?;
        Ok::<_, IngestError>(TenantSummary {
            tenant: context.tenant().clone(),
            players: stats.len(),
            kills: stats.iter().map(|stat| stat.kills).sum(),
            deaths: stats.iter().map(|stat| stat.deaths).sum(),
            suicides: stats.iter().map(|stat| stat.suicides).sum(),
            server_log_offset: server_log.map(|cursor| cursor.line_offset),
            death_log_offset: death_log.map(|cursor| cursor.line_offset),
        })
    })
    .await;

    if let Err(AppError::TenantBoundary(_)) = &result {
        state.metrics.record_boundary_violation();
    }
    result
}
