use tracing::error;

use crate::{AppError, AppState};
use killfeed_domain::services::TenantContext;
use killfeed_domain::{LeaderboardMetric, LeaderboardQuery, PlayerId, PlayerStatView};

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

pub async fn get_player_stat(
    state: &AppState,
    guild_id: Option<u64>,
    server_id: Option<&str>,
    player: &str,
) -> Result<PlayerStatView, AppError> {
    let player_id = PlayerId::new(player);
    if player_id.as_str().is_empty() {
        return Err(AppError::BadRequest("player must not be empty".to_string()));
    }
    let context = TenantContext::resolve(guild_id, server_id, state.store.clone())?;
    let stat = context
        .find_player_stat(&player_id)
        .await
        .map_err(|err| observe(state, err))?;
    stat.as_ref().map(PlayerStatView::from).ok_or_else(|| {
        AppError::NotFound(format!("no stats for {} on {}", player_id, context.tenant()))
    })
}

pub async fn leaderboard(
    state: &AppState,
    guild_id: Option<u64>,
    server_id: Option<&str>,
    query: LeaderboardQuery,
) -> Result<Vec<PlayerStatView>, AppError> {
    let context = TenantContext::resolve(guild_id, server_id, state.store.clone())?;
    let metric = match query.metric.as_deref() {
        Some(name) => LeaderboardMetric::try_from(name).map_err(AppError::BadRequest)?,
        None => LeaderboardMetric::Kills,
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let mut stats = context
        .list_player_stats()
        .await
        .map_err(|err| observe(state, err))?;
    stats.sort_by(|a, b| {
        metric
            .score(b)
            .total_cmp(&metric.score(a))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    Ok(stats.iter().take(limit).map(PlayerStatView::from).collect())
}

fn observe(state: &AppState, err: killfeed_domain::IngestError) -> AppError {
    if err.is_boundary_violation() {
        state.metrics.record_boundary_violation();
    } else {
        error!(error = %err, "player stat query failed");
    }
    err.into()
}
