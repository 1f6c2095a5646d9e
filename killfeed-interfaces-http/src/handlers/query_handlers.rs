use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use killfeed_application::queries::player_stat_queries;
use killfeed_application::AppState;
use killfeed_domain::{LeaderboardQuery, PlayerStatView};

use crate::error::HttpError;
use crate::middleware::authorize;

/// A guild segment that is not a positive integer leaves the tenant unresolved.
fn parse_guild(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

pub async fn get_player(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, server_id, player)): Path<(String, String, String)>,
) -> Result<Json<PlayerStatView>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let view = player_stat_queries::get_player_stat(
        &state,
        parse_guild(&guild_id),
        Some(server_id.as_str()),
        &player,
    )
    .await?;
    Ok(Json(view))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, server_id)): Path<(String, String)>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<PlayerStatView>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let board = player_stat_queries::leaderboard(
        &state,
        parse_guild(&guild_id),
        Some(server_id.as_str()),
        query,
    )
    .await?;
    Ok(Json(board))
}
