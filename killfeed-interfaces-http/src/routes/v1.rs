use axum::Router;

use killfeed_application::AppState;

use crate::handlers::{ops_handlers, query_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/ops/health/live",
            axum::routing::get(ops_handlers::health_live),
        )
        .route(
            "/v1/ops/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/v1/ops/metrics/prometheus",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .route(
            "/v1/ops/tenants",
            axum::routing::get(ops_handlers::list_tenants),
        )
        .route(
            "/v1/guilds/:guild_id/servers/:server_id/players/:player",
            axum::routing::get(query_handlers::get_player),
        )
        .route(
            "/v1/guilds/:guild_id/servers/:server_id/leaderboard",
            axum::routing::get(query_handlers::leaderboard),
        )
        .with_state(state)
}
