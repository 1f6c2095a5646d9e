use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tokio::time::{timeout, Duration};
use tracing::error;

use killfeed_application::queries::tenant_queries;
use killfeed_application::AppState;
use killfeed_domain::TenantSummary;

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

/// Ready when the tenant store answers and the notification target is reachable.
pub async fn health_ready(State(state): State<AppState>) -> StatusCode {
    let timeout_secs = state.config.request_timeout_seconds.max(1);
    let timeout_duration = Duration::from_secs(timeout_secs);
    let checks = async {
        state.store.enumerate_tenants().await?;
        state.notifier.check_target().await
    };
    match timeout(timeout_duration, checks).await {
        Ok(Ok(())) => StatusCode::OK,
        Ok(Err(err)) => {
            error!(error = %err, "ready check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(_) => {
            error!(timeout_secs, "ready check timed out");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn metrics_prometheus(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string()).into_response();
    }
    let payload = state.metrics.render_prometheus();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    (headers, payload).into_response()
}

pub async fn list_tenants(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TenantSummary>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let summaries = tenant_queries::list_tenant_summaries(&state).await?;
    Ok(Json(summaries))
}
