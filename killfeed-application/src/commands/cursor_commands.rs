use chrono::Utc;
use tracing::{info, warn};

use crate::{AppError, AppState};
use killfeed_domain::services::TenantContext;
use killfeed_domain::{FileRole, ServerCursor};

/// Rewinds a tenant's cursor so the next cycle starts a fresh epoch at line 0.
pub async fn reset_cursor(
    state: &AppState,
    guild_id: Option<u64>,
    server_id: Option<&str>,
    role: &str,
) -> Result<ServerCursor, AppError> {
    let role = FileRole::try_from(role).map_err(AppError::BadRequest)?;
    let context = TenantContext::resolve(guild_id, server_id, state.store.clone())?;

    let mut cursor = context.find_cursor(role).await.map_err(|err| {
        if err.is_boundary_violation() {
            state.metrics.record_boundary_violation();
        }
        AppError::from(err)
    })?;
    let Some(cursor) = cursor.as_mut() else {
        warn!(tenant = %context.tenant(), role = %role, "reset requested for unknown cursor");
        return Err(AppError::NotFound(format!(
            "no {} cursor for {}",
            role,
            context.tenant()
        )));
    };

    let previous_offset = cursor.line_offset;
    cursor.reset(Utc::now());
    context.save_cursor(cursor).await?;
    state.metrics.record_rotation();
    info!(
        tenant = %context.tenant(),
        role = %role,
        previous_offset,
        "cursor reset by operator"
    );
    Ok(cursor.clone())
}
