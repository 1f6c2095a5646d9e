use killfeed_domain::{IngestError, TenantError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    TenantBoundary(TenantError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<TenantError> for AppError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::BoundaryViolation { .. } => AppError::TenantBoundary(err),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Tenant(tenant) => tenant.into(),
            other => AppError::Internal(other.into()),
        }
    }
}
