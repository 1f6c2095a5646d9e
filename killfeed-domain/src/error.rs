// Domain error taxonomy

use thiserror::Error;

use crate::value_objects::{FileRole, TenantKey};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TenantError {
    #[error("guild id must be positive, got {0}")]
    InvalidGuild(u64),
    #[error("server id must not be empty")]
    EmptyServerId,
    #[error("tenant could not be resolved: {0}")]
    Unresolved(String),
    #[error("tenant boundary violation on {record}: context {expected}, record {found}")]
    BoundaryViolation {
        record: &'static str,
        expected: TenantKey,
        found: TenantKey,
    },
}

/// Failures reported by a remote file transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteFileError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("transient i/o failure on {path}: {reason}")]
    Transient { path: String, reason: String },
}

impl RemoteFileError {
    pub fn transient(path: impl Into<String>, reason: impl ToString) -> Self {
        RemoteFileError::Transient {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Why an ingestion cycle (or one file role of it) stopped early.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transient i/o failure on {role}: {source}")]
    Transient {
        role: FileRole,
        #[source]
        source: RemoteFileError,
    },
    #[error(transparent)]
    Tenant(#[from] TenantError),
    #[error("persistence failed for {tenant}: {source}")]
    Persistence {
        tenant: TenantKey,
        #[source]
        source: anyhow::Error,
    },
}

impl IngestError {
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Transient { .. })
    }

    pub fn is_boundary_violation(&self) -> bool {
        matches!(
            self,
            IngestError::Tenant(TenantError::BoundaryViolation { .. })
        )
    }
}
