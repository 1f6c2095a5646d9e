// Cursor entity
// Persisted read position within one tailed file of one tenant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{FileRole, TenantKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCursor {
    pub tenant: TenantKey,
    pub role: FileRole,
    pub tracked_file_name: String,
    pub line_offset: u64,
    pub last_known_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub last_rotation: Option<DateTime<Utc>>,
}

impl ServerCursor {
    pub fn new(tenant: TenantKey, role: FileRole, tracked_file_name: impl Into<String>) -> Self {
        Self {
            tenant,
            role,
            tracked_file_name: tracked_file_name.into(),
            line_offset: 0,
            last_known_size: 0,
            last_modified: None,
            last_rotation: None,
        }
    }

    /// Starts a new file epoch.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.line_offset = 0;
        self.last_rotation = Some(now);
    }

    pub fn advance(&mut self, lines: u64) {
        self.line_offset = self.line_offset.saturating_add(lines);
    }
}
