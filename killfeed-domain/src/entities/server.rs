// Tracked server entity

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entities::EventClass;
use crate::value_objects::{ChannelId, FileRole, TenantKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRouting {
    pub killfeed: Option<ChannelId>,
    pub connections: Option<ChannelId>,
    pub events: Option<ChannelId>,
}

impl ChannelRouting {
    pub fn destination(&self, class: EventClass) -> Option<ChannelId> {
        match class {
            EventClass::Killfeed => self.killfeed,
            EventClass::Connection => self.connections.or(self.events),
            EventClass::World => self.events,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedServer {
    pub tenant: TenantKey,
    pub name: String,
    pub log_path: Option<String>,
    pub death_log_path: Option<String>,
    pub channels: ChannelRouting,
    pub poll_interval: Duration,
    pub enabled: bool,
}

impl TrackedServer {
    pub fn path_for(&self, role: FileRole) -> Option<&str> {
        match role {
            FileRole::ServerLog => self.log_path.as_deref(),
            FileRole::DeathLog => self.death_log_path.as_deref(),
        }
    }

    pub fn roles(&self) -> Vec<FileRole> {
        FileRole::ALL
            .into_iter()
            .filter(|role| self.path_for(*role).is_some())
            .collect()
    }
}
