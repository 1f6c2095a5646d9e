// Tenant key value object

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TenantError;
use crate::value_objects::{GuildId, ServerId};

/// The (guild, server) pair every cursor, stat and event is scoped to.
///
/// Fields are private: the only way to obtain a key is through [`TenantKey::new`]
/// or [`TenantKey::resolve`], both of which reject a zero guild or a blank server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTenantKey", into = "RawTenantKey")]
pub struct TenantKey {
    guild_id: GuildId,
    server_id: ServerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTenantKey {
    guild_id: u64,
    server_id: String,
}

impl TenantKey {
    pub fn new(guild_id: u64, server_id: impl AsRef<str>) -> Result<Self, TenantError> {
        if guild_id == 0 {
            return Err(TenantError::InvalidGuild(guild_id));
        }
        let server_id = server_id.as_ref().trim();
        if server_id.is_empty() {
            return Err(TenantError::EmptyServerId);
        }
        Ok(Self {
            guild_id: GuildId(guild_id),
            server_id: ServerId(server_id.to_string()),
        })
    }

    /// Builds a key from possibly-missing inputs. Never substitutes a default.
    pub fn resolve(guild_id: Option<u64>, server_id: Option<&str>) -> Result<Self, TenantError> {
        match (guild_id, server_id) {
            (Some(guild_id), Some(server_id)) => Self::new(guild_id, server_id),
            (None, _) => Err(TenantError::Unresolved("guild id missing".to_string())),
            (_, None) => Err(TenantError::Unresolved("server id missing".to_string())),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn server_id(&self) -> &ServerId {
        &self.server_id
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.server_id)
    }
}

impl TryFrom<RawTenantKey> for TenantKey {
    type Error = TenantError;

    fn try_from(raw: RawTenantKey) -> Result<Self, Self::Error> {
        TenantKey::new(raw.guild_id, raw.server_id)
    }
}

impl From<TenantKey> for RawTenantKey {
    fn from(key: TenantKey) -> Self {
        RawTenantKey {
            guild_id: key.guild_id.0,
            server_id: key.server_id.0,
        }
    }
}
