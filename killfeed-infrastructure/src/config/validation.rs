use std::collections::HashSet;

use anyhow::{anyhow, Result};

use killfeed_domain::TenantKey;

use crate::config::ServerConfig;

/// A server entry must name a valid tenant and at least one file to tail.
pub fn validate_server(server: &ServerConfig) -> Result<TenantKey> {
    let tenant = TenantKey::new(server.guild_id, &server.server_id)?;
    if server.log_path.is_none() && server.death_log_path.is_none() {
        return Err(anyhow!(
            "server {} needs log_path or death_log_path",
            tenant
        ));
    }
    Ok(tenant)
}

pub fn ensure_unique_tenants(tenants: &[TenantKey]) -> Result<()> {
    let mut seen = HashSet::new();
    for tenant in tenants {
        if !seen.insert(tenant) {
            return Err(anyhow!("server {} configured twice", tenant));
        }
    }
    Ok(())
}
