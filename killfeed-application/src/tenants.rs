//! Administrative iteration across tenants.
//!
//! This is the only place that spans tenants. Each callback receives a
//! context scoped to exactly one tenant, so cross-tenant aggregates are
//! composed from per-tenant reads and never from a single unscoped query.

use std::future::Future;
use std::sync::Arc;

use killfeed_domain::ports::TenantStore;
use killfeed_domain::services::TenantContext;
use killfeed_domain::IngestError;
use tracing::error;

use crate::AppError;

pub async fn for_each_tenant<F, Fut, T>(store: Arc<dyn TenantStore>, mut f: F) -> Result<Vec<T>, AppError>
where
    F: FnMut(TenantContext) -> Fut,
    Fut: Future<Output = Result<T, IngestError>>,
{
    let mut tenants = store.enumerate_tenants().await.map_err(|err| {
        error!(error = %err, "failed to enumerate tenants");
        AppError::Internal(err)
    })?;
    tenants.sort();
    tenants.dedup();

    let mut results = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        let context = TenantContext::new(tenant, store.clone());
        results.push(f(context).await?);
    }
    Ok(results)
}
