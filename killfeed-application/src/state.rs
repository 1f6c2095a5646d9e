use std::sync::Arc;

use killfeed_domain::ports::{Notifier, TenantStore};
use killfeed_domain::RuntimeConfig;

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub store: Arc<dyn TenantStore>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<Metrics>,
}
