// Killfeed Application Layer

pub mod commands;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod queries;
pub mod state;
pub mod tenants;

pub use error::AppError;
pub use ingest::{IngestDeps, IngestScheduler, ServerPoller};
pub use metrics::Metrics;
pub use state::AppState;
pub use tenants::for_each_tenant;
