// Domain services: the ingestion pipeline stages

pub mod aggregator;
pub mod dedup;
pub mod extractor;
pub mod rotation;
pub mod tenant_context;

pub use aggregator::*;
pub use dedup::*;
pub use extractor::*;
pub use rotation::*;
pub use tenant_context::*;
