pub mod context;
pub mod lifecycle;
pub mod logging;

pub use lifecycle::{run_reset_cursor, run_standalone, IngestRuntime};
pub use logging::init_tracing;
