pub mod local_file_store;
pub mod notifier;

pub use local_file_store::*;
pub use notifier::*;
