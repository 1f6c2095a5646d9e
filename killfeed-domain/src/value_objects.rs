// Domain value objects
pub mod file_role;
pub mod identifiers;
pub mod tenant;

pub use file_role::*;
pub use identifiers::*;
pub use tenant::*;
