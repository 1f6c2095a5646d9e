pub mod json_tenant_store;
pub mod memory_tenant_store;

pub use json_tenant_store::*;
pub use memory_tenant_store::*;
