// Domain entities
pub mod cursor;
pub mod event;
pub mod player_stat;
pub mod query;
pub mod runtime_config;
pub mod server;

pub use cursor::*;
pub use event::*;
pub use player_stat::*;
pub use query::*;
pub use runtime_config::*;
pub use server::*;
