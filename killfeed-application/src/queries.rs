// Read-only application queries

pub mod player_stat_queries;
pub mod tenant_queries;
