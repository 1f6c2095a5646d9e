// Line-to-event extraction for both tailed file kinds

pub mod death_log;
pub mod server_log;

pub use death_log::DeathLogExtractor;
pub use server_log::ServerLogExtractor;

use crate::entities::GameEvent;
use crate::value_objects::{FileRole, TenantKey};

/// Result of extracting one batch of lines. Counters never affect state.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Extraction {
    pub events: Vec<GameEvent>,
    pub unmatched: usize,
    pub malformed: usize,
    pub discarded: usize,
}

pub trait LineExtractor: Send + Sync {
    fn extract(&self, tenant: &TenantKey, lines: &[String]) -> Extraction;
}

pub fn extractor_for(role: FileRole) -> Box<dyn LineExtractor> {
    match role {
        FileRole::ServerLog => Box::new(ServerLogExtractor::new()),
        FileRole::DeathLog => Box::new(DeathLogExtractor::new()),
    }
}
