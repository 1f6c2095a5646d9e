use std::collections::HashMap;

use crate::entities::GameEvent;
use crate::value_objects::TenantKey;

pub const DUPLICATE_THRESHOLD_MS: i64 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    tenant: TenantKey,
    discriminator: String,
}

/// Suppresses identical events seen again within the dedup window.
#[derive(Debug)]
pub struct Deduplicator {
    window_ms: i64,
    entries: HashMap<DedupKey, i64>,
    last_prune_ms: i64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DUPLICATE_THRESHOLD_MS)
    }
}

impl Deduplicator {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms: window_ms.max(0),
            entries: HashMap::new(),
            last_prune_ms: 0,
        }
    }

    /// Returns true when `event` duplicates one emitted less than the window ago.
    /// A suppressed event does not refresh the stored timestamp.
    pub fn should_suppress(&mut self, event: &GameEvent, now_ms: i64) -> bool {
        self.prune(now_ms);
        let key = DedupKey {
            tenant: event.tenant.clone(),
            discriminator: event.kind.discriminator(),
        };
        if let Some(last) = self.entries.get(&key) {
            if now_ms - *last < self.window_ms {
                return true;
            }
        }
        self.entries.insert(key, now_ms);
        false
    }

    /// Drops the entries `events` recorded at `recorded_at_ms`. A batch whose
    /// commit failed is read again and must not be suppressed then.
    pub fn forget(&mut self, events: &[GameEvent], recorded_at_ms: i64) {
        for event in events {
            let key = DedupKey {
                tenant: event.tenant.clone(),
                discriminator: event.kind.discriminator(),
            };
            if self.entries.get(&key) == Some(&recorded_at_ms) {
                self.entries.remove(&key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn prune(&mut self, now_ms: i64) {
        if now_ms - self.last_prune_ms < self.window_ms {
            return;
        }
        let window_ms = self.window_ms;
        self.entries.retain(|_, last| now_ms - *last < window_ms);
        self.last_prune_ms = now_ms;
    }
}
