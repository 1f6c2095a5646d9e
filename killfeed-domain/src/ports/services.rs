use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::GameEvent;
use crate::error::RemoteFileError;
use crate::value_objects::ChannelId;

/// Read access to a game server's files over whatever transport hosts them.
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    async fn size(&self, path: &str) -> Result<u64, RemoteFileError>;
    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, RemoteFileError>;
    async fn exists(&self, path: &str) -> Result<bool, RemoteFileError>;
    /// Lines after the first `from_line` lines, in file order.
    async fn read_lines_after(
        &self,
        path: &str,
        from_line: u64,
    ) -> Result<Vec<String>, RemoteFileError>;
    /// Only used for diagnostic probe files.
    async fn write(&self, path: &str, content: &[u8]) -> Result<(), RemoteFileError>;
}

/// Outbound delivery of extracted events. Fire-and-forget.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn dispatch(&self, event: GameEvent, destination: ChannelId);
    async fn check_target(&self) -> anyhow::Result<()>;
}

/// Wall-clock source for dedup windows and rotation timestamps.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    fn now_utc(&self) -> DateTime<Utc> {
        crate::utils::millis_to_utc(self.now_millis())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        crate::utils::current_millis()
    }
}
