#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use killfeed_application::{IngestDeps, Metrics};
use killfeed_domain::ports::{Clock, Notifier, RemoteFileStore, TenantStore};
use killfeed_domain::{
    ChannelId, ChannelRouting, FileRole, GameEvent, PlayerId, PlayerStat, RemoteFileError,
    ServerCursor, TenantKey, TrackedServer,
};

pub const SERVER_LOG: &str = "/srv/game/Logs/server.log";
pub const DEATH_LOG: &str = "/srv/game/Logs/deathlog.csv";

pub fn tenant(guild: u64, server: &str) -> TenantKey {
    TenantKey::new(guild, server).unwrap()
}

pub fn tracked(tenant: TenantKey) -> TrackedServer {
    TrackedServer {
        tenant,
        name: "test server".to_string(),
        log_path: Some(SERVER_LOG.to_string()),
        death_log_path: Some(DEATH_LOG.to_string()),
        channels: ChannelRouting {
            killfeed: Some(ChannelId(100)),
            connections: Some(ChannelId(200)),
            events: Some(ChannelId(300)),
        },
        poll_interval: Duration::from_millis(20),
        enabled: true,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    cursors: Mutex<HashMap<(TenantKey, FileRole), ServerCursor>>,
    stats: Mutex<HashMap<(TenantKey, PlayerId), PlayerStat>>,
    cursor_writes: Mutex<Vec<ServerCursor>>,
    fail_commits: AtomicBool,
    fail_cursor_writes: AtomicUsize,
    fail_stat_reads: AtomicBool,
}

impl MemoryStore {
    pub fn cursor(&self, tenant: &TenantKey, role: FileRole) -> Option<ServerCursor> {
        self.cursors
            .lock()
            .unwrap()
            .get(&(tenant.clone(), role))
            .cloned()
    }

    pub fn stat(&self, tenant: &TenantKey, player: &str) -> Option<PlayerStat> {
        self.stats
            .lock()
            .unwrap()
            .get(&(tenant.clone(), PlayerId::new(player)))
            .cloned()
    }

    pub fn cursor_writes(&self) -> Vec<ServerCursor> {
        self.cursor_writes.lock().unwrap().clone()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Fails the next `count` cursor writes, including the one inside a commit.
    pub fn fail_next_cursor_writes(&self, count: usize) {
        self.fail_cursor_writes.store(count, Ordering::SeqCst);
    }

    pub fn fail_stat_reads(&self, fail: bool) {
        self.fail_stat_reads.store(fail, Ordering::SeqCst);
    }

    pub fn insert_raw_stat(&self, key_tenant: &TenantKey, stat: PlayerStat) {
        self.stats
            .lock()
            .unwrap()
            .insert((key_tenant.clone(), stat.player_id.clone()), stat);
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn upsert_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
        cursor: &ServerCursor,
    ) -> anyhow::Result<()> {
        let pending = self.fail_cursor_writes.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_cursor_writes.store(pending - 1, Ordering::SeqCst);
            anyhow::bail!("cursor write rejected");
        }
        self.cursor_writes.lock().unwrap().push(cursor.clone());
        self.cursors
            .lock()
            .unwrap()
            .insert((tenant.clone(), role), cursor.clone());
        Ok(())
    }

    async fn find_cursor(
        &self,
        tenant: &TenantKey,
        role: FileRole,
    ) -> anyhow::Result<Option<ServerCursor>> {
        Ok(self.cursor(tenant, role))
    }

    async fn delete_cursor(&self, tenant: &TenantKey, role: FileRole) -> anyhow::Result<()> {
        self.cursors.lock().unwrap().remove(&(tenant.clone(), role));
        Ok(())
    }

    async fn upsert_player_stat(&self, tenant: &TenantKey, stat: &PlayerStat) -> anyhow::Result<()> {
        self.insert_raw_stat(tenant, stat.clone());
        Ok(())
    }

    async fn find_player_stat(
        &self,
        tenant: &TenantKey,
        player_id: &PlayerId,
    ) -> anyhow::Result<Option<PlayerStat>> {
        if self.fail_stat_reads.load(Ordering::SeqCst) {
            anyhow::bail!("stat read timed out");
        }
        Ok(self
            .stats
            .lock()
            .unwrap()
            .get(&(tenant.clone(), player_id.clone()))
            .cloned())
    }

    async fn list_player_stats(&self, tenant: &TenantKey) -> anyhow::Result<Vec<PlayerStat>> {
        Ok(self
            .stats
            .lock()
            .unwrap()
            .iter()
            .filter(|((key, _), _)| key == tenant)
            .map(|(_, stat)| stat.clone())
            .collect())
    }

    async fn commit_cycle(
        &self,
        tenant: &TenantKey,
        stats: &[PlayerStat],
        cursor: &ServerCursor,
    ) -> anyhow::Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        for stat in stats {
            self.upsert_player_stat(tenant, stat).await?;
        }
        self.upsert_cursor(tenant, cursor.role, cursor).await
    }

    async fn enumerate_tenants(&self) -> anyhow::Result<Vec<TenantKey>> {
        let mut tenants: Vec<TenantKey> = self
            .cursors
            .lock()
            .unwrap()
            .keys()
            .map(|(tenant, _)| tenant.clone())
            .chain(self.stats.lock().unwrap().keys().map(|(tenant, _)| tenant.clone()))
            .collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }
}

#[derive(Debug, Clone)]
struct FakeFile {
    lines: Vec<String>,
    size: u64,
    modified: DateTime<Utc>,
}

pub struct FakeFiles {
    files: Mutex<HashMap<String, FakeFile>>,
    written: Mutex<Vec<String>>,
    failing: AtomicBool,
    base: DateTime<Utc>,
}

impl Default for FakeFiles {
    fn default() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            written: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            base: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }
}

impl FakeFiles {
    /// Appends lines, growing size by their byte length and nudging mtime.
    pub fn append(&self, path: &str, lines: &[&str]) {
        let mut files = self.files.lock().unwrap();
        let base = self.base;
        let file = files.entry(path.to_string()).or_insert_with(|| FakeFile {
            lines: Vec::new(),
            size: 0,
            modified: base,
        });
        for line in lines {
            file.size += line.len() as u64 + 1;
            file.lines.push(line.to_string());
        }
        file.modified += chrono::Duration::seconds(1);
    }

    /// Replaces the file wholesale with an explicit size.
    pub fn replace(&self, path: &str, lines: &[&str], size: u64) {
        let mut files = self.files.lock().unwrap();
        let modified = files
            .get(path)
            .map(|file| file.modified + chrono::Duration::seconds(1))
            .unwrap_or(self.base);
        files.insert(
            path.to_string(),
            FakeFile {
                lines: lines.iter().map(|line| line.to_string()).collect(),
                size,
                modified,
            },
        );
    }

    /// Moves mtime forward without touching content or size.
    pub fn touch(&self, path: &str, seconds: i64) {
        if let Some(file) = self.files.lock().unwrap().get_mut(path) {
            file.modified += chrono::Duration::seconds(seconds);
        }
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn probes_written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    fn get(&self, path: &str) -> Result<FakeFile, RemoteFileError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteFileError::transient(path, "connection reset"));
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteFileError::NotFound(path.to_string()))
    }
}

#[async_trait]
impl RemoteFileStore for FakeFiles {
    async fn size(&self, path: &str) -> Result<u64, RemoteFileError> {
        Ok(self.get(path)?.size)
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, RemoteFileError> {
        Ok(self.get(path)?.modified)
    }

    async fn exists(&self, path: &str) -> Result<bool, RemoteFileError> {
        Ok(self.written.lock().unwrap().iter().any(|p| p == path)
            || self.files.lock().unwrap().contains_key(path))
    }

    async fn read_lines_after(
        &self,
        path: &str,
        from_line: u64,
    ) -> Result<Vec<String>, RemoteFileError> {
        let file = self.get(path)?;
        Ok(file.lines.into_iter().skip(from_line as usize).collect())
    }

    async fn write(&self, path: &str, _content: &[u8]) -> Result<(), RemoteFileError> {
        self.written.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(GameEvent, ChannelId)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(GameEvent, ChannelId)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn dispatch(&self, event: GameEvent, destination: ChannelId) {
        self.sent.lock().unwrap().push((event, destination));
    }

    async fn check_target(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn set(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub files: Arc<FakeFiles>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::default());
        clock.set(1_704_110_400_000);
        Self {
            store: Arc::new(MemoryStore::default()),
            files: Arc::new(FakeFiles::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            clock,
            metrics: Arc::new(Metrics::default()),
        }
    }

    pub fn deps(&self) -> IngestDeps {
        IngestDeps {
            store: self.store.clone(),
            files: self.files.clone(),
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
            metrics: self.metrics.clone(),
            io_timeout: Duration::from_secs(2),
            dedup_window_ms: 3_000,
        }
    }
}
