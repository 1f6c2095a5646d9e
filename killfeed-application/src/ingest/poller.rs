//! One tracked server's ingestion cycle.
//!
//! A cycle walks every configured file role through stat, rotation check,
//! read, extraction, dedup, aggregation, notification and commit. Roles are
//! independent: a failure on the death log never stops the server log. The
//! cursor only moves in the commit phase, and only after the whole batch has
//! been aggregated.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use killfeed_domain::ports::{Clock, Notifier, RemoteFileStore, TenantStore};
use killfeed_domain::services::{
    extractor_for, Deduplicator, FileObservation, LineExtractor, RotationDetector, RotationReason,
    RotationVerdict, StatAggregator, TenantContext,
};
use killfeed_domain::{
    FileRole, GameEvent, IngestError, PlayerId, PlayerStat, RemoteFileError, ServerCursor,
    TenantKey, TrackedServer,
};

use crate::Metrics;

const PROBE_FILE_NAME: &str = ".killfeed_probe";

/// Ports and knobs shared by every poller of one process.
#[derive(Clone)]
pub struct IngestDeps {
    pub store: Arc<dyn TenantStore>,
    pub files: Arc<dyn RemoteFileStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<Metrics>,
    pub io_timeout: Duration,
    pub dedup_window_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    StatChecking,
    RotationEvaluating,
    Reading,
    Extracting,
    Deduplicating,
    Aggregating,
    Notifying,
    Committing,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::StatChecking => "stat_checking",
            CyclePhase::RotationEvaluating => "rotation_evaluating",
            CyclePhase::Reading => "reading",
            CyclePhase::Extracting => "extracting",
            CyclePhase::Deduplicating => "deduplicating",
            CyclePhase::Aggregating => "aggregating",
            CyclePhase::Notifying => "notifying",
            CyclePhase::Committing => "committing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleReport {
    pub role: FileRole,
    pub lines_read: usize,
    pub events_emitted: usize,
    pub events_suppressed: usize,
    pub malformed: usize,
    pub unmatched: usize,
    pub rotation: Option<RotationReason>,
    pub file_missing: bool,
    pub offset: u64,
}

impl RoleReport {
    fn new(role: FileRole) -> Self {
        Self {
            role,
            lines_read: 0,
            events_emitted: 0,
            events_suppressed: 0,
            malformed: 0,
            unmatched: 0,
            rotation: None,
            file_missing: false,
            offset: 0,
        }
    }
}

#[derive(Debug)]
pub struct RoleFailure {
    pub role: FileRole,
    pub phase: CyclePhase,
    pub error: IngestError,
}

#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub tenant: TenantKey,
    pub roles: Vec<RoleReport>,
    pub failures: Vec<RoleFailure>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn role(&self, role: FileRole) -> Option<&RoleReport> {
        self.roles.iter().find(|report| report.role == role)
    }

    pub fn failure(&self, role: FileRole) -> Option<&RoleFailure> {
        self.failures.iter().find(|failure| failure.role == role)
    }
}

/// Events that survived dedup, plus the stats they produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub emitted: Vec<GameEvent>,
    pub suppressed: usize,
    pub stats: Vec<PlayerStat>,
}

pub struct ServerPoller {
    server: TrackedServer,
    context: TenantContext,
    deps: IngestDeps,
    dedup: Deduplicator,
    detectors: HashMap<FileRole, RotationDetector>,
    extractors: HashMap<FileRole, Box<dyn LineExtractor>>,
}

impl ServerPoller {
    pub fn new(server: TrackedServer, deps: IngestDeps) -> Self {
        let context = TenantContext::new(server.tenant.clone(), deps.store.clone());
        let extractors = server
            .roles()
            .into_iter()
            .map(|role| (role, extractor_for(role)))
            .collect();
        Self {
            dedup: Deduplicator::new(deps.dedup_window_ms),
            server,
            context,
            deps,
            detectors: HashMap::new(),
            extractors,
        }
    }

    pub fn server(&self) -> &TrackedServer {
        &self.server
    }

    pub fn tenant(&self) -> &TenantKey {
        self.context.tenant()
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("poll_cycle", tenant = %self.server.tenant, %cycle_id);
        self.run_roles(cycle_id).instrument(span).await
    }

    async fn run_roles(&mut self, cycle_id: Uuid) -> CycleReport {
        let mut report = CycleReport {
            cycle_id,
            tenant: self.server.tenant.clone(),
            roles: Vec::new(),
            failures: Vec::new(),
        };

        for role in self.server.roles() {
            let Some(path) = self.server.path_for(role).map(str::to_string) else {
                continue;
            };
            let mut phase = CyclePhase::Idle;
            match self.poll_role(role, &path, &mut phase).await {
                Ok(role_report) => report.roles.push(role_report),
                Err(error) => {
                    self.record_failure(role, phase, &error);
                    report.failures.push(RoleFailure { role, phase, error });
                }
            }
        }

        self.deps.metrics.record_cycle();
        if !report.is_success() {
            self.deps.metrics.record_cycle_failure();
        }
        debug!(
            roles = report.roles.len(),
            failures = report.failures.len(),
            "poll cycle finished"
        );
        report
    }

    async fn poll_role(
        &mut self,
        role: FileRole,
        path: &str,
        phase: &mut CyclePhase,
    ) -> Result<RoleReport, IngestError> {
        let mut report = RoleReport::new(role);
        let now = self.deps.clock.now_utc();

        *phase = CyclePhase::StatChecking;
        let mut cursor = match self.context.find_cursor(role).await? {
            Some(cursor) if cursor.tracked_file_name == path => cursor,
            Some(previous) => {
                warn!(
                    role = %role,
                    previous = %previous.tracked_file_name,
                    current = path,
                    "tracked path changed; starting a new epoch"
                );
                let mut cursor = ServerCursor::new(self.server.tenant.clone(), role, path);
                self.rotate(&mut cursor, role, RotationReason::PathChanged, now)
                    .await?;
                self.detectors.remove(&role);
                report.rotation = Some(RotationReason::PathChanged);
                cursor
            }
            None => ServerCursor::new(self.server.tenant.clone(), role, path),
        };

        let observation = match self.stat(path).await {
            Ok(observation) => observation,
            Err(RemoteFileError::NotFound(_)) => {
                self.handle_missing(role, path, &mut cursor, now).await?;
                report.file_missing = true;
                report.offset = cursor.line_offset;
                return Ok(report);
            }
            Err(source) => return Err(IngestError::Transient { role, source }),
        };

        *phase = CyclePhase::RotationEvaluating;
        let baseline = self.detectors.get(&role).cloned();
        let verdict = self
            .detectors
            .entry(role)
            .or_insert_with(|| RotationDetector::seeded(&cursor))
            .observe(observation);
        cursor.last_known_size = observation.size;
        cursor.last_modified = Some(observation.modified);
        if let RotationVerdict::Rotated(reason) = verdict {
            if let Err(err) = self.rotate(&mut cursor, role, reason.clone(), now).await {
                // The stored cursor still points into the old epoch; the next
                // cycle has to see the same rotation again.
                self.restore_detector(role, baseline);
                return Err(err);
            }
            report.rotation = Some(reason);
        }

        *phase = CyclePhase::Reading;
        let read_from = cursor.line_offset;
        let mut lines = self.read(role, path, read_from).await?;
        let marker = self
            .detectors
            .get(&role)
            .and_then(|detector| detector.scan_markers(&lines, read_from));
        if let Some(reason) = marker {
            self.rotate(&mut cursor, role, reason.clone(), now).await?;
            report.rotation = Some(reason);
            lines = self.read(role, path, 0).await?;
        }
        report.lines_read = lines.len();
        self.deps.metrics.record_lines(lines.len());

        *phase = CyclePhase::Extracting;
        let extraction = match self.extractors.get(&role) {
            Some(extractor) => extractor.extract(&self.server.tenant, &lines),
            None => extractor_for(role).extract(&self.server.tenant, &lines),
        };
        report.malformed = extraction.malformed;
        report.unmatched = extraction.unmatched;
        if extraction.malformed > 0 || extraction.unmatched > 0 {
            debug!(
                role = %role,
                malformed = extraction.malformed,
                unmatched = extraction.unmatched,
                discarded = extraction.discarded,
                "lines skipped during extraction"
            );
        }

        *phase = CyclePhase::Deduplicating;
        let now_ms = self.deps.clock.now_millis();
        let outcome = self.run_batch(extraction.events, now_ms, phase).await?;
        report.events_emitted = outcome.emitted.len();
        report.events_suppressed = outcome.suppressed;
        self.deps.metrics.record_extraction(
            outcome.emitted.len(),
            extraction.malformed,
            extraction.unmatched,
        );

        *phase = CyclePhase::Committing;
        cursor.advance(lines.len() as u64);
        if let Err(err) = self.context.commit_cycle(&outcome.stats, &cursor).await {
            self.dedup.forget(&outcome.emitted, now_ms);
            return Err(err);
        }
        if let Some(detector) = self.detectors.get_mut(&role) {
            detector.record_offset(cursor.line_offset);
        }
        report.offset = cursor.line_offset;

        *phase = CyclePhase::Idle;
        Ok(report)
    }

    /// Dedups, aggregates and notifies one extracted batch. Nothing is
    /// persisted here; the caller commits `stats` together with the cursor.
    pub async fn process_batch(
        &mut self,
        events: Vec<GameEvent>,
        now_ms: i64,
    ) -> Result<BatchOutcome, IngestError> {
        let mut phase = CyclePhase::Deduplicating;
        self.run_batch(events, now_ms, &mut phase).await
    }

    async fn run_batch(
        &mut self,
        events: Vec<GameEvent>,
        now_ms: i64,
        phase: &mut CyclePhase,
    ) -> Result<BatchOutcome, IngestError> {
        let mut outcome = BatchOutcome::default();

        *phase = CyclePhase::Deduplicating;
        for event in events {
            if self.dedup.should_suppress(&event, now_ms) {
                self.deps.metrics.record_suppressed();
                outcome.suppressed += 1;
                debug!(event = %event.kind.discriminator(), "duplicate event suppressed");
            } else {
                outcome.emitted.push(event);
            }
        }

        *phase = CyclePhase::Aggregating;
        outcome.stats = match self.aggregate(&outcome.emitted).await {
            Ok(stats) => stats,
            Err(err) => {
                self.dedup.forget(&outcome.emitted, now_ms);
                return Err(err);
            }
        };

        *phase = CyclePhase::Notifying;
        for event in &outcome.emitted {
            self.notify(event);
        }
        Ok(outcome)
    }

    /// Applies events in order; each player is loaded once per batch.
    async fn aggregate(&self, events: &[GameEvent]) -> Result<Vec<PlayerStat>, IngestError> {
        let mut stats: Vec<PlayerStat> = Vec::new();
        let mut index: HashMap<PlayerId, usize> = HashMap::new();

        for event in events {
            if !StatAggregator::mutates_stats(&event.kind) {
                continue;
            }
            for player in event.kind.affected_players() {
                let slot = match index.get(player) {
                    Some(slot) => *slot,
                    None => {
                        let stat = self.context.load_player_stat(player).await?;
                        stats.push(stat);
                        index.insert(player.clone(), stats.len() - 1);
                        stats.len() - 1
                    }
                };
                stats[slot] = StatAggregator::apply(&stats[slot], &event.kind);
            }
        }
        Ok(stats)
    }

    fn notify(&self, event: &GameEvent) {
        match self.server.channels.destination(event.kind.class()) {
            Some(destination) => {
                self.deps.notifier.dispatch(event.clone(), destination);
                self.deps.metrics.record_notification();
            }
            None => debug!(event = event.kind.name(), "no channel configured for event class"),
        }
    }

    async fn rotate(
        &mut self,
        cursor: &mut ServerCursor,
        role: FileRole,
        reason: RotationReason,
        now: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        warn!(
            role = %role,
            previous_offset = cursor.line_offset,
            reason = %reason,
            "file rotation detected; resetting cursor"
        );
        cursor.reset(now);
        self.context.save_cursor(cursor).await?;
        if let Some(detector) = self.detectors.get_mut(&role) {
            detector.record_offset(0);
        }
        self.deps.metrics.record_rotation();
        Ok(())
    }

    async fn handle_missing(
        &mut self,
        role: FileRole,
        path: &str,
        cursor: &mut ServerCursor,
        now: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        if cursor.line_offset != 0 || cursor.last_known_size != 0 {
            warn!(
                role = %role,
                path,
                previous_offset = cursor.line_offset,
                "tracked file missing; assuming rotation in progress"
            );
            cursor.reset(now);
            cursor.last_known_size = 0;
            cursor.last_modified = None;
            self.context.save_cursor(cursor).await?;
            self.deps.metrics.record_rotation();
        } else {
            debug!(role = %role, path, "tracked file still missing");
        }
        if let Some(detector) = self.detectors.get_mut(&role) {
            detector.forget();
        }

        self.probe_directory(path).await;
        Ok(())
    }

    fn restore_detector(&mut self, role: FileRole, baseline: Option<RotationDetector>) {
        match baseline {
            Some(detector) => {
                self.detectors.insert(role, detector);
            }
            None => {
                self.detectors.remove(&role);
            }
        }
    }

    /// Writes a marker next to the tracked file to tell a vanished file
    /// apart from an unreachable directory. Only logs.
    async fn probe_directory(&self, path: &str) {
        let probe = match Path::new(path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(PROBE_FILE_NAME),
            _ => Path::new(PROBE_FILE_NAME).to_path_buf(),
        };
        let probe = probe.to_string_lossy().to_string();
        let content = self.deps.clock.now_utc().to_rfc3339();

        let written = with_timeout(
            self.deps.io_timeout,
            &probe,
            self.deps.files.write(&probe, content.as_bytes()),
        )
        .await;
        let result = match written {
            Ok(()) => {
                with_timeout(self.deps.io_timeout, &probe, self.deps.files.exists(&probe)).await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(true) => debug!(probe = %probe, "directory reachable"),
            Ok(false) => warn!(probe = %probe, "probe file written but not visible"),
            Err(err) => warn!(probe = %probe, error = %err, "directory probe failed"),
        }
    }

    async fn stat(&self, path: &str) -> Result<FileObservation, RemoteFileError> {
        let size = with_timeout(self.deps.io_timeout, path, self.deps.files.size(path)).await?;
        let modified = with_timeout(
            self.deps.io_timeout,
            path,
            self.deps.files.last_modified(path),
        )
        .await?;
        Ok(FileObservation { size, modified })
    }

    async fn read(
        &self,
        role: FileRole,
        path: &str,
        from_line: u64,
    ) -> Result<Vec<String>, IngestError> {
        with_timeout(
            self.deps.io_timeout,
            path,
            self.deps.files.read_lines_after(path, from_line),
        )
        .await
        .map_err(|source| IngestError::Transient { role, source })
    }

    fn record_failure(&self, role: FileRole, phase: CyclePhase, error: &IngestError) {
        match error {
            IngestError::Transient { .. } => {
                warn!(role = %role, phase = %phase, error = %error, "transient failure; retrying next cycle")
            }
            IngestError::Tenant(_) => {
                if error.is_boundary_violation() {
                    self.deps.metrics.record_boundary_violation();
                }
                error!(role = %role, phase = %phase, error = %error, "tenant check failed; role aborted")
            }
            IngestError::Persistence { .. } => {
                self.deps.metrics.record_persistence_error();
                error!(role = %role, phase = %phase, error = %error, "persistence failed; range will be re-read")
            }
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    path: &str,
    operation: impl Future<Output = Result<T, RemoteFileError>>,
) -> Result<T, RemoteFileError> {
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(RemoteFileError::transient(
            path,
            format!("timed out after {}ms", limit.as_millis()),
        )),
    }
}
