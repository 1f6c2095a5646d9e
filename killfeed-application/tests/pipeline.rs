mod support;

use killfeed_application::ServerPoller;
use killfeed_domain::{ChannelId, EventKind, FileRole, PlayerId, RotationReason, ServerCursor};

use support::{tenant, tracked, Harness, DEATH_LOG, SERVER_LOG};

const JOIN_X: &str = "[2024.01.01-12.00.00:000][  1]LogNet: Join succeeded: X";
const Y_KILLS_X: &str = "[2024.01.01-12.00.05:000][  2]LogSFPS: Y killed X with AK47 from 50m";
const LEAVE_Y: &str = "[2024.01.01-12.00.09:000][  3]LogNet: Player disconnected: Y";
const CSV_KILL: &str = "2024.01.01-00.00.00;Alice;Bob;AK47;50;headshot";

#[tokio::test]
async fn offset_follows_cumulative_line_count() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &["noise one", "noise two", JOIN_X]);
    let report = poller.run_cycle().await;
    assert!(report.is_success());
    assert_eq!(report.role(FileRole::ServerLog).unwrap().offset, 3);

    harness.files.append(SERVER_LOG, &["noise three", LEAVE_Y]);
    poller.run_cycle().await;
    let cursor = harness.store.cursor(&key, FileRole::ServerLog).unwrap();
    assert_eq!(cursor.line_offset, 5);

    let report = poller.run_cycle().await;
    assert_eq!(report.role(FileRole::ServerLog).unwrap().lines_read, 0);
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        5
    );
}

#[tokio::test]
async fn size_drop_resets_cursor_once() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    let old_lines: Vec<String> = (0..10).map(|i| format!("old line {}", i)).collect();
    let old_refs: Vec<&str> = old_lines.iter().map(String::as_str).collect();
    harness.files.replace(SERVER_LOG, &old_refs, 500_000);
    poller.run_cycle().await;
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        10
    );

    harness.files.replace(SERVER_LOG, &["fresh one", JOIN_X], 120);
    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert_eq!(
        role.rotation,
        Some(RotationReason::SizeDecreased {
            previous: 500_000,
            current: 120
        })
    );
    assert_eq!(role.lines_read, 2);

    let zero_writes = harness
        .store
        .cursor_writes()
        .into_iter()
        .filter(|cursor| cursor.role == FileRole::ServerLog && cursor.line_offset == 0)
        .count();
    assert_eq!(zero_writes, 1);

    let cursor = harness.store.cursor(&key, FileRole::ServerLog).unwrap();
    assert_eq!(cursor.line_offset, 2);
    assert_eq!(cursor.last_known_size, 120);
    assert!(cursor.last_rotation.is_some());
    assert_eq!(harness.metrics.snapshot().rotations, 1);

    poller.run_cycle().await;
    assert_eq!(harness.metrics.snapshot().rotations, 1);
}

#[tokio::test]
async fn identical_kills_inside_window_are_suppressed() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());
    let start = 1_704_110_400_000;

    harness.clock.set(start);
    harness.files.append(DEATH_LOG, &[CSV_KILL]);
    poller.run_cycle().await;

    harness.clock.set(start + 2_000);
    harness.files.append(DEATH_LOG, &[CSV_KILL]);
    let report = poller.run_cycle().await;
    assert_eq!(report.role(FileRole::DeathLog).unwrap().events_suppressed, 1);
    assert_eq!(harness.store.stat(&key, "Alice").unwrap().kills, 1);

    harness.clock.set(start + 4_000);
    harness.files.append(DEATH_LOG, &[CSV_KILL]);
    poller.run_cycle().await;

    let alice = harness.store.stat(&key, "Alice").unwrap();
    assert_eq!(alice.kills, 2);
    assert_eq!(alice.longest_kill_distance, 50.0);
    assert_eq!(harness.store.stat(&key, "Bob").unwrap().deaths, 2);

    let kill_notifications = harness
        .notifier
        .sent()
        .into_iter()
        .filter(|(event, _)| matches!(event.kind, EventKind::Kill { .. }))
        .count();
    assert_eq!(kill_notifications, 2);
    assert_eq!(harness.metrics.snapshot().events_suppressed, 1);
}

#[tokio::test]
async fn join_kill_leave_flow_end_to_end() {
    let harness = Harness::new();
    let key = tenant(42, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &[JOIN_X, Y_KILLS_X, LEAVE_Y]);
    let report = poller.run_cycle().await;
    assert!(report.is_success());

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(event, _)| event.tenant == key));
    assert_eq!(
        sent[0].0.kind,
        EventKind::Join {
            player: PlayerId::new("X")
        }
    );
    assert_eq!(sent[0].1, ChannelId(200));
    assert_eq!(
        sent[1].0.kind,
        EventKind::Kill {
            killer: PlayerId::new("Y"),
            victim: PlayerId::new("X"),
            weapon: "AK47".to_string(),
            distance_meters: 50.0,
        }
    );
    assert_eq!(sent[1].1, ChannelId(100));
    assert_eq!(
        sent[2].0.kind,
        EventKind::Leave {
            player: PlayerId::new("Y")
        }
    );

    assert_eq!(harness.store.stat(&key, "X").unwrap().deaths, 1);
    let y = harness.store.stat(&key, "Y").unwrap();
    assert_eq!(y.kills, 1);
    assert_eq!(y.current_kill_streak, 1);
}

#[tokio::test]
async fn transient_failure_leaves_cursor_untouched() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &[JOIN_X, LEAVE_Y]);
    poller.run_cycle().await;
    let writes_before = harness.store.cursor_writes().len();

    harness.files.append(SERVER_LOG, &[Y_KILLS_X]);
    harness.files.set_failing(true);
    let report = poller.run_cycle().await;
    assert!(!report.is_success());
    let failure = report.failure(FileRole::ServerLog).unwrap();
    assert!(failure.error.is_transient());
    assert_eq!(harness.store.cursor_writes().len(), writes_before);
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        2
    );
    assert!(harness.store.stat(&key, "Y").is_none());

    harness.files.set_failing(false);
    poller.run_cycle().await;
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        3
    );
    assert_eq!(harness.store.stat(&key, "Y").unwrap().kills, 1);
    assert_eq!(harness.metrics.snapshot().cycle_failures, 1);
}

#[tokio::test]
async fn failed_commit_rereads_the_same_range() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &[Y_KILLS_X]);
    harness.store.fail_commits(true);
    let report = poller.run_cycle().await;
    let failure = report.failure(FileRole::ServerLog).unwrap();
    assert_eq!(failure.phase, killfeed_application::ingest::CyclePhase::Committing);
    assert!(harness.store.cursor(&key, FileRole::ServerLog).is_none());
    assert!(harness.store.stat(&key, "Y").is_none());
    assert_eq!(harness.metrics.snapshot().persistence_errors, 1);

    // retried well inside the dedup window
    harness.store.fail_commits(false);
    harness.clock.set(harness_now(&harness) + 1_000);
    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert_eq!(role.lines_read, 1);
    assert_eq!(role.events_emitted, 1);
    assert_eq!(role.events_suppressed, 0);
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        1
    );
    assert_eq!(harness.store.stat(&key, "Y").unwrap().kills, 1);
    assert_eq!(harness.store.stat(&key, "X").unwrap().deaths, 1);

    // delivered once per attempt
    let kills_sent = harness
        .notifier
        .sent()
        .into_iter()
        .filter(|(event, _)| matches!(event.kind, EventKind::Kill { .. }))
        .count();
    assert_eq!(kills_sent, 2);
}

#[tokio::test]
async fn failed_stat_load_is_retried_inside_dedup_window() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(DEATH_LOG, &[CSV_KILL]);
    harness.store.fail_stat_reads(true);
    let report = poller.run_cycle().await;
    let failure = report.failure(FileRole::DeathLog).unwrap();
    assert_eq!(failure.phase, killfeed_application::ingest::CyclePhase::Aggregating);
    assert!(harness.notifier.sent().is_empty());

    harness.store.fail_stat_reads(false);
    harness.clock.set(harness_now(&harness) + 500);
    let report = poller.run_cycle().await;
    assert_eq!(report.role(FileRole::DeathLog).unwrap().events_emitted, 1);
    assert_eq!(harness.store.stat(&key, "Alice").unwrap().kills, 1);
    assert_eq!(harness.store.stat(&key, "Bob").unwrap().deaths, 1);
    assert_eq!(
        harness.store.cursor(&key, FileRole::DeathLog).unwrap().line_offset,
        1
    );
}

#[tokio::test]
async fn rotation_is_seen_again_after_failed_reset() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    let old_lines: Vec<String> = (0..10).map(|i| format!("old line {}", i)).collect();
    let old_refs: Vec<&str> = old_lines.iter().map(String::as_str).collect();
    harness.files.replace(SERVER_LOG, &old_refs, 500_000);
    poller.run_cycle().await;

    let mut new_lines: Vec<&str> = vec![Y_KILLS_X];
    new_lines.extend(std::iter::repeat("fresh").take(11));
    harness.files.replace(SERVER_LOG, &new_lines, 1_200);
    harness.store.fail_next_cursor_writes(1);
    let report = poller.run_cycle().await;
    let failure = report.failure(FileRole::ServerLog).unwrap();
    assert_eq!(
        failure.phase,
        killfeed_application::ingest::CyclePhase::RotationEvaluating
    );
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        10
    );

    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert_eq!(
        role.rotation,
        Some(RotationReason::SizeDecreased {
            previous: 500_000,
            current: 1_200
        })
    );
    assert_eq!(role.lines_read, 12);
    assert_eq!(role.offset, 12);
    assert_eq!(harness.store.stat(&key, "Y").unwrap().kills, 1);
}

#[tokio::test]
async fn missing_file_reset_survives_failed_write() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &["a", "b", "c"]);
    poller.run_cycle().await;

    harness.files.remove(SERVER_LOG);
    harness.store.fail_next_cursor_writes(1);
    let report = poller.run_cycle().await;
    assert!(report.failure(FileRole::ServerLog).is_some());
    assert_eq!(harness.metrics.snapshot().persistence_errors, 1);
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        3
    );

    let report = poller.run_cycle().await;
    assert!(report.role(FileRole::ServerLog).unwrap().file_missing);
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        0
    );

    harness.files.append(SERVER_LOG, &[Y_KILLS_X]);
    poller.run_cycle().await;
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        1
    );
    assert_eq!(harness.store.stat(&key, "Y").unwrap().kills, 1);
}

#[tokio::test]
async fn mtime_jump_without_growth_rereads_file() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.replace(SERVER_LOG, &["a", "b", "c"], 900);
    poller.run_cycle().await;

    // grew after a long silence: same epoch
    harness.files.append(SERVER_LOG, &["d"]);
    harness.files.touch(SERVER_LOG, 3 * 3_600);
    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert!(role.rotation.is_none());
    assert_eq!(role.offset, 4);

    // rewritten in place at the same size
    harness.files.replace(SERVER_LOG, &[JOIN_X, "x", "y", "z"], 902);
    harness.files.touch(SERVER_LOG, 2 * 3_600);
    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert!(matches!(role.rotation, Some(RotationReason::ModifiedJump { .. })));
    assert_eq!(role.lines_read, 4);
    assert_eq!(role.offset, 4);
    assert!(harness
        .notifier
        .sent()
        .iter()
        .any(|(event, _)| event.kind == EventKind::Join { player: PlayerId::new("X") }));
}

#[tokio::test]
async fn missing_file_resets_once_and_probes_directory() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &[JOIN_X, LEAVE_Y, "noise"]);
    poller.run_cycle().await;

    harness.files.remove(SERVER_LOG);
    let report = poller.run_cycle().await;
    assert!(report.is_success());
    assert!(report.role(FileRole::ServerLog).unwrap().file_missing);
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        0
    );
    let writes_after_reset = harness.store.cursor_writes().len();

    poller.run_cycle().await;
    assert_eq!(harness.store.cursor_writes().len(), writes_after_reset);
    assert!(harness
        .files
        .probes_written()
        .iter()
        .any(|probe| probe == "/srv/game/Logs/.killfeed_probe"));

    harness.files.append(SERVER_LOG, &[JOIN_X]);
    poller.run_cycle().await;
    assert_eq!(
        harness.store.cursor(&key, FileRole::ServerLog).unwrap().line_offset,
        1
    );
}

#[tokio::test]
async fn in_band_marker_rereads_from_start() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &["a", "b", "c"]);
    poller.run_cycle().await;

    harness.files.replace(
        SERVER_LOG,
        &[
            "Log file open, 01/02/24 09:00:00",
            "x",
            "y",
            "LogInit: Server restarting",
            JOIN_X,
        ],
        4_096,
    );
    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert_eq!(role.rotation, Some(RotationReason::InBandMarker { line_index: 0 }));
    assert_eq!(role.lines_read, 5);
    assert_eq!(role.offset, 5);
}

#[tokio::test]
async fn marker_at_file_start_is_not_a_rotation() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness
        .files
        .append(SERVER_LOG, &["Log file open, 01/02/24 09:00:00", JOIN_X]);
    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert!(role.rotation.is_none());
    assert_eq!(role.offset, 2);
}

#[tokio::test]
async fn changed_path_starts_new_epoch() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut stale = ServerCursor::new(key.clone(), FileRole::ServerLog, "/old/server.log");
    stale.line_offset = 900;
    use killfeed_domain::ports::TenantStore;
    harness
        .store
        .upsert_cursor(&key, FileRole::ServerLog, &stale)
        .await
        .unwrap();

    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());
    harness.files.append(SERVER_LOG, &[JOIN_X]);
    let report = poller.run_cycle().await;
    let role = report.role(FileRole::ServerLog).unwrap();
    assert_eq!(role.rotation, Some(RotationReason::PathChanged));

    let cursor = harness.store.cursor(&key, FileRole::ServerLog).unwrap();
    assert_eq!(cursor.tracked_file_name, SERVER_LOG);
    assert_eq!(cursor.line_offset, 1);
}

#[tokio::test]
async fn malformed_csv_lines_are_counted_and_skipped() {
    let harness = Harness::new();
    let key = tenant(1, "alpha");
    let mut poller = ServerPoller::new(tracked(key.clone()), harness.deps());

    harness.files.append(SERVER_LOG, &[JOIN_X]);
    harness
        .files
        .append(DEATH_LOG, &["2024.01.01-00.00.00;Alice;Bob;AK47;far;headshot", CSV_KILL]);
    let report = poller.run_cycle().await;
    assert!(report.is_success());
    let death = report.role(FileRole::DeathLog).unwrap();
    assert_eq!(death.malformed, 1);
    assert_eq!(death.events_emitted, 1);
    assert_eq!(harness.metrics.snapshot().malformed_lines, 1);
}

fn harness_now(harness: &Harness) -> i64 {
    use killfeed_domain::ports::Clock;
    harness.clock.now_millis()
}
