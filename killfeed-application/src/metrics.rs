use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    cycles: AtomicU64,
    cycle_failures: AtomicU64,
    lines_read: AtomicU64,
    events_emitted: AtomicU64,
    events_suppressed: AtomicU64,
    malformed_lines: AtomicU64,
    unmatched_lines: AtomicU64,
    rotations: AtomicU64,
    boundary_violations: AtomicU64,
    persistence_errors: AtomicU64,
    notifications: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub cycle_failures: u64,
    pub lines_read: u64,
    pub events_emitted: u64,
    pub events_suppressed: u64,
    pub malformed_lines: u64,
    pub unmatched_lines: u64,
    pub rotations: u64,
    pub boundary_violations: u64,
    pub persistence_errors: u64,
    pub notifications: u64,
}

impl Metrics {
    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_failure(&self) {
        self.cycle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lines(&self, count: usize) {
        self.lines_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_extraction(&self, emitted: usize, malformed: usize, unmatched: usize) {
        self.events_emitted
            .fetch_add(emitted as u64, Ordering::Relaxed);
        self.malformed_lines
            .fetch_add(malformed as u64, Ordering::Relaxed);
        self.unmatched_lines
            .fetch_add(unmatched as u64, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.events_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_boundary_violation(&self) {
        self.boundary_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_error(&self) {
        self.persistence_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            cycle_failures: self.cycle_failures.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            events_suppressed: self.events_suppressed.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
            unmatched_lines: self.unmatched_lines.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            boundary_violations: self.boundary_violations.load(Ordering::Relaxed),
            persistence_errors: self.persistence_errors.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }

    pub fn render_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let counters = [
            ("killfeed_poll_cycles_total", snapshot.cycles),
            ("killfeed_poll_cycle_failures_total", snapshot.cycle_failures),
            ("killfeed_lines_read_total", snapshot.lines_read),
            ("killfeed_events_emitted_total", snapshot.events_emitted),
            ("killfeed_events_suppressed_total", snapshot.events_suppressed),
            ("killfeed_malformed_lines_total", snapshot.malformed_lines),
            ("killfeed_unmatched_lines_total", snapshot.unmatched_lines),
            ("killfeed_rotations_total", snapshot.rotations),
            (
                "killfeed_tenant_boundary_violations_total",
                snapshot.boundary_violations,
            ),
            ("killfeed_persistence_errors_total", snapshot.persistence_errors),
            ("killfeed_notifications_total", snapshot.notifications),
        ];

        let mut out = String::new();
        for (name, value) in counters {
            out.push_str(&format!("# TYPE {} counter\n{} {}\n", name, name, value));
        }
        out
    }
}
