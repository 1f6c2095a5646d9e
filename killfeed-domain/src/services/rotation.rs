//! Decides whether a tailed file was replaced or truncated between polls.
//!
//! Signals are checked strongest first: a shrinking size, then an mtime jump
//! that is only trusted when the file also stopped growing, then in-band
//! markers found in the freshly read lines.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::entities::ServerCursor;

const MODIFIED_JUMP_SECONDS: i64 = 60 * 60;

/// Lowercased substrings that only appear when the game server starts a new log.
pub const ROTATION_MARKERS: [&str; 3] = [
    "log file open",
    "server restarting",
    "server is restarting",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileObservation {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationReason {
    SizeDecreased { previous: u64, current: u64 },
    ModifiedJump { seconds: i64 },
    InBandMarker { line_index: usize },
    FileMissing,
    PathChanged,
}

impl fmt::Display for RotationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationReason::SizeDecreased { previous, current } => {
                write!(f, "size decreased {} -> {}", previous, current)
            }
            RotationReason::ModifiedJump { seconds } => {
                write!(f, "modification time jumped {}s", seconds)
            }
            RotationReason::InBandMarker { line_index } => {
                write!(f, "rotation marker at new line {}", line_index)
            }
            RotationReason::FileMissing => f.write_str("file missing"),
            RotationReason::PathChanged => f.write_str("tracked path changed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationVerdict {
    Baseline,
    Unchanged,
    Rotated(RotationReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RotationState {
    last_known_size: u64,
    last_modified: DateTime<Utc>,
    last_line_offset: u64,
}

#[derive(Debug, Default, Clone)]
pub struct RotationDetector {
    state: Option<RotationState>,
}

impl RotationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the baseline persisted with a cursor so a rotation that
    /// happened while the process was down is still noticed.
    pub fn seeded(cursor: &ServerCursor) -> Self {
        let state = cursor.last_modified.map(|last_modified| RotationState {
            last_known_size: cursor.last_known_size,
            last_modified,
            last_line_offset: cursor.line_offset,
        });
        Self { state }
    }

    #[cfg(test)]
    fn has_baseline(&self) -> bool {
        self.state.is_some()
    }

    #[cfg(test)]
    fn last_line_offset(&self) -> Option<u64> {
        self.state.map(|state| state.last_line_offset)
    }

    /// Evaluates a fresh stat. The baseline is updated whatever the verdict.
    pub fn observe(&mut self, observation: FileObservation) -> RotationVerdict {
        let verdict = match self.state {
            None => RotationVerdict::Baseline,
            Some(previous) => evaluate(previous, observation),
        };
        let last_line_offset = match (&verdict, self.state) {
            (RotationVerdict::Rotated(_), _) | (_, None) => 0,
            (_, Some(previous)) => previous.last_line_offset,
        };
        self.state = Some(RotationState {
            last_known_size: observation.size,
            last_modified: observation.modified,
            last_line_offset,
        });
        verdict
    }

    /// Looks for an in-band marker among lines read from `read_from`.
    /// Lines read from the start of the file are the current epoch already.
    pub fn scan_markers(&self, lines: &[String], read_from: u64) -> Option<RotationReason> {
        if read_from == 0 {
            return None;
        }
        lines
            .iter()
            .position(|line| is_rotation_marker(line))
            .map(|line_index| RotationReason::InBandMarker { line_index })
    }

    pub fn record_offset(&mut self, offset: u64) {
        if let Some(state) = self.state.as_mut() {
            state.last_line_offset = offset;
        }
    }

    /// Drops the baseline; the next observation is treated as the first.
    pub fn forget(&mut self) {
        self.state = None;
    }
}

fn evaluate(previous: RotationState, current: FileObservation) -> RotationVerdict {
    if current.size < previous.last_known_size {
        return RotationVerdict::Rotated(RotationReason::SizeDecreased {
            previous: previous.last_known_size,
            current: current.size,
        });
    }

    let jump = (current.modified - previous.last_modified).num_seconds().abs();
    // Only a file rewritten without growing counts as replaced.
    if jump > Duration::seconds(MODIFIED_JUMP_SECONDS).num_seconds()
        && current.size <= previous.last_known_size
    {
        return RotationVerdict::Rotated(RotationReason::ModifiedJump { seconds: jump });
    }

    RotationVerdict::Unchanged
}

pub fn is_rotation_marker(line: &str) -> bool {
    let lower = line.to_lowercase();
    ROTATION_MARKERS.iter().any(|marker| lower.contains(marker))
}
