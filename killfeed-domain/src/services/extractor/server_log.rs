//! Pattern matching over the line-oriented game server log.
//!
//! Lines look like `[2024.01.01-12.00.00:000][ 12]LogSFPS: ...`. The
//! timestamp/frame prefix is optional; matchers run against the remainder in
//! a fixed order and the first hit wins.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::entities::{EventKind, GameEvent, MissionStatus};
use crate::services::extractor::{Extraction, LineExtractor};
use crate::value_objects::{PlayerId, TenantKey};

static TIMESTAMP_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d{4}\.\d{2}\.\d{2}-\d{2}[.:]\d{2}[.:]\d{2})(?:[:.]\d{1,3})?\](?:\[\s*\d+\])?\s*")
        .expect("timestamp prefix regex")
});

enum MatchOutcome {
    Emit(EventKind),
    Discard,
}

struct LineMatcher {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures) -> MatchOutcome,
}

impl LineMatcher {
    fn new(name: &'static str, pattern: &str, build: fn(&Captures) -> MatchOutcome) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap_or_else(|err| panic!("{} matcher: {}", name, err)),
            build,
        }
    }
}

static MATCHERS: Lazy<Vec<LineMatcher>> = Lazy::new(|| {
    vec![
        LineMatcher::new(
            "restart",
            r"(?i)(?:log file open|server (?:is )?restarting)",
            |_| MatchOutcome::Emit(EventKind::ServerRestart),
        ),
        LineMatcher::new("join", r"^LogNet: Join succeeded: (?P<player>.+?)\s*$", |caps| {
            MatchOutcome::Emit(EventKind::Join {
                player: PlayerId::new(&caps["player"]),
            })
        }),
        LineMatcher::new(
            "leave",
            r"^LogNet: Player disconnected: (?P<player>.+?)\s*$",
            |caps| {
                MatchOutcome::Emit(EventKind::Leave {
                    player: PlayerId::new(&caps["player"]),
                })
            },
        ),
        LineMatcher::new(
            "kill",
            r"^LogSFPS: (?P<killer>.+?) killed (?P<victim>.+?) with (?P<weapon>.+?)(?: from (?P<distance>\d+(?:\.\d+)?)\s*m)?\s*$",
            build_kill,
        ),
        LineMatcher::new(
            "death",
            r"^LogSFPS: (?P<player>.+?) died(?: from (?P<cause>.+?))?\s*$",
            |caps| {
                MatchOutcome::Emit(EventKind::Death {
                    player: PlayerId::new(&caps["player"]),
                    cause: caps
                        .name("cause")
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                })
            },
        ),
        LineMatcher::new(
            "airdrop",
            r"^LogSFPS: AirDrop switched to (?P<status>\w+)",
            |caps| {
                MatchOutcome::Emit(EventKind::Airdrop {
                    status: caps["status"].to_string(),
                })
            },
        ),
        LineMatcher::new(
            "heli_crash",
            r"(?i)^LogSFPS: heli ?crash (?:spawned |event )?at (?P<position>.+?)\s*$",
            |caps| {
                MatchOutcome::Emit(EventKind::HeliCrash {
                    position: caps["position"].to_string(),
                })
            },
        ),
        LineMatcher::new(
            "trader",
            r"(?i)^LogSFPS: trader event (?:started |spawned )?at (?P<position>.+?)\s*$",
            |caps| {
                MatchOutcome::Emit(EventKind::TraderEvent {
                    position: caps["position"].to_string(),
                })
            },
        ),
        LineMatcher::new(
            "mission",
            r"^LogSFPS: Mission (?P<name>\S+) switched to (?P<status>\w+)",
            |caps| match MissionStatus::parse(&caps["status"]) {
                Some(status) => MatchOutcome::Emit(EventKind::Mission {
                    name: caps["name"].to_string(),
                    status,
                }),
                None => MatchOutcome::Discard,
            },
        ),
    ]
});

fn build_kill(caps: &Captures) -> MatchOutcome {
    let killer = PlayerId::new(&caps["killer"]);
    let victim = PlayerId::new(&caps["victim"]);
    let weapon = caps["weapon"].trim().to_string();
    if killer == victim {
        return MatchOutcome::Emit(EventKind::Suicide {
            player: victim,
            cause: weapon,
        });
    }
    let distance_meters = caps
        .name("distance")
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or_default();
    MatchOutcome::Emit(EventKind::Kill {
        killer,
        victim,
        weapon,
        distance_meters,
    })
}

/// Splits off the leading timestamp token, if any.
pub fn split_timestamp(line: &str) -> (Option<NaiveDateTime>, &str) {
    let Some(caps) = TIMESTAMP_PREFIX.captures(line) else {
        return (None, line);
    };
    let Some(whole) = caps.get(0) else {
        return (None, line);
    };
    let timestamp = parse_log_timestamp(&caps[1]);
    (timestamp, &line[whole.end()..])
}

fn parse_log_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.replace(':', ".");
    NaiveDateTime::parse_from_str(&normalized, "%Y.%m.%d-%H.%M.%S").ok()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServerLogExtractor;

impl ServerLogExtractor {
    pub fn new() -> Self {
        Self
    }

    #[cfg(test)]
    fn matcher_name(&self, line: &str) -> Option<&'static str> {
        let (_, body) = split_timestamp(line.trim_end());
        MATCHERS
            .iter()
            .find(|matcher| matcher.pattern.is_match(body))
            .map(|matcher| matcher.name)
    }
}

impl LineExtractor for ServerLogExtractor {
    fn extract(&self, tenant: &TenantKey, lines: &[String]) -> Extraction {
        let mut extraction = Extraction::default();
        for line in lines {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            let (timestamp, body) = split_timestamp(line);
            let outcome = MATCHERS
                .iter()
                .find_map(|matcher| matcher.pattern.captures(body).map(|caps| (matcher.build)(&caps)));
            match outcome {
                Some(MatchOutcome::Emit(kind)) => extraction
                    .events
                    .push(GameEvent::new(tenant.clone(), timestamp, kind)),
                Some(MatchOutcome::Discard) => extraction.discarded += 1,
                None => extraction.unmatched += 1,
            }
        }
        extraction
    }
}
