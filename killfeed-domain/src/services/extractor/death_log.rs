//! Fixed-field parser for the CSV death log.
//!
//! Record layout: `timestamp;killer;victim;weapon;distance;cause`. Every
//! non-blank line becomes exactly one Kill, Suicide or Death, or is counted
//! as malformed and skipped.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::entities::{EventKind, GameEvent};
use crate::services::extractor::{Extraction, LineExtractor};
use crate::value_objects::{PlayerId, TenantKey};

const FIELD_COUNT: usize = 6;
const SUICIDE_TAGS: [&str; 3] = ["suicide", "suicide_by_relocation", "relocation"];

#[derive(Debug, Clone, PartialEq)]
pub enum MalformedReason {
    FieldCount(usize),
    EmptyVictim,
    Distance(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeathRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub killer: String,
    pub victim: String,
    pub weapon: String,
    pub distance_meters: f64,
    pub cause: String,
}

impl DeathRecord {
    pub fn parse(line: &str) -> Result<Self, MalformedReason> {
        let delimiter = line
            .find([';', ','])
            .and_then(|idx| line[idx..].chars().next())
            .unwrap_or(';');
        let mut fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        // tolerate a trailing delimiter
        if fields.len() == FIELD_COUNT + 1 && fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.len() != FIELD_COUNT {
            return Err(MalformedReason::FieldCount(fields.len()));
        }

        let victim = fields[2].to_string();
        if victim.is_empty() {
            return Err(MalformedReason::EmptyVictim);
        }
        let distance_meters = parse_distance(fields[4])?;

        Ok(Self {
            timestamp: parse_csv_timestamp(fields[0]),
            killer: fields[1].to_string(),
            victim,
            weapon: fields[3].to_string(),
            distance_meters,
            cause: fields[5].to_string(),
        })
    }

    pub fn classify(self) -> EventKind {
        let victim = PlayerId::new(self.victim);
        if !self.killer.is_empty() {
            let killer = PlayerId::new(self.killer);
            if killer != victim {
                return EventKind::Kill {
                    killer,
                    victim,
                    weapon: self.weapon,
                    distance_meters: self.distance_meters,
                };
            }
            return EventKind::Suicide {
                player: victim,
                cause: first_non_empty(&self.cause, &self.weapon),
            };
        }

        let cause = first_non_empty(&self.cause, &self.weapon);
        if is_suicide_tag(&self.cause) || is_suicide_tag(&self.weapon) {
            EventKind::Suicide {
                player: victim,
                cause,
            }
        } else {
            EventKind::Death {
                player: victim,
                cause,
            }
        }
    }
}

fn parse_distance(raw: &str) -> Result<f64, MalformedReason> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(MalformedReason::Distance(raw.to_string())),
    }
}

fn parse_csv_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y.%m.%d-%H.%M.%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y.%m.%d-%H:%M:%S"))
        .ok()
}

fn is_suicide_tag(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    SUICIDE_TAGS.contains(&lower.as_str())
}

fn first_non_empty(primary: &str, fallback: &str) -> String {
    if !primary.is_empty() {
        primary.to_string()
    } else if !fallback.is_empty() {
        fallback.to_string()
    } else {
        "unknown".to_string()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeathLogExtractor;

impl DeathLogExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LineExtractor for DeathLogExtractor {
    fn extract(&self, tenant: &TenantKey, lines: &[String]) -> Extraction {
        let mut extraction = Extraction::default();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match DeathRecord::parse(line) {
                Ok(record) => {
                    let timestamp = record.timestamp;
                    extraction
                        .events
                        .push(GameEvent::new(tenant.clone(), timestamp, record.classify()));
                }
                Err(reason) => {
                    debug!(tenant = %tenant, ?reason, line, "skipping malformed death log line");
                    extraction.malformed += 1;
                }
            }
        }
        extraction
    }
}
