// Event entity
// One typed occurrence extracted from a server log or death log line

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::value_objects::{PlayerId, TenantKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Ready,
    Active,
    Completed,
    Reward,
}

impl MissionStatus {
    /// Parses the statuses worth announcing; everything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "READY" => Some(MissionStatus::Ready),
            "ACTIVE" => Some(MissionStatus::Active),
            "COMPLETED" => Some(MissionStatus::Completed),
            "REWARD" => Some(MissionStatus::Reward),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Ready => "READY",
            MissionStatus::Active => "ACTIVE",
            MissionStatus::Completed => "COMPLETED",
            MissionStatus::Reward => "REWARD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Join {
        player: PlayerId,
    },
    Leave {
        player: PlayerId,
    },
    Kill {
        killer: PlayerId,
        victim: PlayerId,
        weapon: String,
        distance_meters: f64,
    },
    Death {
        player: PlayerId,
        cause: String,
    },
    Suicide {
        player: PlayerId,
        cause: String,
    },
    Airdrop {
        status: String,
    },
    HeliCrash {
        position: String,
    },
    TraderEvent {
        position: String,
    },
    Mission {
        name: String,
        status: MissionStatus,
    },
    ServerRestart,
}

/// Notification routing class for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Killfeed,
    Connection,
    World,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Join { .. } => "join",
            EventKind::Leave { .. } => "leave",
            EventKind::Kill { .. } => "kill",
            EventKind::Death { .. } => "death",
            EventKind::Suicide { .. } => "suicide",
            EventKind::Airdrop { .. } => "airdrop",
            EventKind::HeliCrash { .. } => "heli_crash",
            EventKind::TraderEvent { .. } => "trader_event",
            EventKind::Mission { .. } => "mission",
            EventKind::ServerRestart => "server_restart",
        }
    }

    pub fn class(&self) -> EventClass {
        match self {
            EventKind::Kill { .. } | EventKind::Death { .. } | EventKind::Suicide { .. } => {
                EventClass::Killfeed
            }
            EventKind::Join { .. } | EventKind::Leave { .. } => EventClass::Connection,
            _ => EventClass::World,
        }
    }

    /// Type plus primary actors; two events with equal discriminators are duplicates.
    pub fn discriminator(&self) -> String {
        match self {
            EventKind::Join { player } | EventKind::Leave { player } => {
                format!("{}|{}", self.name(), player)
            }
            EventKind::Kill { killer, victim, .. } => {
                format!("{}|{}|{}", self.name(), killer, victim)
            }
            EventKind::Death { player, cause } | EventKind::Suicide { player, cause } => {
                format!("{}|{}|{}", self.name(), player, cause)
            }
            EventKind::Airdrop { status } => format!("{}|{}", self.name(), status),
            EventKind::HeliCrash { position } | EventKind::TraderEvent { position } => {
                format!("{}|{}", self.name(), position)
            }
            EventKind::Mission { name, status } => {
                format!("{}|{}|{}", self.name(), name, status.as_str())
            }
            EventKind::ServerRestart => self.name().to_string(),
        }
    }

    /// Players whose stats this event touches, in application order.
    pub fn affected_players(&self) -> Vec<&PlayerId> {
        match self {
            EventKind::Kill { killer, victim, .. } if killer == victim => vec![killer],
            EventKind::Kill { killer, victim, .. } => vec![killer, victim],
            EventKind::Death { player, .. } | EventKind::Suicide { player, .. } => vec![player],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub tenant: TenantKey,
    pub timestamp: Option<NaiveDateTime>,
    pub kind: EventKind,
}

impl GameEvent {
    pub fn new(tenant: TenantKey, timestamp: Option<NaiveDateTime>, kind: EventKind) -> Self {
        Self {
            tenant,
            timestamp,
            kind,
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::Join { player } => write!(f, "{} joined", player),
            EventKind::Leave { player } => write!(f, "{} left", player),
            EventKind::Kill {
                killer,
                victim,
                weapon,
                distance_meters,
            } => write!(
                f,
                "{} killed {} with {} ({:.0}m)",
                killer, victim, weapon, distance_meters
            ),
            EventKind::Death { player, cause } => write!(f, "{} died ({})", player, cause),
            EventKind::Suicide { player, cause } => {
                write!(f, "{} committed suicide ({})", player, cause)
            }
            EventKind::Airdrop { status } => write!(f, "airdrop {}", status),
            EventKind::HeliCrash { position } => write!(f, "helicopter crash at {}", position),
            EventKind::TraderEvent { position } => write!(f, "trader event at {}", position),
            EventKind::Mission { name, status } => {
                write!(f, "mission {} {}", name, status.as_str())
            }
            EventKind::ServerRestart => f.write_str("server restart"),
        }
    }
}
