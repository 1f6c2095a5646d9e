// Player statistics entity

use serde::{Deserialize, Serialize};

use crate::value_objects::{PlayerId, TenantKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStat {
    pub tenant: TenantKey,
    pub player_id: PlayerId,
    pub kills: u64,
    pub deaths: u64,
    pub suicides: u64,
    pub current_kill_streak: u64,
    pub longest_kill_streak: u64,
    pub longest_kill_distance: f64,
}

impl PlayerStat {
    pub fn new(tenant: TenantKey, player_id: PlayerId) -> Self {
        Self {
            tenant,
            player_id,
            kills: 0,
            deaths: 0,
            suicides: 0,
            current_kill_streak: 0,
            longest_kill_streak: 0,
            longest_kill_distance: 0.0,
        }
    }

    pub fn kd_ratio(&self) -> f64 {
        self.kills as f64 / self.deaths.max(1) as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardMetric {
    Kills,
    Deaths,
    Kd,
    Streak,
    Distance,
}

impl LeaderboardMetric {
    pub fn score(&self, stat: &PlayerStat) -> f64 {
        match self {
            LeaderboardMetric::Kills => stat.kills as f64,
            LeaderboardMetric::Deaths => stat.deaths as f64,
            LeaderboardMetric::Kd => stat.kd_ratio(),
            LeaderboardMetric::Streak => stat.longest_kill_streak as f64,
            LeaderboardMetric::Distance => stat.longest_kill_distance,
        }
    }
}

impl TryFrom<&str> for LeaderboardMetric {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "kills" => Ok(LeaderboardMetric::Kills),
            "deaths" => Ok(LeaderboardMetric::Deaths),
            "kd" | "kdr" => Ok(LeaderboardMetric::Kd),
            "streak" => Ok(LeaderboardMetric::Streak),
            "distance" => Ok(LeaderboardMetric::Distance),
            other => Err(format!(
                "unknown leaderboard metric '{}' (expected kills, deaths, kd, streak or distance)",
                other
            )),
        }
    }
}
