// Query DTOs for the read-only surfaces

use serde::{Deserialize, Serialize};

use crate::entities::PlayerStat;
use crate::value_objects::TenantKey;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub metric: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerStatView {
    pub guild_id: u64,
    pub server_id: String,
    pub player: String,
    pub kills: u64,
    pub deaths: u64,
    pub suicides: u64,
    pub current_kill_streak: u64,
    pub longest_kill_streak: u64,
    pub longest_kill_distance: f64,
    pub kd_ratio: f64,
}

impl From<&PlayerStat> for PlayerStatView {
    fn from(stat: &PlayerStat) -> Self {
        Self {
            guild_id: stat.tenant.guild_id().0,
            server_id: stat.tenant.server_id().0.clone(),
            player: stat.player_id.0.clone(),
            kills: stat.kills,
            deaths: stat.deaths,
            suicides: stat.suicides,
            current_kill_streak: stat.current_kill_streak,
            longest_kill_streak: stat.longest_kill_streak,
            longest_kill_distance: stat.longest_kill_distance,
            kd_ratio: stat.kd_ratio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantSummary {
    pub tenant: TenantKey,
    pub players: usize,
    pub kills: u64,
    pub deaths: u64,
    pub suicides: u64,
    pub server_log_offset: Option<u64>,
    pub death_log_offset: Option<u64>,
}
