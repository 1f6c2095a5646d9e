//! Applies events to player statistics.
//!
//! Streaks make application order significant, so callers must feed events
//! in the order they were extracted.

use crate::entities::{EventKind, PlayerStat};

pub struct StatAggregator;

impl StatAggregator {
    /// Returns `stat` updated for `event`, depending on the role the stat's
    /// player plays in it. Events not involving the player leave it unchanged.
    pub fn apply(stat: &PlayerStat, event: &EventKind) -> PlayerStat {
        let mut next = stat.clone();
        let player = &stat.player_id;
        match event {
            EventKind::Kill { killer, victim, .. } if killer == victim && killer == player => {
                record_suicide(&mut next);
            }
            EventKind::Kill {
                killer,
                distance_meters,
                ..
            } if killer == player => {
                next.kills += 1;
                next.current_kill_streak += 1;
                if next.current_kill_streak > next.longest_kill_streak {
                    next.longest_kill_streak = next.current_kill_streak;
                }
                if *distance_meters > next.longest_kill_distance {
                    next.longest_kill_distance = *distance_meters;
                }
            }
            EventKind::Kill { victim, .. } if victim == player => {
                next.deaths += 1;
                next.current_kill_streak = 0;
            }
            EventKind::Suicide { player: subject, .. } if subject == player => {
                record_suicide(&mut next);
            }
            EventKind::Death { player: subject, .. } if subject == player => {
                next.deaths += 1;
                next.current_kill_streak = 0;
            }
            _ => {}
        }
        next
    }

    pub fn mutates_stats(event: &EventKind) -> bool {
        !event.affected_players().is_empty()
    }
}

fn record_suicide(stat: &mut PlayerStat) {
    stat.suicides += 1;
    stat.current_kill_streak = 0;
}
