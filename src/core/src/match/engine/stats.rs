use serde::{Deserialize, Serialize};

/// Per-player accumulating statistics for one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMatchStats {
    pub passing_attempts: u16,
    pub passing_completions: u16,
    pub passing_yards: i16,
    pub carries: u16,
    pub rushing_yards: i16,
    pub catches: u16,
    pub drops: u16,
    pub tackles: u16,
    pub knockdowns_inflicted: u16,
    pub fumbles: u16,
    pub scores: u16,
    pub seconds_played: u32,
}

/// Per-team accumulating statistics for one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMatchStats {
    pub total_yards: i32,
    pub turnovers: u16,
    pub possession_seconds: u32,
    pub knockdowns_inflicted: u16,
    pub score: u8,
}

/// Final output of one simulation: the full event stream plus persisted
/// aggregates. Player stats are ordered by player id so the result is
/// structurally deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub game_id: u32,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_score: u8,
    pub away_score: u8,
    pub went_to_overtime: bool,
    pub events: Vec<super::events::MatchEvent>,
    pub home_stats: TeamMatchStats,
    pub away_stats: TeamMatchStats,
    pub player_stats: Vec<(u32, PlayerMatchStats)>,
}

impl SimulationResult {
    pub fn stats_for(&self, player_id: u32) -> Option<&PlayerMatchStats> {
        self.player_stats
            .iter()
            .find(|(id, _)| *id == player_id)
            .map(|(_, stats)| stats)
    }
}
