use crate::club::player::InjuryStatus;
use crate::r#match::engine::TeamSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Compact snapshot of one player inside a checkpoint. Observability data:
/// restore replays from the seed, it does not rehydrate from these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPlayer {
    pub id: u32,
    pub stamina: f32,
    pub on_field: bool,
    pub injury: InjuryStatus,
}

/// Persisted live-match checkpoint, written every 15 simulated seconds.
/// `(seed, tick)` is sufficient to reconstruct the exact engine state by
/// silent replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCheckpoint {
    pub game_id: u32,
    pub tick: u32,
    pub seed: u64,
    pub possession: TeamSide,
    pub home_score: u8,
    pub away_score: u8,
    pub players: Vec<CheckpointPlayer>,
    pub written_at: NaiveDateTime,
}
