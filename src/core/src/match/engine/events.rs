use crate::club::player::InjuryStatus;
use serde::{Deserialize, Serialize};

/// One typed record in a match's event stream. Events are totally ordered
/// by tick; ties within a tick follow emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub tick: u32,
    /// Acting team; None for neutral markers like half-time.
    pub team_id: Option<u32>,
    /// Flattened so wire records carry the `type` tag at the top level.
    #[serde(flatten)]
    pub kind: MatchEventKind,
    pub actors: Vec<u32>,
    /// Index into the commentary prompt database.
    pub commentary_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchEventKind {
    KickOff,
    Pass { complete: bool, yards: i16 },
    Run { yards: i16 },
    Kick { good: bool },
    Tackle { yards_lost: i16 },
    Knockdown { duration_s: u8 },
    LooseBall { turnover: bool },
    Score,
    Injury { severity: InjuryStatus },
    Substitution { player_out: u32, player_in: u32 },
    HalfTime,
    OvertimeStart,
    SuddenDeathStart,
    MatchComplete { home_score: u8, away_score: u8 },
}

impl MatchEventKind {
    pub fn is_score(&self) -> bool {
        matches!(self, MatchEventKind::Score)
    }
}
