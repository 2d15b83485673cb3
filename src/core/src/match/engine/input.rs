use crate::club::player::{InjuryStatus, Player, PlayerAttributes, PlayerRole, Race};
use crate::club::team::{FieldSize, TacticalFocus, Team};
use crate::r#match::game::MatchType;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of one player entering a match. Built from durable
/// state before kickoff; the engine never reads live entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimPlayer {
    pub id: u32,
    pub name: String,
    pub role: PlayerRole,
    pub race: Race,
    pub attributes: PlayerAttributes,
    /// Stamina the player brings into the match, [0, 100].
    pub starting_stamina: u8,
    pub injury: InjuryStatus,
}

impl SimPlayer {
    pub fn from_player(player: &Player) -> Self {
        SimPlayer {
            id: player.id,
            name: player.name.clone(),
            role: player.role,
            race: player.race,
            attributes: player.attributes,
            starting_stamina: player.daily_stamina,
            injury: player.injury,
        }
    }

    pub fn is_fieldable(&self) -> bool {
        self.injury != InjuryStatus::Severe
    }
}

/// Immutable snapshot of one side of a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSheet {
    pub team_id: u32,
    pub name: String,
    pub tactical_focus: TacticalFocus,
    pub camaraderie: u8,
    /// Crowd pressure this side's opponents play under, [0, 100]. Non-zero
    /// only for the home side's sheet.
    pub intimidation: u8,
    pub players: Vec<SimPlayer>,
    /// Average leadership of the squad's three best leaders; feeds the
    /// clutch modifier.
    pub leader_rating: u8,
}

impl TeamSheet {
    pub fn from_team(team: &Team, players: &[&Player]) -> Self {
        let mut leadership: Vec<u8> = players
            .iter()
            .map(|p| p.attributes.leadership)
            .collect();
        leadership.sort_unstable_by(|a, b| b.cmp(a));

        let leader_rating = if leadership.is_empty() {
            0
        } else {
            let top: u32 = leadership.iter().take(3).map(|v| *v as u32).sum();
            (top / leadership.len().min(3) as u32) as u8
        };

        TeamSheet {
            team_id: team.id,
            name: team.name.clone(),
            tactical_focus: team.tactical_focus,
            camaraderie: team.camaraderie,
            intimidation: team.intimidation(),
            players: players.iter().map(|p| SimPlayer::from_player(p)).collect(),
            leader_rating,
        }
    }

    pub fn fieldable_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_fieldable()).count()
    }
}

/// Complete input to one simulation. Identical inputs (seed included)
/// produce byte-identical event streams in both modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInput {
    pub game_id: u32,
    pub match_type: MatchType,
    pub home: TeamSheet,
    pub away: TeamSheet,
    /// Field the match is played on: the home team's.
    pub field_size: FieldSize,
    pub seed: u64,
}
