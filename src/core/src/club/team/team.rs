use crate::club::player::Player;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

pub const ROSTER_MIN: usize = 12;
pub const ROSTER_MAX: usize = 15;
pub const TAXI_SQUAD_MAX: usize = 2;

/// Players a team must be able to field for a match to start.
pub const FIELD_PLAYERS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TacticalFocus {
    Balanced,
    AllOutAttack,
    DefensiveWall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSize {
    Standard,
    Large,
    Small,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub wins: u16,
    pub losses: u16,
    pub draws: u16,
    pub points: u16,
}

impl TeamRecord {
    pub fn record_win(&mut self) {
        self.wins += 1;
        self.points += 3;
    }

    pub fn record_loss(&mut self) {
        self.losses += 1;
    }

    pub fn record_draw(&mut self) {
        self.draws += 1;
        self.points += 1;
    }

    pub fn games_played(&self) -> u16 {
        self.wins + self.losses + self.draws
    }

    pub fn win_percentage(&self) -> f32 {
        let played = self.games_played();
        if played == 0 {
            return 0.0;
        }

        self.wins as f32 / played as f32
    }

    pub fn reset(&mut self) {
        *self = TeamRecord::default();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub owner_id: u32,
    pub name: String,
    pub division: u8,
    pub subdivision: String,
    pub tactical_focus: TacticalFocus,
    pub home_field_size: FieldSize,
    /// Team chemistry, [0, 100]. Feeds match modifiers and progression.
    pub camaraderie: u8,
    /// Fan loyalty, [0, 100]. Feeds stadium revenue and intimidation.
    pub fan_loyalty: u8,
    pub record: TeamRecord,
    pub ai_controlled: bool,
    /// Total credits invested into stadium facilities; basis for daily
    /// maintenance and home-match revenue.
    pub stadium_investment: i64,
}

impl Team {
    /// Home-crowd intimidation faced by visiting players, [0, 100].
    pub fn intimidation(&self) -> u8 {
        (self.fan_loyalty as u32 * (self.stadium_investment / 10_000).clamp(5, 10) as u32 / 10)
            .min(100) as u8
    }

    /// Roster invariant: size in [12, 15] with at most 2 taxi-squad members
    /// counted inside the cap.
    pub fn validate_roster(&self, roster: &[&Player]) -> CoreResult<()> {
        let active: Vec<&&Player> = roster.iter().filter(|p| !p.retired).collect();

        if active.len() < ROSTER_MIN || active.len() > ROSTER_MAX {
            return Err(CoreError::InvalidRoster(format!(
                "team {} roster size {} outside [{}, {}]",
                self.id,
                active.len(),
                ROSTER_MIN,
                ROSTER_MAX
            )));
        }

        let taxi = active.iter().filter(|p| p.on_taxi_squad).count();
        if taxi > TAXI_SQUAD_MAX {
            return Err(CoreError::InvalidRoster(format!(
                "team {} has {} taxi-squad players, cap is {}",
                self.id, taxi, TAXI_SQUAD_MAX
            )));
        }

        Ok(())
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::club::player::{InjuryStatus, PlayerAttributes, PlayerRole, Race, SeasonalMinutes};

    fn team() -> Team {
        Team {
            id: 1,
            owner_id: 100,
            name: String::from("Oakland Forge"),
            division: 4,
            subdivision: String::from("alpha"),
            tactical_focus: TacticalFocus::Balanced,
            home_field_size: FieldSize::Standard,
            camaraderie: 60,
            fan_loyalty: 70,
            record: TeamRecord::default(),
            ai_controlled: false,
            stadium_investment: 100_000,
        }
    }

    fn roster_player(id: u32, taxi: bool) -> Player {
        Player {
            id,
            team_id: 1,
            name: format!("P{}", id),
            role: PlayerRole::Runner,
            race: Race::Human,
            age: 24,
            attributes: PlayerAttributes {
                speed: 20,
                power: 20,
                agility: 20,
                throwing: 20,
                catching: 20,
                kicking: 20,
                stamina: 20,
                leadership: 20,
            },
            potential: 3.0,
            daily_stamina: 100,
            injury: InjuryStatus::Healthy,
            injury_recovery_points: 0,
            career_injuries: 0,
            minutes: SeasonalMinutes::default(),
            minutes_today: SeasonalMinutes::default(),
            on_taxi_squad: taxi,
            retired: false,
            contract: None,
        }
    }

    #[test]
    fn record_points_are_three_zero_one() {
        let mut record = TeamRecord::default();
        record.record_win();
        record.record_draw();
        record.record_loss();

        assert_eq!(4, record.points);
        assert_eq!(3, record.games_played());
    }

    #[test]
    fn roster_size_bounds_enforced() {
        let team = team();

        let players: Vec<Player> = (0..11).map(|i| roster_player(i, false)).collect();
        let refs: Vec<&Player> = players.iter().collect();
        assert!(team.validate_roster(&refs).is_err());

        let players: Vec<Player> = (0..12).map(|i| roster_player(i, false)).collect();
        let refs: Vec<&Player> = players.iter().collect();
        assert!(team.validate_roster(&refs).is_ok());
    }

    #[test]
    fn taxi_squad_cap_enforced() {
        let team = team();

        let players: Vec<Player> = (0..13).map(|i| roster_player(i, i < 3)).collect();
        let refs: Vec<&Player> = players.iter().collect();
        assert!(team.validate_roster(&refs).is_err());
    }
}
