use crate::club::contract::Contract;
use crate::club::player::attributes::PlayerAttributes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const MIN_PLAYER_AGE: u8 = 16;
pub const HARD_RETIREMENT_AGE: u8 = 45;
pub const DAILY_STAMINA_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerRole {
    Passer,
    Runner,
    Blocker,
}

impl PlayerRole {
    pub const ALL: [PlayerRole; 3] = [PlayerRole::Passer, PlayerRole::Runner, PlayerRole::Blocker];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    Human,
    Sylvan,
    Gryll,
    Lumina,
    Umbra,
}

impl Race {
    pub const ALL: [Race; 5] = [
        Race::Human,
        Race::Sylvan,
        Race::Gryll,
        Race::Lumina,
        Race::Umbra,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InjuryStatus {
    Healthy,
    Minor,
    Moderate,
    Severe,
}

impl InjuryStatus {
    /// Recovery points a fresh injury of this severity needs before the
    /// player returns to HEALTHY. One point is recovered per day, more with
    /// a recovery specialist.
    pub fn recovery_points(&self) -> u16 {
        match self {
            InjuryStatus::Healthy => 0,
            InjuryStatus::Minor => 2,
            InjuryStatus::Moderate => 5,
            InjuryStatus::Severe => 10,
        }
    }
}

/// Seasonal minutes played, tracked per match type for progression and
/// retirement usage checks. Reset at season rollover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalMinutes {
    pub league: u16,
    pub tournament: u16,
    pub exhibition: u16,
}

impl SeasonalMinutes {
    pub fn total(&self) -> u16 {
        self.league + self.tournament + self.exhibition
    }

    pub fn reset(&mut self) {
        *self = SeasonalMinutes::default();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub team_id: u32,
    pub name: String,
    pub role: PlayerRole,
    pub race: Race,
    pub age: u8,
    pub attributes: PlayerAttributes,
    /// Potential in [0.5, 5.0], half-star steps.
    pub potential: f32,
    /// Day-to-day stamina in [0, 100]; matches start from this value.
    pub daily_stamina: u8,
    pub injury: InjuryStatus,
    pub injury_recovery_points: u16,
    pub career_injuries: u16,
    pub minutes: SeasonalMinutes,
    /// Minutes played since the last day rollover; consumed by daily
    /// progression and cleared with the other daily limits.
    pub minutes_today: SeasonalMinutes,
    pub on_taxi_squad: bool,
    pub retired: bool,
    pub contract: Option<Contract>,
}

impl Player {
    /// No attribute may exceed `floor(potential * 8)`.
    pub fn attribute_cap(&self) -> u8 {
        (self.potential * 8.0).floor() as u8
    }

    /// Core Athleticism Rating: average of the six athletic attributes.
    pub fn car(&self) -> f32 {
        let a = &self.attributes;
        (a.speed as f32
            + a.power as f32
            + a.agility as f32
            + a.throwing as f32
            + a.catching as f32
            + a.kicking as f32)
            / 6.0
    }

    /// A SEVERE injury or retirement keeps a player off the field.
    pub fn is_fieldable(&self) -> bool {
        !self.retired && self.injury != InjuryStatus::Severe
    }

    pub fn set_injury(&mut self, severity: InjuryStatus) {
        if severity == InjuryStatus::Healthy {
            return;
        }

        if severity > self.injury {
            self.injury = severity;
            self.injury_recovery_points = severity.recovery_points();
        }

        self.career_injuries += 1;
    }

    /// Recover injury points; returns true when the player healed today.
    pub fn recover_injury(&mut self, points: u16) -> bool {
        if self.injury == InjuryStatus::Healthy {
            return false;
        }

        self.injury_recovery_points = self.injury_recovery_points.saturating_sub(points);

        if self.injury_recovery_points == 0 {
            self.injury = InjuryStatus::Healthy;
            true
        } else {
            false
        }
    }

    /// Daily stamina restoration toward 100, favoring younger and less-used
    /// players.
    pub fn restore_daily_stamina(&mut self) {
        let age_factor = if self.age < 24 {
            1.2
        } else if self.age > 30 {
            0.8
        } else {
            1.0
        };

        // Heavy recent usage slows overnight recovery.
        let usage_factor = if self.minutes.total() > 400 { 0.8 } else { 1.0 };

        let recovered = (30.0 * age_factor * usage_factor) as u8;
        self.daily_stamina = self
            .daily_stamina
            .saturating_add(recovered)
            .min(DAILY_STAMINA_MAX);
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?}/{:?})", self.name, self.role, self.race)
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
