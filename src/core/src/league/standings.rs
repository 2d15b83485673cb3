use crate::club::team::Team;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub const PROMOTED_PER_SUBDIVISION: usize = 2;
pub const RELEGATED_PER_SUBDIVISION: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub rank: usize,
    pub team_id: u32,
    pub wins: u16,
    pub losses: u16,
    pub draws: u16,
    pub points: u16,
}

/// Final table for one subdivision, ordered by points, then wins, then team
/// id for a stable total order.
pub fn subdivision_standings(teams: &[&Team]) -> Vec<StandingRow> {
    teams
        .iter()
        .sorted_by(|a, b| {
            b.record
                .points
                .cmp(&a.record.points)
                .then(b.record.wins.cmp(&a.record.wins))
                .then(a.id.cmp(&b.id))
        })
        .enumerate()
        .map(|(index, team)| StandingRow {
            rank: index + 1,
            team_id: team.id,
            wins: team.record.wins,
            losses: team.record.losses,
            draws: team.record.draws,
            points: team.record.points,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionOutcome {
    pub promoted: Vec<u32>,
    pub relegated: Vec<u32>,
}

/// Top 2 move up, bottom 2 move down. Division 1 promotes nobody upward and
/// division 8 relegates nobody downward; lower divisions absorb relegation
/// volume through the promotion pool maintained by the rollover step.
pub fn promotion_relegation(standings: &[StandingRow], division: u8) -> PromotionOutcome {
    let mut outcome = PromotionOutcome::default();

    if standings.len() < PROMOTED_PER_SUBDIVISION + RELEGATED_PER_SUBDIVISION {
        return outcome;
    }

    if division > 1 {
        outcome.promoted = standings
            .iter()
            .take(PROMOTED_PER_SUBDIVISION)
            .map(|row| row.team_id)
            .collect();
    }

    if division < 8 {
        outcome.relegated = standings
            .iter()
            .rev()
            .take(RELEGATED_PER_SUBDIVISION)
            .map(|row| row.team_id)
            .collect();
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::club::team::{FieldSize, TacticalFocus, TeamRecord};

    fn team_with_points(id: u32, wins: u16, draws: u16, losses: u16) -> Team {
        Team {
            id,
            owner_id: id,
            name: format!("T{}", id),
            division: 4,
            subdivision: String::from("alpha"),
            tactical_focus: TacticalFocus::Balanced,
            home_field_size: FieldSize::Standard,
            camaraderie: 50,
            fan_loyalty: 50,
            record: TeamRecord {
                wins,
                losses,
                draws,
                points: wins * 3 + draws,
            },
            ai_controlled: false,
            stadium_investment: 0,
        }
    }

    #[test]
    fn standings_order_by_points_then_wins() {
        let a = team_with_points(1, 5, 0, 9); // 15 pts
        let b = team_with_points(2, 4, 3, 7); // 15 pts, fewer wins
        let c = team_with_points(3, 8, 1, 5); // 25 pts

        let teams = vec![&a, &b, &c];
        let standings = subdivision_standings(&teams);

        assert_eq!(vec![3, 1, 2], standings.iter().map(|r| r.team_id).collect::<Vec<_>>());
    }

    #[test]
    fn top_two_up_bottom_two_down() {
        let teams: Vec<Team> = (1..=8)
            .map(|id| team_with_points(id, 14 - id as u16, 0, id as u16))
            .collect();
        let refs: Vec<&Team> = teams.iter().collect();

        let standings = subdivision_standings(&refs);
        let outcome = promotion_relegation(&standings, 4);

        assert_eq!(vec![1, 2], outcome.promoted);
        assert_eq!(vec![8, 7], outcome.relegated);
    }

    #[test]
    fn division_one_never_promotes_division_eight_never_relegates() {
        let teams: Vec<Team> = (1..=8)
            .map(|id| team_with_points(id, 14 - id as u16, 0, id as u16))
            .collect();
        let refs: Vec<&Team> = teams.iter().collect();
        let standings = subdivision_standings(&refs);

        assert!(promotion_relegation(&standings, 1).promoted.is_empty());
        assert!(promotion_relegation(&standings, 8).relegated.is_empty());
    }
}
