use crate::club::player::Player;
use crate::club::team::Team;

// True-strength weights, applied to components normalized into [0, 1].
// Deterministic at bracket creation; tuning these reorders seeds only.
const POWER_WEIGHT: f64 = 0.35;
const WIN_PCT_WEIGHT: f64 = 0.25;
const SCHEDULE_WEIGHT: f64 = 0.10;
const CAMARADERIE_WEIGHT: f64 = 0.10;
const FORM_WEIGHT: f64 = 0.10;
const HEALTH_WEIGHT: f64 = 0.10;

#[derive(Debug, Clone, Copy)]
pub struct StrengthInput {
    /// Average Core Athleticism Rating across the roster, [1, 40].
    pub roster_power: f64,
    pub division: u8,
    pub win_percentage: f64,
    /// Opponent quality proxy, [0, 1].
    pub schedule_strength: f64,
    pub camaraderie: u8,
    /// Recent-form score, [0, 1].
    pub recent_form: f64,
    /// Share of the roster currently fieldable, [0, 1].
    pub health: f64,
}

impl StrengthInput {
    pub fn from_team(team: &Team, roster: &[&Player], recent_form: f64) -> Self {
        let fieldable = roster.iter().filter(|p| p.is_fieldable()).count();
        let roster_power = if roster.is_empty() {
            0.0
        } else {
            roster.iter().map(|p| p.car() as f64).sum::<f64>() / roster.len() as f64
        };

        StrengthInput {
            roster_power,
            division: team.division,
            win_percentage: team.record.win_percentage() as f64,
            // Division itself proxies schedule strength until cross-division
            // play exists.
            schedule_strength: (9 - team.division) as f64 / 8.0,
            camaraderie: team.camaraderie,
            recent_form,
            health: if roster.is_empty() {
                0.0
            } else {
                fieldable as f64 / roster.len() as f64
            },
        }
    }
}

/// Deterministic scalar used for tournament seeding; higher is stronger.
pub fn true_strength(input: &StrengthInput) -> f64 {
    let power = (input.roster_power / 40.0).clamp(0.0, 1.0);
    let camaraderie = input.camaraderie as f64 / 100.0;

    let base = power * POWER_WEIGHT
        + input.win_percentage.clamp(0.0, 1.0) * WIN_PCT_WEIGHT
        + input.schedule_strength.clamp(0.0, 1.0) * SCHEDULE_WEIGHT
        + camaraderie * CAMARADERIE_WEIGHT
        + input.recent_form.clamp(0.0, 1.0) * FORM_WEIGHT
        + input.health.clamp(0.0, 1.0) * HEALTH_WEIGHT;

    // Higher divisions carry a scaling premium so div-1 sides outrank
    // equal-profile div-8 sides.
    base * (1.0 + (8 - input.division.clamp(1, 8)) as f64 * 0.02)
}

/// Teams ordered strongest first, ties broken by id for stability.
pub fn seed_teams(inputs: &[(u32, StrengthInput)]) -> Vec<u32> {
    let mut rated: Vec<(u32, f64)> = inputs
        .iter()
        .map(|(id, input)| (*id, true_strength(input)))
        .collect();

    rated.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
    rated.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(power: f64, win: f64) -> StrengthInput {
        StrengthInput {
            roster_power: power,
            division: 4,
            win_percentage: win,
            schedule_strength: 0.5,
            camaraderie: 50,
            recent_form: 0.5,
            health: 1.0,
        }
    }

    #[test]
    fn stronger_profiles_rank_higher() {
        assert!(true_strength(&input(30.0, 0.8)) > true_strength(&input(20.0, 0.4)));
    }

    #[test]
    fn seeding_is_deterministic_with_id_tiebreak() {
        let inputs = vec![(2, input(20.0, 0.5)), (1, input(20.0, 0.5)), (3, input(30.0, 0.5))];

        assert_eq!(vec![3, 1, 2], seed_teams(&inputs));
        assert_eq!(vec![3, 1, 2], seed_teams(&inputs));
    }

    #[test]
    fn division_scaling_breaks_equal_profiles() {
        let mut high_div = input(25.0, 0.5);
        high_div.division = 1;
        let mut low_div = input(25.0, 0.5);
        low_div.division = 8;

        // Same schedule term isolated: the division premium decides.
        low_div.schedule_strength = high_div.schedule_strength;
        assert!(true_strength(&high_div) > true_strength(&low_div));
    }
}
