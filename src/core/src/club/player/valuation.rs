use crate::club::player::player::Player;
use crate::club::staff::Staff;

/// Fraction of the Universal Value Formula a contract offer must reach.
pub const CONTRACT_FLOOR_PERCENT: i64 = 70;

/// Offers at or above this fraction of UVF are accepted outright; between
/// the floor and this line the counterparty counters at full value.
pub const CONTRACT_ACCEPT_PERCENT: i64 = 95;

/// Universal Value Formula for players:
/// `(sum(attributes) * 50 + potential(1-10) * 1000) * age_modifier`.
pub fn player_value(player: &Player) -> i64 {
    let attribute_value = player.attributes.sum() as i64 * 50;
    let potential_value = (player.potential * 2.0 * 1000.0) as i64;

    apply_age_modifier(attribute_value + potential_value, player.age)
}

/// Staff use the same shape with a heavier attribute weight and no
/// potential term.
pub fn staff_value(staff: &Staff) -> i64 {
    apply_age_modifier(staff.attributes.sum() as i64 * 150, staff.age)
}

fn apply_age_modifier(base: i64, age: u8) -> i64 {
    let modifier = match age {
        16..=23 => 0.8,
        24..=30 => 1.2,
        31..=34 => 1.0,
        _ => 0.7,
    };

    (base as f64 * modifier) as i64
}

pub fn minimum_offer(value: i64) -> i64 {
    value * CONTRACT_FLOOR_PERCENT / 100
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferResponse {
    Accepted,
    /// The counterparty wants more; the counter salary is returned.
    Countered { counter_salary: i64 },
    Rejected,
}

/// Contract negotiation against the UVF: below the 70% floor is rejected,
/// [70%, 95%) draws a counter at full value rounded to the nearest 100,
/// 95%+ is accepted.
pub fn evaluate_offer(value: i64, offered_salary: i64) -> OfferResponse {
    if offered_salary < minimum_offer(value) {
        return OfferResponse::Rejected;
    }

    if offered_salary * 100 >= value * CONTRACT_ACCEPT_PERCENT {
        OfferResponse::Accepted
    } else {
        OfferResponse::Countered {
            counter_salary: (value + 50) / 100 * 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::club::player::attributes::PlayerAttributes;
    use crate::club::player::player::{InjuryStatus, PlayerRole, Race, SeasonalMinutes};

    fn valued_player(age: u8) -> Player {
        Player {
            id: 1,
            team_id: 1,
            name: String::from("Asset"),
            role: PlayerRole::Passer,
            race: Race::Lumina,
            age,
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
            potential: 2.5,
            daily_stamina: 100,
            injury: InjuryStatus::Healthy,
            injury_recovery_points: 0,
            career_injuries: 0,
            minutes: SeasonalMinutes::default(),
            minutes_today: SeasonalMinutes::default(),
            on_taxi_squad: false,
            retired: false,
            contract: None,
        }
    }

    #[test]
    fn uvf_prime_age_carries_premium() {
        // sum = 160 -> 8000; potential 2.5 -> 5 -> 5000; base 13000.
        assert_eq!((13000.0 * 1.2) as i64, player_value(&valued_player(27)));
        assert_eq!((13000.0 * 0.8) as i64, player_value(&valued_player(20)));
        assert_eq!(13000, player_value(&valued_player(33)));
        assert_eq!((13000.0 * 0.7) as i64, player_value(&valued_player(38)));
    }

    #[test]
    fn offers_below_floor_are_rejected() {
        let value = 10_000;
        assert_eq!(OfferResponse::Rejected, evaluate_offer(value, 6_999));
    }

    #[test]
    fn offers_between_floor_and_accept_draw_counter() {
        let value = 10_000;
        match evaluate_offer(value, 8_000) {
            OfferResponse::Countered { counter_salary } => assert_eq!(10_000, counter_salary),
            other => panic!("expected counter, got {:?}", other),
        }
    }

    #[test]
    fn generous_offers_are_accepted() {
        let value = 10_000;
        assert_eq!(OfferResponse::Accepted, evaluate_offer(value, 9_500));
    }
}
