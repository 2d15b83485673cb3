use crate::club::player::attributes::AttributeKind;
use crate::club::player::player::{Player, HARD_RETIREMENT_AGE};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub const DECLINE_START_AGE: u8 = 31;
pub const RETIREMENT_CHECK_AGE: u8 = 35;

/// Season total a full-time player accumulates: 14 league matches of 40
/// minutes. Usage penalties key off fractions of this.
pub const FULL_SEASON_MINUTES: u16 = 560;

#[derive(Debug, Clone, Default)]
pub struct AgingOutcome {
    pub declined: Option<AttributeKind>,
    pub retired: bool,
}

/// End-of-season aging, run once per player on day 17: decline check,
/// retirement check, then birthday and seasonal-minutes reset.
pub fn end_of_season(player: &mut Player, rng: &mut ChaCha8Rng) -> AgingOutcome {
    let mut outcome = AgingOutcome::default();

    if player.retired {
        return outcome;
    }

    if player.age >= DECLINE_START_AGE {
        let decline_chance = (player.age as f32 - 30.0) * 2.5;

        if rng.gen_range(0.0..100.0) < decline_chance {
            let kind = pick_decline_attribute(rng);
            if player.attributes.decrease(kind) {
                outcome.declined = Some(kind);
            }
        }
    }

    if player.age >= HARD_RETIREMENT_AGE {
        player.retired = true;
        outcome.retired = true;
    } else if player.age >= RETIREMENT_CHECK_AGE {
        let chance = retirement_chance(player);

        if rng.gen_range(0.0..100.0) < chance {
            player.retired = true;
            outcome.retired = true;
        }
    }

    if !player.retired {
        player.age += 1;
    }

    player.minutes.reset();
    player.minutes_today.reset();

    outcome
}

/// Speed and agility decline twice as often as power.
fn pick_decline_attribute(rng: &mut ChaCha8Rng) -> AttributeKind {
    match rng.gen_range(0..5) {
        0 | 1 => AttributeKind::Speed,
        2 | 3 => AttributeKind::Agility,
        _ => AttributeKind::Power,
    }
}

pub fn retirement_chance(player: &Player) -> f32 {
    let base = base_age_chance(player.age);
    let injuries = player.career_injuries as f32 * 2.0;

    let season_total = player.minutes.total();
    let usage_penalty = if season_total < FULL_SEASON_MINUTES * 5 / 14 {
        15.0
    } else if season_total < FULL_SEASON_MINUTES * 10 / 14 {
        5.0
    } else {
        0.0
    };

    (base + injuries + usage_penalty).min(100.0)
}

fn base_age_chance(age: u8) -> f32 {
    match age {
        35 => 5.0,
        36 => 8.0,
        37 => 12.0,
        38 => 18.0,
        39 => 25.0,
        40 => 35.0,
        41 => 45.0,
        42 => 60.0,
        43 => 75.0,
        44 => 90.0,
        _ if age >= HARD_RETIREMENT_AGE => 100.0,
        _ => 0.0,
    }
}
