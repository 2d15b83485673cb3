use crate::club::player::attributes::AttributeKind;
use crate::club::player::player::{InjuryStatus, Player};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Physical attributes stop progressing at this age.
pub const PHYSICAL_PROGRESSION_AGE_LIMIT: u8 = 34;

/// Team-side inputs to a player's daily progression rolls.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyProgressionInput {
    /// Rating of the trainer matching the player's role, [1, 40].
    pub trainer_rating: u8,
    /// Head coach rating, [1, 40].
    pub head_coach_rating: u8,
    /// Team camaraderie, [0, 100].
    pub camaraderie: u8,
    /// Extra activity from notable match performances.
    pub performance_bonus: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressionOutcome {
    pub rolls: u32,
    pub improved: Vec<AttributeKind>,
}

/// Daily progression, run once per player at day rollover. Activity earned
/// from minutes played since the previous rollover converts into rolls; each
/// roll targets a uniformly chosen attribute.
pub fn daily_progression(
    player: &mut Player,
    input: &DailyProgressionInput,
    rng: &mut ChaCha8Rng,
) -> ProgressionOutcome {
    let mut outcome = ProgressionOutcome::default();

    if player.retired {
        return outcome;
    }

    let minutes = player.minutes_today;
    let activity_score = minutes.league as f32 / 40.0 * 10.0
        + minutes.tournament as f32 / 40.0 * 7.0
        + minutes.exhibition as f32 / 40.0 * 2.0
        + input.performance_bonus;

    outcome.rolls = (activity_score / 5.0).floor() as u32;

    let cap = player.attribute_cap();

    for _ in 0..outcome.rolls {
        let kind = pick_attribute(player.age, rng);
        let chance = success_chance(player, input, rng);

        if rng.gen_range(0.0..100.0) < chance && player.attributes.increase(kind, cap) {
            outcome.improved.push(kind);
        }
    }

    outcome
}

/// Uniform attribute pick; physical attributes are excluded from age 34 on.
fn pick_attribute(age: u8, rng: &mut ChaCha8Rng) -> AttributeKind {
    let pool: Vec<AttributeKind> = AttributeKind::ALL
        .iter()
        .copied()
        .filter(|kind| age < PHYSICAL_PROGRESSION_AGE_LIMIT || !kind.is_physical())
        .collect();

    pool[rng.gen_range(0..pool.len())]
}

/// P = 5% + potentialMod + ageMod + staffMod + camaraderieMod + injuryMod
///     + U(-1%, +1%), clamped to [1%, 95%].
fn success_chance(player: &Player, input: &DailyProgressionInput, rng: &mut ChaCha8Rng) -> f32 {
    let potential_mod = player.potential;

    let age_mod = match player.age {
        16..=23 => 2.0,
        24..=30 => 1.0,
        31..=33 => 0.0,
        _ => -2.0,
    };

    let staff_mod =
        input.trainer_rating as f32 / 40.0 * 5.0 + input.head_coach_rating as f32 / 40.0 * 2.0;

    let camaraderie_mod = (input.camaraderie as f32 - 50.0) / 50.0 * 2.0;

    let injury_mod = match player.injury {
        InjuryStatus::Healthy => 0.0,
        InjuryStatus::Minor => -1.5,
        InjuryStatus::Moderate => -3.0,
        InjuryStatus::Severe => -5.0,
    };

    let noise = rng.gen_range(-1.0..1.0);

    (5.0 + potential_mod + age_mod + staff_mod + camaraderie_mod + injury_mod + noise)
        .clamp(1.0, 95.0)
}
