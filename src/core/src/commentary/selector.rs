use crate::club::player::Race;
use crate::commentary::prompts::{prompt_indexes, PromptCategory};
use crate::r#match::engine::events::MatchEventKind;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Fraction of selections that prefer a race-flavored variant when the
/// acting player's race has one.
const RACE_VARIANT_CHANCE: f64 = 0.30;

/// Match context the selector keys on beyond the event itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentaryContext {
    pub actor_race: Option<Race>,
    pub actor_stamina: f32,
    pub score_diff: i16,
    pub seconds_remaining: u32,
    pub camaraderie: u8,
    pub home_crowd: bool,
}

/// Deterministic, context-aware prompt selection. All draws come from the
/// engine's seeded stream, so commentary replays identically with events.
pub fn select_commentary(
    kind: &MatchEventKind,
    ctx: &CommentaryContext,
    rng: &mut ChaCha8Rng,
) -> u16 {
    let category = pick_category(kind, ctx, rng);

    // Race-flavored variants win 30% of draws when available.
    if let Some(race) = ctx.actor_race {
        let variants = prompt_indexes(category, Some(race));
        if !variants.is_empty() && rng.gen_bool(RACE_VARIANT_CHANCE) {
            return variants[rng.gen_range(0..variants.len())];
        }
    }

    let pool = prompt_indexes(category, None);
    if pool.is_empty() {
        return 0;
    }

    pool[rng.gen_range(0..pool.len())]
}

fn pick_category(
    kind: &MatchEventKind,
    ctx: &CommentaryContext,
    rng: &mut ChaCha8Rng,
) -> PromptCategory {
    match kind {
        MatchEventKind::KickOff => {
            if ctx.home_crowd && rng.gen_bool(0.5) {
                PromptCategory::Atmosphere
            } else {
                PromptCategory::PreGame
            }
        }
        MatchEventKind::Pass { complete: true, .. } => {
            if ctx.camaraderie > 75 && rng.gen_bool(0.2) {
                PromptCategory::Camaraderie
            } else if rng.gen_bool(0.15) {
                PromptCategory::Skill
            } else {
                PromptCategory::Passes
            }
        }
        MatchEventKind::Pass { complete: false, .. } => PromptCategory::Defense,
        MatchEventKind::Run { .. } => {
            if ctx.actor_stamina < 20.0 && rng.gen_bool(0.3) {
                PromptCategory::Fatigue
            } else {
                PromptCategory::Runs
            }
        }
        MatchEventKind::Kick { good: true } => PromptCategory::Scoring,
        MatchEventKind::Kick { good: false } => PromptCategory::Defense,
        MatchEventKind::Tackle { .. } | MatchEventKind::Knockdown { .. } => PromptCategory::Defense,
        MatchEventKind::LooseBall { .. } => PromptCategory::LooseBall,
        MatchEventKind::Score => {
            if ctx.seconds_remaining <= 300 && ctx.score_diff.abs() <= 2 {
                PromptCategory::Urgency
            } else {
                PromptCategory::Scoring
            }
        }
        MatchEventKind::Injury { .. } => PromptCategory::Injury,
        MatchEventKind::Substitution { .. } => PromptCategory::Fatigue,
        MatchEventKind::HalfTime => PromptCategory::MidGameFlow,
        MatchEventKind::OvertimeStart | MatchEventKind::SuddenDeathStart => PromptCategory::Urgency,
        MatchEventKind::MatchComplete { .. } => PromptCategory::Contextual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::prompts::PROMPTS;
    use rand::SeedableRng;

    #[test]
    fn selection_is_deterministic_per_seed() {
        let ctx = CommentaryContext {
            actor_race: Some(Race::Sylvan),
            actor_stamina: 80.0,
            score_diff: 1,
            seconds_remaining: 900,
            camaraderie: 80,
            home_crowd: true,
        };
        let kind = MatchEventKind::Pass {
            complete: true,
            yards: 8,
        };

        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..100 {
            assert_eq!(
                select_commentary(&kind, &ctx, &mut a),
                select_commentary(&kind, &ctx, &mut b)
            );
        }
    }

    #[test]
    fn selected_ids_are_valid_prompt_indexes() {
        let ctx = CommentaryContext::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for kind in [
            MatchEventKind::KickOff,
            MatchEventKind::Run { yards: 5 },
            MatchEventKind::Score,
            MatchEventKind::HalfTime,
            MatchEventKind::Injury {
                severity: crate::club::player::InjuryStatus::Minor,
            },
            MatchEventKind::MatchComplete {
                home_score: 3,
                away_score: 2,
            },
        ] {
            let id = select_commentary(&kind, &ctx, &mut rng);
            assert!((id as usize) < PROMPTS.len());
        }
    }

    #[test]
    fn race_variants_appear_for_matching_race_only() {
        let kind = MatchEventKind::Run { yards: 6 };

        // Umbra runners can draw the Umbra variant.
        let ctx = CommentaryContext {
            actor_race: Some(Race::Umbra),
            actor_stamina: 90.0,
            ..CommentaryContext::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut saw_variant = false;
        for _ in 0..200 {
            let id = select_commentary(&kind, &ctx, &mut rng);
            if PROMPTS[id as usize].race == Some(Race::Umbra) {
                saw_variant = true;
            }
        }
        assert!(saw_variant);

        // Humans never draw race variants.
        let ctx = CommentaryContext {
            actor_race: Some(Race::Human),
            actor_stamina: 90.0,
            ..CommentaryContext::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..200 {
            let id = select_commentary(&kind, &ctx, &mut rng);
            assert!(PROMPTS[id as usize].race.is_none());
        }
    }
}
