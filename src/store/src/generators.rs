use crate::tx::Tx;
use core::club::{
    minimum_offer, player_value, AttributeKind, Contract, FieldSize, Player, PlayerAttributes,
    PlayerRole, Race, SeasonalMinutes, Staff, StaffAttributes, StaffType, TacticalFocus, Team,
    TeamFinances, TeamRecord, InjuryStatus,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

const AI_TEAM_CREDITS: i64 = 50_000;
const AI_STADIUM_INVESTMENT: i64 = 50_000;
pub const AI_ROSTER_SIZE: usize = 12;

const TEAM_PREFIXES: [&str; 12] = [
    "Iron", "Shadow", "Crimson", "Granite", "Storm", "Ember", "Frost", "Obsidian", "Gilded",
    "Thunder", "Ashen", "Violet",
];
const TEAM_SUFFIXES: [&str; 12] = [
    "Wardens", "Titans", "Reavers", "Sentinels", "Chargers", "Wolves", "Colossi", "Marauders",
    "Heralds", "Juggernauts", "Monarchs", "Vultures",
];

const FIRST_NAMES: [&str; 16] = [
    "Kael", "Miro", "Thane", "Orin", "Vess", "Darrow", "Lucen", "Bram", "Sorrel", "Edrik",
    "Halvar", "Joss", "Rennick", "Cato", "Ilya", "Fenn",
];
const LAST_NAMES: [&str; 16] = [
    "Vayne", "Stonewall", "Ashgrove", "Kerrick", "Duskwalker", "Hollowell", "Brightspear",
    "Ironwood", "Galeborn", "Thornfield", "Morrow", "Blackbriar", "Quillon", "Striketide",
    "Emberfall", "Coldwater",
];

/// Generate a complete AI team: balanced roster, staff, standard finances.
/// Used by tournament fill, late signup, and subdivision top-up at rollover.
pub fn generate_ai_team(
    tx: &mut Tx,
    division: u8,
    subdivision: &str,
    rng: &mut ChaCha8Rng,
) -> u32 {
    let name = format!(
        "{} {}",
        TEAM_PREFIXES[rng.gen_range(0..TEAM_PREFIXES.len())],
        TEAM_SUFFIXES[rng.gen_range(0..TEAM_SUFFIXES.len())]
    );

    let team = Team {
        id: 0,
        owner_id: 0,
        name,
        division,
        subdivision: subdivision.to_string(),
        tactical_focus: TacticalFocus::Balanced,
        home_field_size: FieldSize::Standard,
        camaraderie: rng.gen_range(40..=70),
        fan_loyalty: rng.gen_range(30..=60),
        record: TeamRecord::default(),
        ai_controlled: true,
        stadium_investment: AI_STADIUM_INVESTMENT,
    };

    let team_id = tx.insert_team(team, TeamFinances::new(AI_TEAM_CREDITS, 0));

    for i in 0..AI_ROSTER_SIZE {
        let role = PlayerRole::ALL[i % 3];
        let player = generate_ai_player(team_id, role, rng);
        tx.insert_player(player);
    }

    for staff_type in [
        StaffType::HeadCoach,
        StaffType::PasserTrainer,
        StaffType::RunnerTrainer,
        StaffType::BlockerTrainer,
        StaffType::RecoverySpecialist,
    ] {
        let staff = generate_ai_staff(team_id, staff_type, rng);
        tx.insert_staff(staff);
    }

    team_id
}

pub fn generate_ai_player(team_id: u32, role: PlayerRole, rng: &mut ChaCha8Rng) -> Player {
    let mut attribute = |lo: u8, hi: u8| rng.gen_range(lo..=hi);

    // Role-flavored attribute spreads on a balanced base.
    let (throwing, speed, power) = match role {
        PlayerRole::Passer => (attribute(18, 28), attribute(12, 22), attribute(10, 20)),
        PlayerRole::Runner => (attribute(8, 16), attribute(18, 28), attribute(12, 22)),
        PlayerRole::Blocker => (attribute(6, 14), attribute(10, 20), attribute(18, 28)),
    };

    let attributes = PlayerAttributes {
        speed,
        power,
        agility: attribute(12, 24),
        throwing,
        catching: attribute(12, 24),
        kicking: attribute(10, 22),
        stamina: attribute(14, 26),
        leadership: attribute(8, 24),
    };

    // Half-star potential in [1.0, 4.0], floored so no attribute starts
    // above the potential cap.
    let max_attribute = AttributeKind::ALL
        .iter()
        .map(|k| attributes.get(*k))
        .max()
        .unwrap_or(1);
    let floor_potential = (max_attribute as f32 / 8.0 * 2.0).ceil() / 2.0;
    let potential = (rng.gen_range(2..=8) as f32 * 0.5).max(floor_potential).min(5.0);

    let mut player = Player {
        id: 0,
        team_id,
        name: format!(
            "{} {}",
            FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
            LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())]
        ),
        role,
        race: Race::ALL[rng.gen_range(0..Race::ALL.len())],
        age: rng.gen_range(18..=32),
        attributes,
        potential,
        daily_stamina: 100,
        injury: InjuryStatus::Healthy,
        injury_recovery_points: 0,
        career_injuries: 0,
        minutes: SeasonalMinutes::default(),
        minutes_today: SeasonalMinutes::default(),
        on_taxi_squad: false,
        retired: false,
        contract: None,
    };

    let salary = minimum_offer(player_value(&player)).max(500);
    player.contract = Some(Contract::new(salary, rng.gen_range(1..=3), 0));

    player
}

pub fn generate_ai_staff(team_id: u32, staff_type: StaffType, rng: &mut ChaCha8Rng) -> Staff {
    let mut attribute = || rng.gen_range(10u8..=26);

    let attributes = StaffAttributes {
        motivation: attribute(),
        development: attribute(),
        teaching: attribute(),
        physiology: attribute(),
        talent_assessment: attribute(),
        potential_assessment: attribute(),
        tactics: attribute(),
    };

    let mut staff = Staff {
        id: 0,
        team_id,
        name: format!(
            "{} {}",
            FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
            LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())]
        ),
        staff_type,
        age: rng.gen_range(35..=60),
        attributes,
        contract: None,
    };

    let salary = (attributes.sum() as i64 * 150).max(1_000) / 10;
    staff.contract = Some(Contract::new(salary, rng.gen_range(1..=3), 0));

    staff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use chrono::NaiveDate;
    use rand::SeedableRng;

    #[test]
    fn ai_team_comes_fully_staffed() {
        let store = Store::new(1);
        let now = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let team_id = store
            .with_tx(now, |tx| {
                let mut rng = ChaCha8Rng::seed_from_u64(5);
                Ok(generate_ai_team(tx, 8, "alpha", &mut rng))
            })
            .unwrap();

        store.read(|world| {
            let team = &world.teams[&team_id];
            assert!(team.ai_controlled);
            assert_eq!(8, team.division);

            let roster: Vec<_> = world.players.values().filter(|p| p.team_id == team_id).collect();
            assert_eq!(AI_ROSTER_SIZE, roster.len());
            assert!(roster.iter().all(|p| p.contract.is_some()));

            // All three roles represented, four each.
            for role in PlayerRole::ALL {
                assert_eq!(4, roster.iter().filter(|p| p.role == role).count());
            }

            let staff: Vec<_> = world.staff.values().filter(|s| s.team_id == team_id).collect();
            assert_eq!(5, staff.len());
            assert_eq!(
                1,
                staff
                    .iter()
                    .filter(|s| s.staff_type == StaffType::HeadCoach)
                    .count()
            );

            assert_eq!(AI_TEAM_CREDITS, world.finances[&team_id].credits);
        });
    }

    #[test]
    fn generated_attributes_respect_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        for _ in 0..50 {
            let player = generate_ai_player(1, PlayerRole::Runner, &mut rng);

            assert!(player.attributes.sum() >= 8);
            assert!((1.0..=5.0).contains(&player.potential));
            assert!((18..=32).contains(&player.age));
            assert!(player.contract.as_ref().unwrap().salary >= 500);

            // No attribute may start above the potential cap.
            let cap = player.attribute_cap();
            for kind in AttributeKind::ALL {
                assert!(player.attributes.get(kind) <= cap);
            }
        }
    }
}
