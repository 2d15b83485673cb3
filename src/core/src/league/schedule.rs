use crate::calendar::REGULAR_SEASON_LAST_DAY;

/// One league fixture produced by schedule generation. Kickoff is expressed
/// as a civil time inside the day's 16:00-22:00 simulation window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueFixture {
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub day: u8,
    pub kickoff_hour: u32,
    pub kickoff_minute: u32,
}

/// Kickoff slots inside the simulation window, assigned round-robin by
/// pairing index so subdivision matches spread across the evening.
const KICKOFF_SLOTS: [(u32, u32); 4] = [(16, 0), (17, 30), (19, 0), (20, 30)];

/// Full regular-season schedule for one subdivision: every team plays 14
/// league matches, one per day on days 1-14, home/away balanced by mirroring
/// the first cycle.
///
/// 8-team subdivisions run a double round robin (7 + 7 rounds). 16-team
/// subdivisions play the first 14 rounds of a single round robin.
pub fn generate_season_schedule(teams: &[u32]) -> Vec<LeagueFixture> {
    generate_from_day(teams, 1)
}

/// Shortened schedule for late-signup subdivisions: one round per day from
/// `start_day` through day 14.
pub fn generate_from_day(teams: &[u32], start_day: u8) -> Vec<LeagueFixture> {
    if teams.len() < 2 || start_day > REGULAR_SEASON_LAST_DAY {
        return Vec::new();
    }

    let rounds = round_robin_rounds(teams);
    let base_rounds = rounds.len();

    let mut fixtures = Vec::new();

    for (offset, day) in (start_day..=REGULAR_SEASON_LAST_DAY).enumerate() {
        let round_index = offset % base_rounds;
        // Mirror home/away on every second cycle through the base rounds.
        let mirrored = (offset / base_rounds) % 2 == 1;

        for (pair_index, &(home, away)) in rounds[round_index].iter().enumerate() {
            let (home, away) = if mirrored { (away, home) } else { (home, away) };
            let (kickoff_hour, kickoff_minute) = KICKOFF_SLOTS[pair_index % KICKOFF_SLOTS.len()];

            fixtures.push(LeagueFixture {
                home_team_id: home,
                away_team_id: away,
                day,
                kickoff_hour,
                kickoff_minute,
            });
        }
    }

    fixtures
}

/// Circle-method round robin. For an odd team count one team sits out each
/// round. Returns one Vec of (home, away) pairs per round.
fn round_robin_rounds(teams: &[u32]) -> Vec<Vec<(u32, u32)>> {
    let mut pool: Vec<Option<u32>> = teams.iter().copied().map(Some).collect();
    if pool.len() % 2 == 1 {
        pool.push(None);
    }

    let n = pool.len();
    let rounds_count = n - 1;
    let mut rounds = Vec::with_capacity(rounds_count);

    for round in 0..rounds_count {
        let mut pairs = Vec::with_capacity(n / 2);

        for i in 0..n / 2 {
            let a = pool[i];
            let b = pool[n - 1 - i];

            if let (Some(a), Some(b)) = (a, b) {
                // Alternate sides per round so the fixed seat does not host
                // every match.
                if round % 2 == 0 {
                    pairs.push((a, b));
                } else {
                    pairs.push((b, a));
                }
            }
        }

        rounds.push(pairs);

        // Rotate all but the first seat.
        let last = pool.pop().unwrap();
        pool.insert(1, last);
    }

    rounds
}
