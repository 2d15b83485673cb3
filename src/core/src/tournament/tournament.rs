use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Daily divisional cadence.
pub const DAILY_REGISTRATION_OPEN_HOUR: u32 = 7;
pub const DAILY_REGISTRATION_CLOSE_HOUR: u32 = 1;
pub const DAILY_FILL_TIMER_MINUTES: i64 = 60;
pub const DAILY_START_DELAY_MINUTES: i64 = 10;
pub const DAILY_ROUND_GAP_MINUTES: i64 = 2;

/// Mid-season classic cadence.
pub const CLASSIC_REGISTRATION_CLOSE_DAY: u8 = 7;
pub const CLASSIC_REGISTRATION_CLOSE_HOUR: u32 = 13;
pub const CLASSIC_FIRST_ROUND_HOUR: u32 = 13;
pub const CLASSIC_FIRST_ROUND_MINUTE: u32 = 30;
pub const CLASSIC_ENTRY_FEE_CREDITS: i64 = 10_000;
pub const CLASSIC_ENTRY_FEE_GEMS: u32 = 20;

/// Playoff cadence: first round at 15:00, later rounds 30 minutes after the
/// previous round's last completion plus a 15-minute match slack.
pub const PLAYOFF_FIRST_ROUND_HOUR: u32 = 15;
pub const PLAYOFF_ROUND_BUFFER_MINUTES: i64 = 30;
pub const PLAYOFF_MATCH_SLACK_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentType {
    DailyDivisional,
    MidSeasonClassic,
    Playoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    Registering,
    Seeded,
    InProgress,
    Completed,
}

/// How a classic entry fee was paid; refunds must return the same currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryFee {
    Credits(i64),
    Gems(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: u32,
    pub tournament_type: TournamentType,
    pub division: u8,
    pub season_number: u32,
    pub status: TournamentStatus,
    pub size: usize,
    /// Current round, 1-based once in progress.
    pub round: u8,
    pub registrants: Vec<u32>,
    /// Entry fees held per registrant, refundable until registration close.
    pub fees: Vec<(u32, EntryFee)>,
    /// Game ids per round once seeded.
    pub bracket: Vec<Vec<u32>>,
    pub registration_opened_at: NaiveDateTime,
    pub registration_closes_at: NaiveDateTime,
    pub first_registration_at: Option<NaiveDateTime>,
    pub scheduled_start: Option<NaiveDateTime>,
}

impl Tournament {
    pub fn is_full(&self) -> bool {
        self.registrants.len() >= self.size
    }

    pub fn accepts_registration(&self, now: NaiveDateTime) -> bool {
        self.status == TournamentStatus::Registering && !self.is_full() && now < self.registration_closes_at
    }

    /// The daily fill timer: 60 minutes after the first registration, the
    /// field is topped up with AI teams.
    pub fn fill_timer_expired(&self, now: NaiveDateTime) -> bool {
        match self.first_registration_at {
            Some(first) => now >= first + chrono::Duration::minutes(DAILY_FILL_TIMER_MINUTES),
            None => false,
        }
    }
}

/// Registration close for a daily tournament opened on `open_date`: 01:00
/// the following civil day.
pub fn daily_registration_close(open_date: chrono::NaiveDate) -> NaiveDateTime {
    (open_date + chrono::Duration::days(1))
        .and_time(NaiveTime::from_hms_opt(DAILY_REGISTRATION_CLOSE_HOUR, 0, 0).unwrap())
}

/// Prize money per tournament type and division, champion and runner-up.
/// Deeper divisions earn less; the classic pays the most.
pub fn prize_table(tournament_type: TournamentType, division: u8) -> ((i64, u32), (i64, u32)) {
    let tier = (9 - division.clamp(1, 8)) as i64;

    match tournament_type {
        TournamentType::DailyDivisional => {
            let champion = (2_500 * tier, tier as u32);
            let runner_up = (1_000 * tier, tier as u32 / 2);
            (champion, runner_up)
        }
        TournamentType::MidSeasonClassic => {
            let champion = (10_000 * tier, 4 * tier as u32);
            let runner_up = (4_000 * tier, 2 * tier as u32);
            (champion, runner_up)
        }
        TournamentType::Playoff => {
            let champion = (6_000 * tier, 2 * tier as u32);
            let runner_up = (2_500 * tier, tier as u32);
            (champion, runner_up)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tournament() -> Tournament {
        Tournament {
            id: 1,
            tournament_type: TournamentType::DailyDivisional,
            division: 5,
            season_number: 1,
            status: TournamentStatus::Registering,
            size: 8,
            round: 0,
            registrants: vec![1, 2],
            fees: Vec::new(),
            bracket: Vec::new(),
            registration_opened_at: at(3, 7, 0),
            registration_closes_at: daily_registration_close(
                NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            ),
            first_registration_at: Some(at(3, 9, 0)),
            scheduled_start: None,
        }
    }

    #[test]
    fn daily_registration_closes_at_one_am_next_day() {
        let close = daily_registration_close(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(at(4, 1, 0), close);
    }

    #[test]
    fn registration_window_respected() {
        let t = tournament();

        assert!(t.accepts_registration(at(3, 12, 0)));
        assert!(!t.accepts_registration(at(4, 1, 0)));
    }

    #[test]
    fn fill_timer_runs_from_first_registration() {
        let t = tournament();

        assert!(!t.fill_timer_expired(at(3, 9, 59)));
        assert!(t.fill_timer_expired(at(3, 10, 0)));
    }

    #[test]
    fn prizes_scale_with_division_and_type() {
        let ((daily_champ, _), _) = prize_table(TournamentType::DailyDivisional, 8);
        let ((classic_champ, _), (classic_runner, _)) =
            prize_table(TournamentType::MidSeasonClassic, 8);

        assert_eq!(2_500, daily_champ);
        assert_eq!(10_000, classic_champ);
        assert_eq!(4_000, classic_runner);

        let ((div2_champ, _), _) = prize_table(TournamentType::DailyDivisional, 2);
        assert!(div2_champ > daily_champ);
    }
}
