use crate::config::CoreConfig;
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

pub const SEASON_LENGTH_DAYS: u8 = 17;
pub const REGULAR_SEASON_LAST_DAY: u8 = 14;
pub const PLAYOFF_DAY: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Regular,
    Playoffs,
    Offseason,
}

impl Phase {
    pub fn of_day(day: u8) -> Phase {
        match day {
            1..=REGULAR_SEASON_LAST_DAY => Phase::Regular,
            PLAYOFF_DAY => Phase::Playoffs,
            _ => Phase::Offseason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameDay {
    pub day: u8,
    pub phase: Phase,
}

/// Civil-time season calendar. A new game day begins at the configured start
/// hour (03:00); all arithmetic is done on naive civil datetimes, so the
/// 03:00 boundary is the first 03:00 that exists on the civil day.
#[derive(Debug, Clone)]
pub struct GameCalendar {
    day_start_hour: u32,
    window_start_hour: u32,
    window_end_hour: u32,
}

impl GameCalendar {
    pub fn new(config: &CoreConfig) -> Self {
        GameCalendar {
            day_start_hour: config.day_start_hour,
            window_start_hour: config.window_start_hour,
            window_end_hour: config.window_end_hour,
        }
    }

    /// The instant the season's day 1 begins: the start hour on the civil
    /// day the season started.
    pub fn season_anchor(&self, season_start: NaiveDateTime) -> NaiveDateTime {
        season_start
            .date()
            .and_time(NaiveTime::from_hms_opt(self.day_start_hour, 0, 0).unwrap())
    }

    /// Day within the season for an instant, clamped to [1, 17]. Instants
    /// before the season anchor map to day 1 pre-roll.
    pub fn game_day(&self, now: NaiveDateTime, season_start: NaiveDateTime) -> GameDay {
        let anchor = self.season_anchor(season_start);

        let day = if now < anchor {
            1
        } else {
            let elapsed_days = (now - anchor).num_days();
            (elapsed_days + 1).clamp(1, SEASON_LENGTH_DAYS as i64) as u8
        };

        GameDay {
            day,
            phase: Phase::of_day(day),
        }
    }

    /// The instant a given day of the season begins.
    pub fn day_start(&self, season_start: NaiveDateTime, day: u8) -> NaiveDateTime {
        self.season_anchor(season_start) + Duration::days(day as i64 - 1)
    }

    /// True once the wall clock has passed the end of the season, i.e. the
    /// boundary where day 17 would roll into the next season's day 1.
    pub fn season_over(&self, now: NaiveDateTime, season_start: NaiveDateTime) -> bool {
        now >= self.season_anchor(season_start) + Duration::days(SEASON_LENGTH_DAYS as i64)
    }

    /// Anchor of the season that follows one started at `season_start`.
    pub fn next_season_start(&self, season_start: NaiveDateTime) -> NaiveDateTime {
        self.season_anchor(season_start) + Duration::days(SEASON_LENGTH_DAYS as i64)
    }

    /// League match simulation window: 16:00-22:00 on days 1-14.
    pub fn in_simulation_window(&self, now: NaiveDateTime, season_start: NaiveDateTime) -> bool {
        let game_day = self.game_day(now, season_start);

        if game_day.phase != Phase::Regular {
            return false;
        }

        let hour = now.time().hour();
        hour >= self.window_start_hour && hour < self.window_end_hour
    }

    /// The simulation window of a given day, as a half-open interval.
    pub fn simulation_window(
        &self,
        season_start: NaiveDateTime,
        day: u8,
    ) -> (NaiveDateTime, NaiveDateTime) {
        let day_start = self.day_start(season_start, day);
        let base = day_start
            .date()
            .and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap());

        (
            base + Duration::hours(self.window_start_hour as i64),
            base + Duration::hours(self.window_end_hour as i64),
        )
    }
}
