use crate::ledger::LedgerEntry;
use core::club::{Player, Staff, Team, TeamFinances};
use core::league::Season;
use core::marketplace::MarketplaceListing;
use core::r#match::{Game, MatchCheckpoint, MatchEvent};
use core::tournament::Tournament;
use std::collections::{BTreeMap, BTreeSet};

/// The durable world. Ordered maps keep every scan deterministic. Cloned
/// wholesale into a staging copy per transaction; a transaction that errors
/// never leaves a partial write behind.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub seasons: Vec<Season>,
    pub teams: BTreeMap<u32, Team>,
    pub finances: BTreeMap<u32, TeamFinances>,
    pub players: BTreeMap<u32, Player>,
    pub staff: BTreeMap<u32, Staff>,
    pub games: BTreeMap<u32, Game>,
    pub tournaments: BTreeMap<u32, Tournament>,
    pub listings: BTreeMap<u32, MarketplaceListing>,
    pub ledger: Vec<LedgerEntry>,
    pub checkpoints: BTreeMap<u32, MatchCheckpoint>,
    /// Stored event logs per completed game.
    pub match_events: BTreeMap<u32, Vec<MatchEvent>>,
    /// Idempotence markers: (season_number, day, step).
    pub day_markers: BTreeSet<(u32, u8, String)>,
    /// Final tables archived at rollover: (season_number, division,
    /// subdivision) -> ordered rows.
    pub standings_archive: BTreeMap<(u32, u8, String), Vec<core::league::StandingRow>>,
    /// Daily limits, cleared by the daily-limits step.
    pub exhibitions_today: BTreeMap<u32, u8>,
    pub tournament_entries_today: BTreeMap<u32, u8>,
    /// Chosen once at season creation; part of the deterministic match-seed
    /// derivation.
    pub boot_nonce: u64,

    pub next_team_id: u32,
    pub next_player_id: u32,
    pub next_staff_id: u32,
    pub next_game_id: u32,
    pub next_tournament_id: u32,
    pub next_listing_id: u32,
    pub next_ledger_id: u64,
    pub next_season_id: u32,
}

impl World {
    pub fn new(boot_nonce: u64) -> Self {
        World {
            boot_nonce,
            next_team_id: 1,
            next_player_id: 1,
            next_staff_id: 1,
            next_game_id: 1,
            next_tournament_id: 1,
            next_listing_id: 1,
            next_ledger_id: 1,
            next_season_id: 1,
            ..World::default()
        }
    }

    /// The one non-archived season.
    pub fn current_season(&self) -> Option<&Season> {
        self.seasons.iter().rev().find(|s| !s.archived)
    }
}
