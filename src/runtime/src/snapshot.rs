use core::club::Player;
use core::error::CoreResult;
use core::r#match::{derive_match_seed, Game, MatchInput, TeamSheet};
use store::Tx;

/// Build the immutable simulation input for a game from durable state.
/// Taxi-squad and retired players never dress for a match.
pub fn build_match_input(tx: &Tx, game: &Game, seed: u64) -> CoreResult<MatchInput> {
    let home_team = tx.team(game.home_team_id)?.clone();
    let away_team = tx.team(game.away_team_id)?.clone();

    fn dressed(players: Vec<&Player>) -> Vec<&Player> {
        players
            .into_iter()
            .filter(|p| !p.retired && !p.on_taxi_squad)
            .collect()
    }

    let home_roster = dressed(tx.players_of_team(game.home_team_id));
    let away_roster = dressed(tx.players_of_team(game.away_team_id));

    Ok(MatchInput {
        game_id: game.id,
        match_type: game.match_type,
        home: TeamSheet::from_team(&home_team, &home_roster),
        away: TeamSheet::from_team(&away_team, &away_roster),
        field_size: home_team.home_field_size,
        seed,
    })
}

/// Seed for a game, derived from the stored seed when the game already
/// started once (recovery) or freshly from the deterministic mix.
pub fn seed_for_game(tx: &Tx, game: &Game) -> CoreResult<u64> {
    if let Some(seed) = game.seed {
        return Ok(seed);
    }

    let season = tx.current_season()?;
    Ok(derive_match_seed(game.id, season.number, tx.boot_nonce()))
}

/// A match needs six fieldable dressed players per side; short sides
/// forfeit. Returns the winner by forfeit, or None when the match can be
/// played (or neither side can field - the home side is awarded those).
pub fn forfeit_winner(tx: &Tx, game: &Game) -> CoreResult<Option<u32>> {
    let fieldable = |team_id: u32| -> usize {
        tx.players_of_team(team_id)
            .iter()
            .filter(|p| !p.retired && !p.on_taxi_squad && p.is_fieldable())
            .count()
    };

    let home_ok = fieldable(game.home_team_id) >= core::club::FIELD_PLAYERS;
    let away_ok = fieldable(game.away_team_id) >= core::club::FIELD_PLAYERS;

    Ok(match (home_ok, away_ok) {
        (true, true) => None,
        (true, false) => Some(game.home_team_id),
        (false, true) => Some(game.away_team_id),
        (false, false) => Some(game.home_team_id),
    })
}
