// Selection window: how much of a team's qualifying history to analyze.

use std::collections::BTreeSet;

use crate::error::ConfigurationError;
use crate::game::GameRecord;

/// Bound on the qualifying games fed to the aggregator. Selection is always
/// most-recent-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// All qualifying history.
    #[default]
    All,
    /// The N most recent qualifying games.
    LastGames(u32),
    /// Every qualifying game from the N most recent seasons in which the team
    /// has a qualifying game.
    LastSeasons(u32),
}

impl SelectionPolicy {
    /// Resolve configured bounds. A season count takes precedence over a game
    /// count; with neither, all history is used. Zero is rejected.
    pub fn from_bounds(
        num_games: Option<u32>,
        num_seasons: Option<u32>,
    ) -> Result<SelectionPolicy, ConfigurationError> {
        if num_games == Some(0) {
            return Err(ConfigurationError::invalid("num_games", "must be >= 1"));
        }
        if num_seasons == Some(0) {
            return Err(ConfigurationError::invalid("num_seasons", "must be >= 1"));
        }
        Ok(match (num_games, num_seasons) {
            (_, Some(n)) => SelectionPolicy::LastSeasons(n),
            (Some(n), None) => SelectionPolicy::LastGames(n),
            (None, None) => SelectionPolicy::All,
        })
    }

    /// Order `games` most-recent-first and truncate to this window.
    pub fn select(&self, mut games: Vec<GameRecord>) -> Vec<GameRecord> {
        games.sort_by(|a, b| b.datetime.cmp(&a.datetime).then(b.game_id.cmp(&a.game_id)));
        match *self {
            SelectionPolicy::All => games,
            SelectionPolicy::LastGames(n) => {
                games.truncate(n as usize);
                games
            }
            SelectionPolicy::LastSeasons(n) => {
                let mut seasons = BTreeSet::new();
                for g in &games {
                    seasons.insert(std::cmp::Reverse(g.season));
                }
                let keep: BTreeSet<u16> = seasons
                    .into_iter()
                    .take(n as usize)
                    .map(|std::cmp::Reverse(s)| s)
                    .collect();
                games.retain(|g| keep.contains(&g.season));
                games
            }
        }
    }
}
