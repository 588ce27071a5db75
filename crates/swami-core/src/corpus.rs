// Read-only access to the historical game corpus.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::DataError;
use crate::game::{GameRecord, Team, TeamMeta};

/// Source of completed games and team membership. Implementations are
/// read-only for the duration of a prediction; callers sharing one across
/// threads rely on whatever read concurrency the implementation provides.
pub trait GameCorpus {
    /// All completed games involving `team` that started strictly before
    /// `before`. Order is implementation-defined but must be consistent; the
    /// analysis pipeline re-sorts.
    fn find_games(&self, team: &str, before: NaiveDateTime) -> Result<Vec<GameRecord>, DataError>;

    /// Conference and division membership for `team`.
    fn team_meta(&self, team: &str) -> Result<TeamMeta, DataError>;
}

impl<C: GameCorpus + ?Sized> GameCorpus for &C {
    fn find_games(&self, team: &str, before: NaiveDateTime) -> Result<Vec<GameRecord>, DataError> {
        (**self).find_games(team, before)
    }

    fn team_meta(&self, team: &str) -> Result<TeamMeta, DataError> {
        (**self).team_meta(team)
    }
}

impl<C: GameCorpus + ?Sized> GameCorpus for std::sync::Arc<C> {
    fn find_games(&self, team: &str, before: NaiveDateTime) -> Result<Vec<GameRecord>, DataError> {
        (**self).find_games(team, before)
    }

    fn team_meta(&self, team: &str) -> Result<TeamMeta, DataError> {
        (**self).team_meta(team)
    }
}

// ---------------------------------------------------------------------------
// In-memory corpus
// ---------------------------------------------------------------------------

/// A scheduled game with no result yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnplayedGame {
    pub game_id: i64,
    pub datetime: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
}

impl UnplayedGame {
    fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }
}

/// A materialized snapshot of teams and completed games, indexed by team.
/// Immutable after construction, so it can be shared freely across threads.
///
/// Scheduled games registered with `with_unplayed` are never returned; a
/// query whose cutoff falls after one of them fails the same way a live
/// store does.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    teams: HashMap<String, Team>,
    games: Vec<GameRecord>,
    /// Team code -> indices into `games`, in chronological order.
    by_team: HashMap<String, Vec<usize>>,
    /// Chronological.
    unplayed: Vec<UnplayedGame>,
}

impl MemoryCorpus {
    pub fn new(
        teams: impl IntoIterator<Item = Team>,
        games: impl IntoIterator<Item = GameRecord>,
    ) -> Self {
        let teams: HashMap<String, Team> = teams.into_iter().map(|t| (t.code.clone(), t)).collect();

        let mut games: Vec<GameRecord> = games.into_iter().collect();
        games.sort_by(|a, b| a.datetime.cmp(&b.datetime).then(a.game_id.cmp(&b.game_id)));

        let mut by_team: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, game) in games.iter().enumerate() {
            by_team.entry(game.home_team.clone()).or_default().push(idx);
            if game.away_team != game.home_team {
                by_team.entry(game.away_team.clone()).or_default().push(idx);
            }
        }

        MemoryCorpus {
            teams,
            games,
            by_team,
            unplayed: Vec::new(),
        }
    }

    /// Register games that are on the schedule but have no result.
    pub fn with_unplayed(mut self, games: impl IntoIterator<Item = UnplayedGame>) -> Self {
        self.unplayed.extend(games);
        self.unplayed
            .sort_by(|a, b| a.datetime.cmp(&b.datetime).then(a.game_id.cmp(&b.game_id)));
        self
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    pub fn num_games(&self) -> usize {
        self.games.len()
    }

    pub fn num_unplayed(&self) -> usize {
        self.unplayed.len()
    }
}

impl GameCorpus for MemoryCorpus {
    fn find_games(&self, team: &str, before: NaiveDateTime) -> Result<Vec<GameRecord>, DataError> {
        if !self.teams.contains_key(team) {
            return Err(DataError::UnknownTeam(team.to_string()));
        }
        if let Some(gap) = self
            .unplayed
            .iter()
            .take_while(|g| g.datetime < before)
            .find(|g| g.involves(team))
        {
            return Err(DataError::unplayed(gap.game_id));
        }
        let Some(indices) = self.by_team.get(team) else {
            return Ok(Vec::new());
        };
        Ok(indices
            .iter()
            .map(|&i| &self.games[i])
            .take_while(|g| g.datetime < before)
            .cloned()
            .collect())
    }

    fn team_meta(&self, team: &str) -> Result<TeamMeta, DataError> {
        self.teams
            .get(team)
            .map(Team::meta)
            .ok_or_else(|| DataError::UnknownTeam(team.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{game, kickoff, team};

    fn corpus() -> MemoryCorpus {
        MemoryCorpus::new(
            vec![
                team("KC", "AFC", "AFC West"),
                team("LV", "AFC", "AFC West"),
                team("NYG", "NFC", "NFC East"),
            ],
            vec![
                game(3, kickoff(2023, 10, 1), "LV", "KC", 10, 17),
                game(1, kickoff(2023, 9, 10), "KC", "LV", 24, 20),
                game(2, kickoff(2023, 9, 17), "NYG", "LV", 13, 21),
            ],
        )
    }

    #[test]
    fn find_games_is_chronological_and_respects_cutoff() {
        let c = corpus();
        let games = c.find_games("LV", kickoff(2023, 10, 1)).unwrap();
        let ids: Vec<i64> = games.iter().map(|g| g.game_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn find_games_for_team_without_games_is_empty() {
        let c = MemoryCorpus::new(vec![team("KC", "AFC", "AFC West")], vec![]);
        assert!(c.find_games("KC", kickoff(2024, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn unknown_team_is_a_data_error() {
        let c = corpus();
        assert!(matches!(
            c.find_games("XXX", kickoff(2024, 1, 1)),
            Err(DataError::UnknownTeam(code)) if code == "XXX"
        ));
        assert!(c.team_meta("XXX").is_err());
    }

    #[test]
    fn unplayed_game_before_cutoff_fails_lookup() {
        let c = corpus().with_unplayed(vec![UnplayedGame {
            game_id: 4,
            datetime: kickoff(2023, 10, 8),
            home_team: "KC".into(),
            away_team: "NYG".into(),
        }]);
        assert_eq!(c.num_unplayed(), 1);

        // Before the gap, and for a team not in it, lookups still work.
        assert_eq!(c.find_games("KC", kickoff(2023, 10, 8)).unwrap().len(), 2);
        assert_eq!(c.find_games("LV", kickoff(2023, 10, 15)).unwrap().len(), 3);

        let err = c.find_games("NYG", kickoff(2023, 10, 15)).unwrap_err();
        assert!(matches!(err, DataError::Malformed { game_id: 4, .. }));
    }

    #[test]
    fn team_meta_lookup() {
        let c = corpus();
        let meta = c.team_meta("NYG").unwrap();
        assert_eq!(meta.conference, "NFC");
        assert_eq!(meta.division, "NFC East");
    }
}
