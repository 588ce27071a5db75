// Composable game filters.
//
// A filter is declared as a `FilterDescriptor` (a `kind` plus flat
// parameters, straight from configuration), turned into a typed `FilterSpec`
// through the registration table below, and applied from one team's
// perspective. A list of filters is a conjunction; every filter is a per-game
// predicate, so application order does not change the result.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::analysis::stats::aggregate;
use crate::corpus::GameCorpus;
use crate::error::{ConfigurationError, DataError};
use crate::game::{is_playoff_week, GameRecord, MatchupContext, TeamMeta, PLAYOFF_WEEK_BASE};

// ---------------------------------------------------------------------------
// Declarative form
// ---------------------------------------------------------------------------

/// Untyped filter description, e.g. `{ kind = "weeks", first = 1, last = 8 }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterDescriptor {
    pub kind: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl FilterDescriptor {
    pub fn new(kind: &str) -> Self {
        FilterDescriptor {
            kind: kind.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Typed form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    /// Home games, excluding neutral-site games.
    Home,
    /// Road games, excluding neutral-site games.
    Away,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Regular,
    Playoffs,
}

/// The team's role in the historical game's betting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadRole {
    Favorite,
    Underdog,
    Pick,
}

/// Whose season record a `Record` filter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSide {
    /// The team whose history is being narrowed.
    Team,
    /// That team's opponent in the historical game.
    Opponent,
}

/// A validated narrowing rule. Construct through `from_descriptor` or the
/// checked constructors so malformed parameters fail before any corpus access.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    VsTeam { team: String },
    VsDivision { division: String },
    VsConference { conference: String },
    /// Games against the other side of the matchup being predicted.
    VsOpponent,
    /// Games against the matchup opponent's division.
    VsOpponentDivision,
    /// Games against the matchup opponent's conference.
    VsOpponentConference,
    Venue(Venue),
    /// Inclusive regular-season week range.
    Weeks { first: u16, last: u16 },
    Phase(Phase),
    Spread(SpreadRole),
    /// Games where `side`'s season record going into the game falls inside
    /// the inclusive win pct bounds. The record counts every earlier game of
    /// the same season, ties as half a win; before a side's first game of the
    /// season there is no record and the game never matches.
    Record {
        side: RecordSide,
        min_win_pct: Option<f64>,
        max_win_pct: Option<f64>,
    },
}

type FilterBuilder = fn(&Params<'_>) -> Result<FilterSpec, ConfigurationError>;

/// Registered filter kinds. Adding a kind means adding a variant, a builder,
/// and a row here.
const FILTER_KINDS: &[(&str, FilterBuilder)] = &[
    ("vs_team", build_vs_team),
    ("vs_division", build_vs_division),
    ("vs_conference", build_vs_conference),
    ("vs_opponent", build_vs_opponent),
    ("vs_opponent_division", build_vs_opponent_division),
    ("vs_opponent_conference", build_vs_opponent_conference),
    ("venue", build_venue),
    ("weeks", build_weeks),
    ("phase", build_phase),
    ("spread", build_spread),
    ("record", build_record),
];

impl FilterSpec {
    /// Look up the descriptor's kind and validate its parameters.
    pub fn from_descriptor(desc: &FilterDescriptor) -> Result<FilterSpec, ConfigurationError> {
        let builder = FILTER_KINDS
            .iter()
            .find(|(name, _)| *name == desc.kind)
            .map(|(_, builder)| *builder)
            .ok_or_else(|| ConfigurationError::UnknownFilterKind(desc.kind.clone()))?;
        builder(&Params { kind: &desc.kind, map: &desc.params })
    }

    /// Names of all registered filter kinds.
    pub fn kinds() -> impl Iterator<Item = &'static str> {
        FILTER_KINDS.iter().map(|(name, _)| *name)
    }

    pub fn weeks(first: u16, last: u16) -> Result<FilterSpec, ConfigurationError> {
        if first == 0 {
            return Err(ConfigurationError::invalid("weeks.first", "must be >= 1"));
        }
        if last >= PLAYOFF_WEEK_BASE {
            return Err(ConfigurationError::invalid(
                "weeks.last",
                format!("must be < {PLAYOFF_WEEK_BASE}, got {last}"),
            ));
        }
        if first > last {
            return Err(ConfigurationError::invalid(
                "weeks",
                format!("first ({first}) must not exceed last ({last})"),
            ));
        }
        Ok(FilterSpec::Weeks { first, last })
    }

    pub fn record(
        side: RecordSide,
        min_win_pct: Option<f64>,
        max_win_pct: Option<f64>,
    ) -> Result<FilterSpec, ConfigurationError> {
        if min_win_pct.is_none() && max_win_pct.is_none() {
            return Err(ConfigurationError::MissingParameter {
                field: "record.min_win_pct".into(),
            });
        }
        let bounds = [
            ("record.min_win_pct", min_win_pct),
            ("record.max_win_pct", max_win_pct),
        ];
        for (field, bound) in bounds {
            if bound.is_some_and(|b| !(0.0..=1.0).contains(&b)) {
                return Err(ConfigurationError::invalid(field, "must be between 0 and 1"));
            }
        }
        if let (Some(min), Some(max)) = (min_win_pct, max_win_pct) {
            if min > max {
                return Err(ConfigurationError::invalid(
                    "record",
                    format!("min_win_pct ({min}) must not exceed max_win_pct ({max})"),
                ));
            }
        }
        Ok(FilterSpec::Record {
            side,
            min_win_pct,
            max_win_pct,
        })
    }

    pub fn vs_team(team: &str) -> Result<FilterSpec, ConfigurationError> {
        Ok(FilterSpec::VsTeam { team: non_empty("vs_team.team", team)? })
    }

    pub fn vs_division(division: &str) -> Result<FilterSpec, ConfigurationError> {
        Ok(FilterSpec::VsDivision { division: non_empty("vs_division.division", division)? })
    }

    pub fn vs_conference(conference: &str) -> Result<FilterSpec, ConfigurationError> {
        Ok(FilterSpec::VsConference {
            conference: non_empty("vs_conference.conference", conference)?,
        })
    }

    /// Apply this filter to `games` from the scope's team perspective,
    /// preserving input order.
    pub fn apply<C: GameCorpus + ?Sized>(
        &self,
        games: Vec<GameRecord>,
        scope: &FilterScope<'_, C>,
    ) -> Result<Vec<GameRecord>, DataError> {
        let predicate = self.resolve(scope)?;
        let mut lookups = Lookups::default();
        let mut kept = Vec::with_capacity(games.len());
        for game in games {
            if predicate.matches(&game, scope, &mut lookups)? {
                kept.push(game);
            }
        }
        Ok(kept)
    }

    /// Replace matchup-relative variants with concrete values for this side.
    fn resolve<C: GameCorpus + ?Sized>(
        &self,
        scope: &FilterScope<'_, C>,
    ) -> Result<Predicate, DataError> {
        let predicate = match self {
            FilterSpec::VsTeam { team } => Predicate::OpponentIs(team.clone()),
            FilterSpec::VsDivision { division } => Predicate::OpponentDivision(division.clone()),
            FilterSpec::VsConference { conference } => {
                Predicate::OpponentConference(conference.clone())
            }
            FilterSpec::VsOpponent => Predicate::OpponentIs(scope.matchup_opponent()?.to_string()),
            FilterSpec::VsOpponentDivision => {
                let meta = scope.corpus.team_meta(scope.matchup_opponent()?)?;
                Predicate::OpponentDivision(meta.division)
            }
            FilterSpec::VsOpponentConference => {
                let meta = scope.corpus.team_meta(scope.matchup_opponent()?)?;
                Predicate::OpponentConference(meta.conference)
            }
            FilterSpec::Venue(v) => Predicate::Venue(*v),
            FilterSpec::Weeks { first, last } => Predicate::Weeks(*first, *last),
            FilterSpec::Phase(p) => Predicate::Phase(*p),
            FilterSpec::Spread(role) => Predicate::Spread(*role),
            FilterSpec::Record {
                side,
                min_win_pct,
                max_win_pct,
            } => Predicate::Record {
                side: *side,
                min: min_win_pct.unwrap_or(0.0),
                max: max_win_pct.unwrap_or(1.0),
            },
        };
        Ok(predicate)
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Everything a filter needs to evaluate a game for one side of a matchup.
pub struct FilterScope<'a, C: ?Sized> {
    pub context: &'a MatchupContext,
    /// The team whose history is being narrowed.
    pub team: &'a str,
    pub corpus: &'a C,
}

impl<'a, C: GameCorpus + ?Sized> FilterScope<'a, C> {
    pub fn new(context: &'a MatchupContext, team: &'a str, corpus: &'a C) -> Self {
        FilterScope { context, team, corpus }
    }

    fn matchup_opponent(&self) -> Result<&'a str, DataError> {
        self.context
            .opponent_of(self.team)
            .ok_or_else(|| DataError::UnknownTeam(self.team.to_string()))
    }
}

/// Concrete per-game predicate for one side.
#[derive(Debug)]
enum Predicate {
    OpponentIs(String),
    OpponentDivision(String),
    OpponentConference(String),
    Venue(Venue),
    Weeks(u16, u16),
    Phase(Phase),
    Spread(SpreadRole),
    Record { side: RecordSide, min: f64, max: f64 },
}

/// Corpus lookups memoized across one filter application.
#[derive(Default)]
struct Lookups {
    metas: HashMap<String, TeamMeta>,
    /// (team, game_id) -> season win pct going into that game.
    records: HashMap<(String, i64), Option<f64>>,
}

impl Predicate {
    fn matches<C: GameCorpus + ?Sized>(
        &self,
        game: &GameRecord,
        scope: &FilterScope<'_, C>,
        lookups: &mut Lookups,
    ) -> Result<bool, DataError> {
        let Some(view) = game.view(scope.team) else {
            return Ok(false);
        };
        let matched = match self {
            Predicate::OpponentIs(team) => view.opponent() == team,
            Predicate::OpponentDivision(division) => {
                opponent_meta(view.opponent(), scope, lookups)?.division == *division
            }
            Predicate::OpponentConference(conference) => {
                opponent_meta(view.opponent(), scope, lookups)?.conference == *conference
            }
            Predicate::Venue(Venue::Neutral) => game.neutral_site,
            Predicate::Venue(Venue::Home) => !game.neutral_site && view.is_home,
            Predicate::Venue(Venue::Away) => !game.neutral_site && !view.is_home,
            Predicate::Weeks(first, last) => (*first..=*last).contains(&game.week),
            Predicate::Phase(Phase::Regular) => !is_playoff_week(game.week),
            Predicate::Phase(Phase::Playoffs) => is_playoff_week(game.week),
            Predicate::Spread(role) => match view.spread() {
                None => false,
                Some(s) => match role {
                    SpreadRole::Favorite => s < 0.0,
                    SpreadRole::Underdog => s > 0.0,
                    SpreadRole::Pick => s == 0.0,
                },
            },
            Predicate::Record { side, min, max } => {
                let team = match side {
                    RecordSide::Team => scope.team,
                    RecordSide::Opponent => view.opponent(),
                };
                match season_win_pct(team, game, scope, lookups)? {
                    Some(pct) => (*min..=*max).contains(&pct),
                    None => false,
                }
            }
        };
        Ok(matched)
    }
}

fn opponent_meta<'m, C: GameCorpus + ?Sized>(
    opponent: &str,
    scope: &FilterScope<'_, C>,
    lookups: &'m mut Lookups,
) -> Result<&'m TeamMeta, DataError> {
    if !lookups.metas.contains_key(opponent) {
        let meta = scope.corpus.team_meta(opponent)?;
        lookups.metas.insert(opponent.to_string(), meta);
    }
    lookups
        .metas
        .get(opponent)
        .ok_or_else(|| DataError::UnknownTeam(opponent.to_string()))
}

/// `team`'s win pct over its games of `game`'s season that kicked off before
/// `game`. `None` when there are none.
fn season_win_pct<C: GameCorpus + ?Sized>(
    team: &str,
    game: &GameRecord,
    scope: &FilterScope<'_, C>,
    lookups: &mut Lookups,
) -> Result<Option<f64>, DataError> {
    let key = (team.to_string(), game.game_id);
    if let Some(pct) = lookups.records.get(&key) {
        return Ok(*pct);
    }
    let earlier: Vec<GameRecord> = scope
        .corpus
        .find_games(team, game.datetime)?
        .into_iter()
        .filter(|g| g.season == game.season)
        .collect();
    let stats = aggregate(earlier, team);
    let pct = (!stats.is_empty()).then(|| stats.win_pct());
    lookups.records.insert(key, pct);
    Ok(pct)
}

/// Drop every game not strictly before `cutoff`. Always applied ahead of
/// any configured filter.
pub fn apply_cutoff(games: Vec<GameRecord>, cutoff: NaiveDateTime) -> Vec<GameRecord> {
    games.into_iter().filter(|g| g.datetime < cutoff).collect()
}

/// Cutoff, then the team-membership check, then each filter in turn. An
/// empty filter list only applies the cutoff.
pub fn apply_all<C: GameCorpus + ?Sized>(
    games: Vec<GameRecord>,
    specs: &[FilterSpec],
    scope: &FilterScope<'_, C>,
) -> Result<Vec<GameRecord>, DataError> {
    let mut games: Vec<GameRecord> = apply_cutoff(games, scope.context.cutoff)
        .into_iter()
        .filter(|g| g.involves(scope.team))
        .collect();
    for spec in specs {
        games = spec.apply(games, scope)?;
    }
    Ok(games)
}

// ---------------------------------------------------------------------------
// Parameter access and builders
// ---------------------------------------------------------------------------

struct Params<'a> {
    kind: &'a str,
    map: &'a BTreeMap<String, serde_json::Value>,
}

impl Params<'_> {
    fn field(&self, key: &str) -> String {
        format!("{}.{}", self.kind, key)
    }

    fn value(&self, key: &str) -> Result<&serde_json::Value, ConfigurationError> {
        self.map
            .get(key)
            .ok_or_else(|| ConfigurationError::MissingParameter { field: self.field(key) })
    }

    fn string(&self, key: &str) -> Result<&str, ConfigurationError> {
        self.value(key)?
            .as_str()
            .ok_or_else(|| ConfigurationError::invalid(&self.field(key), "expected a string"))
    }

    /// An optional fraction in [0, 1].
    fn pct(&self, key: &str) -> Result<Option<f64>, ConfigurationError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| ConfigurationError::invalid(&self.field(key), "expected a number")),
        }
    }

    fn week(&self, key: &str) -> Result<u16, ConfigurationError> {
        self.value(key)?
            .as_u64()
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(|| {
                ConfigurationError::invalid(&self.field(key), "expected a positive week number")
            })
    }

    /// Reject parameters the kind does not take, so typos fail loudly.
    fn only(&self, allowed: &[&str]) -> Result<(), ConfigurationError> {
        match self.map.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(extra) => Err(ConfigurationError::invalid(
                &self.field(extra),
                "unexpected parameter",
            )),
            None => Ok(()),
        }
    }
}

fn non_empty(field: &str, value: &str) -> Result<String, ConfigurationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigurationError::invalid(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn build_vs_team(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["team"])?;
    FilterSpec::vs_team(p.string("team")?)
}

fn build_vs_division(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["division"])?;
    FilterSpec::vs_division(p.string("division")?)
}

fn build_vs_conference(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["conference"])?;
    FilterSpec::vs_conference(p.string("conference")?)
}

fn build_vs_opponent(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&[])?;
    Ok(FilterSpec::VsOpponent)
}

fn build_vs_opponent_division(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&[])?;
    Ok(FilterSpec::VsOpponentDivision)
}

fn build_vs_opponent_conference(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&[])?;
    Ok(FilterSpec::VsOpponentConference)
}

fn build_venue(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["venue"])?;
    let venue = match p.string("venue")? {
        "home" => Venue::Home,
        "away" => Venue::Away,
        "neutral" => Venue::Neutral,
        other => {
            return Err(ConfigurationError::invalid(
                &p.field("venue"),
                format!("expected home, away, or neutral, got `{other}`"),
            ))
        }
    };
    Ok(FilterSpec::Venue(venue))
}

fn build_weeks(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["first", "last"])?;
    FilterSpec::weeks(p.week("first")?, p.week("last")?)
}

fn build_phase(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["phase"])?;
    let phase = match p.string("phase")? {
        "regular" => Phase::Regular,
        "playoffs" => Phase::Playoffs,
        other => {
            return Err(ConfigurationError::invalid(
                &p.field("phase"),
                format!("expected regular or playoffs, got `{other}`"),
            ))
        }
    };
    Ok(FilterSpec::Phase(phase))
}

fn build_spread(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["role"])?;
    let role = match p.string("role")? {
        "favorite" => SpreadRole::Favorite,
        "underdog" => SpreadRole::Underdog,
        "pick" => SpreadRole::Pick,
        other => {
            return Err(ConfigurationError::invalid(
                &p.field("role"),
                format!("expected favorite, underdog, or pick, got `{other}`"),
            ))
        }
    };
    Ok(FilterSpec::Spread(role))
}

fn build_record(p: &Params<'_>) -> Result<FilterSpec, ConfigurationError> {
    p.only(&["side", "min_win_pct", "max_win_pct"])?;
    let side = match p.string("side")? {
        "team" => RecordSide::Team,
        "opponent" => RecordSide::Opponent,
        other => {
            return Err(ConfigurationError::invalid(
                &p.field("side"),
                format!("expected team or opponent, got `{other}`"),
            ))
        }
    };
    FilterSpec::record(side, p.pct("min_win_pct")?, p.pct("max_win_pct")?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MemoryCorpus;
    use crate::game::testing::{game, kickoff, team};
    use crate::game::WEEK_WILD_CARD;

    fn teams() -> Vec<crate::game::Team> {
        vec![
            team("KC", "AFC", "AFC West"),
            team("LV", "AFC", "AFC West"),
            team("BUF", "AFC", "AFC East"),
            team("PHI", "NFC", "NFC East"),
            team("DAL", "NFC", "NFC East"),
        ]
    }

    fn context(home: &str, away: &str) -> MatchupContext {
        MatchupContext {
            game_id: None,
            season: 2023,
            week: 12,
            home_team: home.into(),
            away_team: away.into(),
            cutoff: kickoff(2023, 11, 26),
            pt_spread: None,
            over_under: None,
            neutral_site: false,
        }
    }

    /// KC's history: vs LV (home), at BUF, vs PHI (neutral), at LV, a
    /// playoff game vs BUF, and one game after the cutoff.
    fn kc_history() -> Vec<GameRecord> {
        let mut neutral = game(3, kickoff(2023, 10, 1), "PHI", "KC", 20, 27);
        neutral.neutral_site = true;
        neutral.week = 4;
        let mut g1 = game(1, kickoff(2023, 9, 10), "KC", "LV", 24, 20);
        g1.week = 1;
        g1.pt_spread = Some(-6.5);
        let mut g2 = game(2, kickoff(2023, 9, 17), "BUF", "KC", 31, 17);
        g2.week = 2;
        g2.pt_spread = Some(-2.5);
        let mut g4 = game(4, kickoff(2023, 10, 8), "LV", "KC", 10, 13);
        g4.week = 5;
        g4.pt_spread = Some(0.0);
        let mut g5 = game(5, kickoff(2023, 1, 15), "KC", "BUF", 30, 24);
        g5.week = WEEK_WILD_CARD;
        let g6 = game(6, kickoff(2023, 12, 3), "KC", "DAL", 30, 24);
        vec![g1, g2, neutral, g4, g5, g6]
    }

    fn invalid_field(err: &ConfigurationError) -> Option<&str> {
        match err {
            ConfigurationError::InvalidParameter { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    fn ids(games: &[GameRecord]) -> Vec<i64> {
        games.iter().map(|g| g.game_id).collect()
    }

    fn run(specs: &[FilterSpec], ctx: &MatchupContext, team: &str) -> Vec<i64> {
        let corpus = MemoryCorpus::new(teams(), vec![]);
        let scope = FilterScope::new(ctx, team, &corpus);
        ids(&apply_all(kc_history(), specs, &scope).unwrap())
    }

    #[test]
    fn empty_filter_list_only_applies_cutoff() {
        let ctx = context("KC", "DAL");
        assert_eq!(run(&[], &ctx, "KC"), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn cutoff_excludes_games_on_the_cutoff_instant() {
        let mut ctx = context("KC", "DAL");
        ctx.cutoff = kickoff(2023, 10, 1);
        let result = run(&[], &ctx, "KC");
        assert_eq!(result, vec![1, 2, 5]);
    }

    #[test]
    fn venue_filters_exclude_neutral_sites() {
        let ctx = context("KC", "DAL");
        assert_eq!(run(&[FilterSpec::Venue(Venue::Home)], &ctx, "KC"), vec![1, 5]);
        assert_eq!(run(&[FilterSpec::Venue(Venue::Away)], &ctx, "KC"), vec![2, 4]);
        assert_eq!(run(&[FilterSpec::Venue(Venue::Neutral)], &ctx, "KC"), vec![3]);
    }

    #[test]
    fn fixed_opponent_filters() {
        let ctx = context("KC", "DAL");
        assert_eq!(run(&[FilterSpec::vs_team("LV").unwrap()], &ctx, "KC"), vec![1, 4]);
        assert_eq!(run(&[FilterSpec::vs_division("AFC East").unwrap()], &ctx, "KC"), vec![2, 5]);
        assert_eq!(run(&[FilterSpec::vs_conference("NFC").unwrap()], &ctx, "KC"), vec![3]);
    }

    #[test]
    fn relative_filters_resolve_against_matchup_opponent() {
        // Predicting KC vs LV: KC's games against LV, and against LV's division.
        let ctx = context("KC", "LV");
        assert_eq!(run(&[FilterSpec::VsOpponent], &ctx, "KC"), vec![1, 4]);
        assert_eq!(run(&[FilterSpec::VsOpponentDivision], &ctx, "KC"), vec![1, 4]);
        assert_eq!(run(&[FilterSpec::VsOpponentConference], &ctx, "KC"), vec![1, 2, 4, 5]);

        // Against PHI the opponent's division is the NFC East.
        let ctx = context("PHI", "KC");
        assert_eq!(run(&[FilterSpec::VsOpponentDivision], &ctx, "KC"), vec![3]);
    }

    #[test]
    fn relative_filter_for_team_outside_matchup_is_error() {
        let ctx = context("PHI", "DAL");
        let corpus = MemoryCorpus::new(teams(), vec![]);
        let scope = FilterScope::new(&ctx, "KC", &corpus);
        let err = apply_all(kc_history(), &[FilterSpec::VsOpponent], &scope).unwrap_err();
        assert!(matches!(err, DataError::UnknownTeam(_)));
    }

    #[test]
    fn week_and_phase_filters() {
        let ctx = context("KC", "DAL");
        assert_eq!(run(&[FilterSpec::weeks(2, 4).unwrap()], &ctx, "KC"), vec![2, 3]);
        assert_eq!(run(&[FilterSpec::Phase(Phase::Playoffs)], &ctx, "KC"), vec![5]);
        assert_eq!(run(&[FilterSpec::Phase(Phase::Regular)], &ctx, "KC"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn spread_filter_is_team_relative() {
        let ctx = context("KC", "DAL");
        // Game 1: KC home at -6.5 (favorite). Game 2: BUF home at -2.5, so KC +2.5.
        assert_eq!(run(&[FilterSpec::Spread(SpreadRole::Favorite)], &ctx, "KC"), vec![1]);
        assert_eq!(run(&[FilterSpec::Spread(SpreadRole::Underdog)], &ctx, "KC"), vec![2]);
        assert_eq!(run(&[FilterSpec::Spread(SpreadRole::Pick)], &ctx, "KC"), vec![4]);
    }

    #[test]
    fn composition_is_order_independent() {
        let ctx = context("KC", "LV");
        let a = FilterSpec::Venue(Venue::Away);
        let b = FilterSpec::VsOpponentConference;
        let c = FilterSpec::weeks(1, 10).unwrap();
        let forward = run(&[a.clone(), b.clone(), c.clone()], &ctx, "KC");
        let backward = run(&[c, b, a], &ctx, "KC");
        assert_eq!(forward, backward);
        assert_eq!(forward, vec![2, 4]);
    }

    #[test]
    fn descriptor_lookup_builds_typed_specs() {
        let spec = FilterSpec::from_descriptor(
            &FilterDescriptor::new("weeks").with("first", 1).with("last", 8),
        )
        .unwrap();
        assert_eq!(spec, FilterSpec::Weeks { first: 1, last: 8 });

        let spec =
            FilterSpec::from_descriptor(&FilterDescriptor::new("venue").with("venue", "home"))
                .unwrap();
        assert_eq!(spec, FilterSpec::Venue(Venue::Home));

        let spec =
            FilterSpec::from_descriptor(&FilterDescriptor::new("vs_opponent_division")).unwrap();
        assert_eq!(spec, FilterSpec::VsOpponentDivision);
    }

    #[test]
    fn unknown_kind_is_configuration_error() {
        let err = FilterSpec::from_descriptor(&FilterDescriptor::new("vs_mascot")).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownFilterKind("vs_mascot".into()));
    }

    #[test]
    fn invalid_parameters_fail_at_construction() {
        let weeks = |first: u16, last: u16| {
            FilterSpec::from_descriptor(
                &FilterDescriptor::new("weeks").with("first", first).with("last", last),
            )
        };
        let err = weeks(9, 3).unwrap_err();
        assert_eq!(invalid_field(&err), Some("weeks"));
        let err = weeks(0, 3).unwrap_err();
        assert_eq!(invalid_field(&err), Some("weeks.first"));

        let err = FilterSpec::from_descriptor(&FilterDescriptor::new("venue")).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingParameter { field: "venue.venue".into() });

        let err = FilterSpec::from_descriptor(&FilterDescriptor::new("venue").with("venue", "moon"))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidParameter { .. }));

        let err =
            FilterSpec::from_descriptor(&FilterDescriptor::new("vs_opponent").with("team", "KC"))
                .unwrap_err();
        assert_eq!(invalid_field(&err), Some("vs_opponent.team"));

        assert!(FilterSpec::vs_team("  ").is_err());
    }

    #[test]
    fn every_registered_kind_is_reachable() {
        let kinds: Vec<&str> = FilterSpec::kinds().collect();
        assert_eq!(kinds.len(), 11);
        assert!(kinds.contains(&"vs_opponent_conference"));
        assert!(kinds.contains(&"record"));
    }

    // ------------------------------------------------------------------
    // Season records
    // ------------------------------------------------------------------

    /// KC opens 2023 beating LV and losing at BUF, then beats LV and BUF.
    /// BUF beats LV in between. One 2022 KC loss precedes it all.
    fn records_league() -> MemoryCorpus {
        MemoryCorpus::new(
            teams(),
            vec![
                game(10, kickoff(2022, 12, 4), "KC", "LV", 10, 40),
                game(11, kickoff(2023, 9, 10), "KC", "LV", 24, 20),
                game(12, kickoff(2023, 9, 17), "BUF", "KC", 31, 17),
                game(13, kickoff(2023, 9, 24), "LV", "BUF", 10, 20),
                game(14, kickoff(2023, 10, 1), "KC", "LV", 27, 13),
                game(15, kickoff(2023, 10, 8), "BUF", "KC", 24, 30),
            ],
        )
    }

    fn run_records(spec: FilterSpec, team: &str) -> Vec<i64> {
        let corpus = records_league();
        let ctx = context("KC", "LV");
        let history = corpus.find_games(team, ctx.cutoff).unwrap();
        let scope = FilterScope::new(&ctx, team, &corpus);
        ids(&apply_all(history, &[spec], &scope).unwrap())
    }

    #[test]
    fn record_filter_reads_the_teams_own_season_record() {
        // Going in, KC was: none (2022), none, 1-0, 1-1, 2-1.
        let winning = FilterSpec::record(RecordSide::Team, Some(0.5), None).unwrap();
        assert_eq!(run_records(winning, "KC"), vec![12, 14, 15]);

        let unbeaten = FilterSpec::record(RecordSide::Team, Some(1.0), None).unwrap();
        assert_eq!(run_records(unbeaten, "KC"), vec![12]);
    }

    #[test]
    fn record_filter_reads_the_opponent_from_each_side() {
        // KC's opponents going in: LV none, LV none, BUF none, LV 0-2, BUF 2-0.
        let strong = FilterSpec::record(RecordSide::Opponent, Some(0.5), None).unwrap();
        assert_eq!(run_records(strong.clone(), "KC"), vec![15]);
        let weak = FilterSpec::record(RecordSide::Opponent, None, Some(0.25)).unwrap();
        assert_eq!(run_records(weak, "KC"), vec![14]);

        // LV's opponents going in: KC none, KC none, BUF 1-0, KC 1-1.
        assert_eq!(run_records(strong, "LV"), vec![13, 14]);
    }

    #[test]
    fn record_descriptor_validation() {
        let spec = FilterSpec::from_descriptor(
            &FilterDescriptor::new("record").with("side", "opponent").with("min_win_pct", 0.5),
        )
        .unwrap();
        assert_eq!(
            spec,
            FilterSpec::Record {
                side: RecordSide::Opponent,
                min_win_pct: Some(0.5),
                max_win_pct: None,
            }
        );

        let err = FilterSpec::from_descriptor(&FilterDescriptor::new("record").with("side", "team"))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingParameter { field: "record.min_win_pct".into() }
        );

        let err = FilterSpec::record(RecordSide::Team, Some(1.5), None).unwrap_err();
        assert_eq!(invalid_field(&err), Some("record.min_win_pct"));
        let err = FilterSpec::record(RecordSide::Team, Some(0.75), Some(0.25)).unwrap_err();
        assert_eq!(invalid_field(&err), Some("record"));

        let err = FilterSpec::from_descriptor(
            &FilterDescriptor::new("record").with("side", "coach").with("max_win_pct", 0.5),
        )
        .unwrap_err();
        assert_eq!(invalid_field(&err), Some("record.side"));
    }
}
