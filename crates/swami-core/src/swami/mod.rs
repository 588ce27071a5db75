// Swami orchestration: bind a selection policy, filters, criteria, and a
// tie-break policy, and turn a matchup into a pick.
//
// A prediction moves through fixed stages (idle, selecting, analyzed,
// decided, pick-emitted). Any failure ends that one request; the corpus is
// only ever read.

pub mod params;

pub use params::SwamiParams;

use tracing::{debug, debug_span};

use crate::analysis::criteria::{CriteriaComparator, Criterion, CriterionOutcome};
use crate::analysis::engine::{compute, MatchupStats};
use crate::analysis::filter::{FilterDescriptor, FilterSpec};
use crate::analysis::selection::SelectionPolicy;
use crate::corpus::GameCorpus;
use crate::error::{ConfigurationError, PredictError, Stage};
use crate::game::MatchupContext;
use crate::pick::{Pick, Prediction};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// The prediction algorithm a swami class is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Recent games against anyone.
    VsAll,
    /// Recent games against the matchup opponent.
    VsTeam,
    /// Recent games against the matchup opponent's division.
    VsDivision,
    /// Recent games against the matchup opponent's conference.
    VsConference,
    /// Follow the betting line; no analysis.
    LasVegas,
}

const STRATEGIES: &[(&str, Strategy)] = &[
    ("vs_all", Strategy::VsAll),
    ("vs_team", Strategy::VsTeam),
    ("vs_division", Strategy::VsDivision),
    ("vs_conference", Strategy::VsConference),
    ("las_vegas", Strategy::LasVegas),
];

impl Strategy {
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        STRATEGIES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| *s)
            .ok_or_else(|| ConfigurationError::UnknownStrategy(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        STRATEGIES
            .iter()
            .find(|(_, s)| *s == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// The opponent-relative filter this strategy adds to the configured ones.
    fn opponent_filter(self) -> Option<FilterSpec> {
        match self {
            Strategy::VsTeam => Some(FilterSpec::VsOpponent),
            Strategy::VsDivision => Some(FilterSpec::VsOpponentDivision),
            Strategy::VsConference => Some(FilterSpec::VsOpponentConference),
            Strategy::VsAll | Strategy::LasVegas => None,
        }
    }

    fn uses_analysis(self) -> bool {
        self != Strategy::LasVegas
    }
}

// ---------------------------------------------------------------------------
// Tie-break policy
// ---------------------------------------------------------------------------

/// What to do when every criterion ties (or the line is a pick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Pick the home team.
    #[default]
    HomeTeam,
    /// Pick the side with the higher qualifying win percentage; home team if
    /// that is also level.
    BetterRecord,
    /// Emit no pick.
    NoDecision,
}

impl TieBreak {
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        match name {
            "home_team" => Ok(TieBreak::HomeTeam),
            "better_record" => Ok(TieBreak::BetterRecord),
            "no_decision" => Ok(TieBreak::NoDecision),
            other => Err(ConfigurationError::UnknownTieBreak(other.to_string())),
        }
    }

    fn resolve(self, stats: Option<&MatchupStats>) -> Option<Side> {
        match self {
            TieBreak::HomeTeam => Some(Side::Home),
            TieBreak::NoDecision => None,
            TieBreak::BetterRecord => match stats {
                Some(s) if s.away.win_pct() > s.home.win_pct() => Some(Side::Away),
                _ => Some(Side::Home),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
}

// ---------------------------------------------------------------------------
// Swami
// ---------------------------------------------------------------------------

/// A configured predictor.
#[derive(Debug, Clone)]
pub struct Swami {
    name: String,
    about_me: Option<String>,
    strategy: Strategy,
    policy: SelectionPolicy,
    filters: Vec<FilterSpec>,
    comparator: CriteriaComparator,
    tie_break: TieBreak,
}

impl Swami {
    /// Build a swami from fully merged parameters, validating every name and
    /// bound up front.
    pub fn build(name: &str, params: &SwamiParams) -> Result<Swami, ConfigurationError> {
        let strategy_name = params
            .strategy
            .as_deref()
            .ok_or_else(|| ConfigurationError::MissingParameter { field: "strategy".into() })?;
        let strategy = Strategy::from_name(strategy_name)?;

        let policy = SelectionPolicy::from_bounds(params.num_games, params.num_seasons)?;

        let criteria: &[String] = params.criteria.as_deref().unwrap_or(&[]);
        let comparator = CriteriaComparator::from_names(criteria)?;
        if strategy.uses_analysis() && comparator.is_empty() {
            return Err(ConfigurationError::MissingParameter { field: "criteria".into() });
        }

        let descriptors: &[FilterDescriptor] = params.filters.as_deref().unwrap_or(&[]);
        let filters = descriptors
            .iter()
            .map(FilterSpec::from_descriptor)
            .collect::<Result<Vec<_>, _>>()?;

        let tie_break = match params.tie_break.as_deref() {
            Some(n) => TieBreak::from_name(n)?,
            None => TieBreak::default(),
        };

        Ok(Swami {
            name: name.to_string(),
            about_me: params.about_me.clone(),
            strategy,
            policy,
            filters,
            comparator,
            tie_break,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about_me(&self) -> Option<&str> {
        self.about_me.as_deref()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn criteria(&self) -> &[Criterion] {
        self.comparator.criteria()
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Configured filters plus the strategy's opponent filter.
    pub fn filters(&self) -> Vec<FilterSpec> {
        let mut filters = self.filters.clone();
        filters.extend(self.strategy.opponent_filter());
        filters
    }

    /// Predict the matchup.
    pub fn predict<C: GameCorpus + ?Sized>(
        &self,
        corpus: &C,
        context: &MatchupContext,
    ) -> Result<Prediction, PredictError> {
        let span = debug_span!("predict", swami = %self.name, matchup = %context.label());
        let _guard = span.enter();
        debug!(stage = %Stage::Idle, strategy = self.strategy.name(), "prediction requested");

        if self.strategy == Strategy::LasVegas {
            let prediction = self.follow_the_line(context);
            debug!(stage = %Stage::PickEmitted, %prediction, "pick emitted");
            return Ok(prediction);
        }

        debug!(stage = %Stage::Selecting, policy = ?self.policy, "selecting games");
        let stats = compute(corpus, context, &self.filters(), self.policy)
            .map_err(|source| PredictError { stage: Stage::Selecting, source })?;
        debug!(
            stage = %Stage::Analyzed,
            home = %stats.home.record(),
            away = %stats.away.record(),
            "statistics ready"
        );

        let comparison = self.comparator.compare_detailed(&stats.home, &stats.away);
        let favored = match comparison.outcome {
            CriterionOutcome::FavorsA => Some(Side::Home),
            CriterionOutcome::FavorsB => Some(Side::Away),
            CriterionOutcome::Tie => self.tie_break.resolve(Some(&stats)),
        };
        debug!(
            stage = %Stage::Decided,
            outcome = ?comparison.outcome,
            decided_by = comparison.decided_by.map(Criterion::name).unwrap_or("tie-break"),
            "comparison decided"
        );

        let prediction = match favored {
            Some(side) => Prediction::Pick(derive_pick(context, &stats, side)),
            None => Prediction::NoDecision,
        };
        debug!(stage = %Stage::PickEmitted, %prediction, "pick emitted");
        Ok(prediction)
    }

    /// Las Vegas: the favorite by the line, total from the over/under.
    fn follow_the_line(&self, context: &MatchupContext) -> Prediction {
        let total = context.over_under.map(round_pts).unwrap_or(0);
        let (side, margin) = match context.pt_spread {
            Some(s) if s < 0.0 => (Some(Side::Home), -s),
            Some(s) if s > 0.0 => (Some(Side::Away), s),
            _ => (self.tie_break.resolve(None), 0.0),
        };
        match side {
            Some(side) => {
                let winner = side_team(context, side);
                Prediction::Pick(Pick::new(winner, None, round_pts(margin), total))
            }
            None => Prediction::NoDecision,
        }
    }
}

// ---------------------------------------------------------------------------
// Pick derivation
// ---------------------------------------------------------------------------

fn side_team(context: &MatchupContext, side: Side) -> &str {
    match side {
        Side::Home => &context.home_team,
        Side::Away => &context.away_team,
    }
}

/// Non-negative points rounded half away from zero.
fn round_pts(v: f64) -> u32 {
    v.round().max(0.0) as u32
}

/// Turn the favored side into a pick.
///
/// - margin: the favored side's average points margin, rounded, at least 1.
/// - total: mean of the average combined score over sides that have games;
///   the matchup over/under when neither does; else 0.
/// - ATS: the predicted home-relative spread (negative when home is picked)
///   against the line. Above the line the away side covers, otherwise home.
fn derive_pick(context: &MatchupContext, stats: &MatchupStats, side: Side) -> Pick {
    let favored = match side {
        Side::Home => &stats.home,
        Side::Away => &stats.away,
    };
    let margin = round_pts(favored.avg_pts_margin()).max(1);

    let totals: Vec<f64> = [&stats.home, &stats.away]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.avg_total_pts())
        .collect();
    let total = if totals.is_empty() {
        context.over_under.map(round_pts).unwrap_or(0)
    } else {
        round_pts(totals.iter().sum::<f64>() / totals.len() as f64)
    };

    let ats_winner = context.pt_spread.map(|line| {
        let predicted = match side {
            Side::Home => -f64::from(margin),
            Side::Away => f64::from(margin),
        };
        if predicted > line {
            context.away_team.as_str()
        } else {
            context.home_team.as_str()
        }
    });

    Pick::new(side_team(context, side), ats_winner, margin, total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
