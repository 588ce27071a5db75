// Per-matchup analysis: query, filter, select, and aggregate each side.

use tracing::debug;

use crate::analysis::filter::{apply_all, FilterScope, FilterSpec};
use crate::analysis::selection::SelectionPolicy;
use crate::analysis::stats::{aggregate, StatsSet};
use crate::corpus::GameCorpus;
use crate::error::DataError;
use crate::game::MatchupContext;

/// Statistics for both sides of a matchup.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupStats {
    pub home: StatsSet,
    pub away: StatsSet,
}

/// Compute statistics for the home and away sides independently.
///
/// Each side's history is queried from the corpus, cut off at the matchup
/// time, filtered from that side's perspective (relative filters resolve
/// against the other side), bounded by `policy`, and aggregated. A side with
/// no qualifying games gets an all-zero `StatsSet`; that is not an error.
pub fn compute<C: GameCorpus + ?Sized>(
    corpus: &C,
    context: &MatchupContext,
    filters: &[FilterSpec],
    policy: SelectionPolicy,
) -> Result<MatchupStats, DataError> {
    let home = team_stats(corpus, context, &context.home_team, filters, policy)?;
    let away = team_stats(corpus, context, &context.away_team, filters, policy)?;
    Ok(MatchupStats { home, away })
}

/// Statistics for one side of the matchup.
pub fn team_stats<C: GameCorpus + ?Sized>(
    corpus: &C,
    context: &MatchupContext,
    team: &str,
    filters: &[FilterSpec],
    policy: SelectionPolicy,
) -> Result<StatsSet, DataError> {
    let history = corpus.find_games(team, context.cutoff)?;
    let queried = history.len();

    let scope = FilterScope::new(context, team, corpus);
    let qualifying = apply_all(history, filters, &scope)?;
    let filtered = qualifying.len();

    let selected = policy.select(qualifying);
    debug!(
        team,
        queried,
        filtered,
        selected = selected.len(),
        "selected games for analysis"
    );

    Ok(aggregate(selected, team))
}
