// Ordered tie-break comparison of two statistic sets.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::analysis::stats::StatsSet;
use crate::error::ConfigurationError;

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// A named statistic to compare. Higher is always better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Games,
    Wins,
    WinPct,
    AtsWins,
    AtsWinPct,
    Pts,
    Yds,
    Tos,
}

type Extractor = fn(&StatsSet) -> f64;

/// Name, extractor, and sample size for each criterion, in declaration order.
/// A criterion whose sample is zero on either side cannot decide anything.
static CRITERIA: [(Criterion, &str, Extractor, Extractor); 8] = [
    (Criterion::Games, "games", games, games),
    (Criterion::Wins, "wins", wins, games),
    (Criterion::WinPct, "win_pct", win_pct, games),
    (Criterion::AtsWins, "ats_wins", ats_wins, ats_games),
    (Criterion::AtsWinPct, "ats_win_pct", ats_win_pct, ats_games),
    (Criterion::Pts, "pts", pts_margin, games),
    (Criterion::Yds, "yds", yds_margin, games),
    (Criterion::Tos, "tos", tos_margin, games),
];

fn games(s: &StatsSet) -> f64 {
    f64::from(s.num_games())
}

fn wins(s: &StatsSet) -> f64 {
    f64::from(s.num_wins())
}

fn win_pct(s: &StatsSet) -> f64 {
    s.win_pct()
}

fn ats_wins(s: &StatsSet) -> f64 {
    f64::from(s.num_ats_wins())
}

fn ats_games(s: &StatsSet) -> f64 {
    f64::from(s.num_ats_games())
}

fn ats_win_pct(s: &StatsSet) -> f64 {
    s.ats_win_pct()
}

fn pts_margin(s: &StatsSet) -> f64 {
    s.pts_margin() as f64
}

fn yds_margin(s: &StatsSet) -> f64 {
    s.yds_margin() as f64
}

fn tos_margin(s: &StatsSet) -> f64 {
    s.tos_margin() as f64
}

impl Criterion {
    fn entry(self) -> &'static (Criterion, &'static str, Extractor, Extractor) {
        &CRITERIA[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// The statistic this criterion compares.
    pub fn extract(self, stats: &StatsSet) -> f64 {
        (self.entry().2)(stats)
    }

    fn has_sample(self, stats: &StatsSet) -> bool {
        (self.entry().3)(stats) > 0.0
    }

    /// Names of all known criteria.
    pub fn names() -> impl Iterator<Item = &'static str> {
        CRITERIA.iter().map(|(_, name, ..)| *name)
    }

    /// Compare both sides on this criterion alone.
    pub fn evaluate(self, a: &StatsSet, b: &StatsSet) -> CriterionOutcome {
        if !self.has_sample(a) || !self.has_sample(b) {
            return CriterionOutcome::Tie;
        }
        let (va, vb) = (self.extract(a), self.extract(b));
        if va > vb {
            CriterionOutcome::FavorsA
        } else if va < vb {
            CriterionOutcome::FavorsB
        } else {
            CriterionOutcome::Tie
        }
    }
}

impl FromStr for Criterion {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CRITERIA
            .iter()
            .find(|(_, name, ..)| *name == s)
            .map(|(c, ..)| *c)
            .ok_or_else(|| ConfigurationError::UnknownCriterion(s.to_string()))
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CriterionOutcome {
    FavorsA,
    FavorsB,
    Tie,
}

impl CriterionOutcome {
    /// The same verdict with the sides swapped.
    pub fn invert(self) -> Self {
        match self {
            CriterionOutcome::FavorsA => CriterionOutcome::FavorsB,
            CriterionOutcome::FavorsB => CriterionOutcome::FavorsA,
            CriterionOutcome::Tie => CriterionOutcome::Tie,
        }
    }
}

/// Result of a full comparison, including which criterion settled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub outcome: CriterionOutcome,
    /// `None` when every criterion tied.
    pub decided_by: Option<Criterion>,
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// An ordered, validated criteria list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaComparator {
    criteria: Vec<Criterion>,
}

impl CriteriaComparator {
    /// Build from criterion names. Unknown names fail here, not at compare time.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigurationError> {
        let criteria = names
            .iter()
            .map(|n| n.as_ref().parse::<Criterion>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CriteriaComparator { criteria })
    }

    pub fn new(criteria: Vec<Criterion>) -> Self {
        CriteriaComparator { criteria }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn compare(&self, a: &StatsSet, b: &StatsSet) -> CriterionOutcome {
        self.compare_detailed(a, b).outcome
    }

    /// Evaluate criteria left to right; the first non-tie decides.
    pub fn compare_detailed(&self, a: &StatsSet, b: &StatsSet) -> Comparison {
        for &criterion in &self.criteria {
            let outcome = criterion.evaluate(a, b);
            if outcome != CriterionOutcome::Tie {
                return Comparison {
                    outcome,
                    decided_by: Some(criterion),
                };
            }
        }
        Comparison {
            outcome: CriterionOutcome::Tie,
            decided_by: None,
        }
    }
}

/// Free-function form of `CriteriaComparator::compare`.
pub fn compare(a: &StatsSet, b: &StatsSet, criteria: &[Criterion]) -> CriterionOutcome {
    CriteriaComparator::new(criteria.to_vec()).compare(a, b)
}
