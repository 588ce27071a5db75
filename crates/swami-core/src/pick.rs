// Pick representation: the output of a swami for one matchup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A predicted result for a single game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    /// Straight-up winner.
    pub su_winner: String,
    /// Winner against the spread; absent when the matchup has no line.
    pub ats_winner: Option<String>,
    /// Predicted margin of victory from the winner's side. Always >= 1.
    pub pts_margin: u32,
    pub total_pts: u32,
}

impl Pick {
    /// Build a pick, clamping the margin to the 1-point minimum.
    pub fn new(su_winner: &str, ats_winner: Option<&str>, pts_margin: u32, total_pts: u32) -> Self {
        Pick {
            su_winner: su_winner.to_string(),
            ats_winner: ats_winner.map(str::to_string),
            pts_margin: pts_margin.max(1),
            total_pts,
        }
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.su_winner, self.pts_margin)?;
        if let Some(ats) = &self.ats_winner {
            write!(f, " (ATS: {ats})")?;
        }
        write!(f, ", total {}", self.total_pts)
    }
}

/// What a swami produced for a matchup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Prediction {
    Pick(Pick),
    /// The swami's tie-break policy declined to choose.
    NoDecision,
}

impl Prediction {
    pub fn pick(&self) -> Option<&Pick> {
        match self {
            Prediction::Pick(p) => Some(p),
            Prediction::NoDecision => None,
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Pick(p) => p.fmt(f),
            Prediction::NoDecision => f.write_str("no decision"),
        }
    }
}
