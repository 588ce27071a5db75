// Analysis pipeline: filter a team's history, bound it, aggregate it, and
// compare the two sides of a matchup.

pub mod criteria;
pub mod engine;
pub mod filter;
pub mod selection;
pub mod stats;

pub use engine::{compute, team_stats, MatchupStats};
