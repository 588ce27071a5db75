// Library root: the prediction core. Game data model, the analysis pipeline
// (filters, selection, aggregation, criteria), and swami orchestration.

pub mod analysis;
pub mod corpus;
pub mod error;
pub mod game;
pub mod pick;
pub mod swami;

pub use analysis::criteria::{CriteriaComparator, Criterion, CriterionOutcome};
pub use analysis::filter::{FilterDescriptor, FilterSpec};
pub use analysis::selection::SelectionPolicy;
pub use analysis::stats::StatsSet;
pub use corpus::{GameCorpus, MemoryCorpus, UnplayedGame};
pub use error::{ConfigurationError, DataError, PredictError, Stage};
pub use game::{GameRecord, MatchupContext, Team, TeamMeta};
pub use pick::{Pick, Prediction};
pub use swami::{Strategy, Swami, SwamiParams, TieBreak};
