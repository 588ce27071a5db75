// Error taxonomy for the prediction core.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A predictor was described with an unknown name or an out-of-range
/// parameter. Raised while building filters, criteria, and swamis, never
/// while evaluating a matchup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown filter kind `{0}`")]
    UnknownFilterKind(String),

    #[error("unknown criterion `{0}`")]
    UnknownCriterion(String),

    #[error("unknown swami strategy `{0}`")]
    UnknownStrategy(String),

    #[error("unknown tie-break policy `{0}`")]
    UnknownTieBreak(String),

    #[error("missing required parameter `{field}`")]
    MissingParameter { field: String },

    #[error("invalid value for `{field}`: {message}")]
    InvalidParameter { field: String, message: String },
}

impl ConfigurationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigurationError::InvalidParameter {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Data errors
// ---------------------------------------------------------------------------

/// Data-integrity failure reported by (or about) the game corpus. These are
/// passed through untouched; the core never repairs or skips bad records.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unknown team `{0}`")]
    UnknownTeam(String),

    #[error("malformed game {game_id}: {message}")]
    Malformed { game_id: i64, message: String },

    #[error("invalid point spread `{0}`")]
    BadSpread(String),

    #[error("game corpus query failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    /// A game before the cutoff is still waiting on its result.
    pub fn unplayed(game_id: i64) -> Self {
        DataError::Malformed {
            game_id,
            message: "game before the cutoff has no recorded result".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction errors
// ---------------------------------------------------------------------------

/// Orchestration stage of a single prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Selecting,
    Analyzed,
    Decided,
    PickEmitted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Idle => "idle",
            Stage::Selecting => "selecting",
            Stage::Analyzed => "analyzed",
            Stage::Decided => "decided",
            Stage::PickEmitted => "pick-emitted",
        };
        f.write_str(label)
    }
}

/// A prediction request failed. Fatal to that request only.
#[derive(Debug, Error)]
#[error("prediction failed while {stage}: {source}")]
pub struct PredictError {
    pub stage: Stage,
    #[source]
    pub source: DataError,
}
