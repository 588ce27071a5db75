// Slate runner: every (game, swami) pair of a week, predicted concurrently
// on the blocking pool over a shared corpus snapshot.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{info, warn};

use swami_core::{GameCorpus, Prediction, Swami};

use crate::schedule::GameRow;

/// One swami's prediction for one game.
#[derive(Debug)]
pub struct SlateEntry {
    pub game: GameRow,
    pub swami: String,
    pub outcome: anyhow::Result<Prediction>,
}

/// Predict every game with every swami.
///
/// Entries come back in (game, swami) input order regardless of completion
/// order. A failed prediction is reported in its entry and never affects the
/// others.
pub async fn run_slate<C>(corpus: Arc<C>, games: &[GameRow], swamis: &[Swami]) -> Vec<SlateEntry>
where
    C: GameCorpus + Send + Sync + 'static,
{
    let mut set = JoinSet::new();
    for (gi, game) in games.iter().enumerate() {
        for (si, swami) in swamis.iter().enumerate() {
            let corpus = Arc::clone(&corpus);
            let swami = swami.clone();
            let context = game.matchup();
            set.spawn_blocking(move || (gi, si, swami.predict(&*corpus, &context)));
        }
    }

    let mut outcomes: Vec<Vec<Option<anyhow::Result<Prediction>>>> = games
        .iter()
        .map(|_| swamis.iter().map(|_| None).collect())
        .collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((gi, si, result)) => outcomes[gi][si] = Some(result.map_err(anyhow::Error::from)),
            // Panics are reported via the missing-slot fallback below.
            Err(e) => warn!("slate task failed: {e}"),
        }
    }

    let mut entries = Vec::with_capacity(games.len() * swamis.len());
    let mut failures = 0usize;
    for (game, row) in games.iter().zip(outcomes) {
        for (swami, outcome) in swamis.iter().zip(row) {
            let outcome =
                outcome.unwrap_or_else(|| Err(anyhow!("prediction task did not complete")));
            if let Err(e) = &outcome {
                failures += 1;
                warn!(swami = swami.name(), game_id = game.game_id, "prediction failed: {e:#}");
            }
            entries.push(SlateEntry {
                game: game.clone(),
                swami: swami.name().to_string(),
                outcome,
            });
        }
    }
    info!(
        games = games.len(),
        swamis = swamis.len(),
        failures,
        "slate complete"
    );
    entries
}
