// Per-team statistics over a filtered game list.
//
// `StatsSet` stores only primary counters; every ratio and margin is a method
// computed from them on read.

use serde::Serialize;

use crate::game::GameRecord;

/// Aggregated results for one team over a set of games. Only `aggregate`
/// builds one, so the counters always agree with `games`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSet {
    team: String,
    games: Vec<GameRecord>,
    wins: u32,
    losses: u32,
    ties: u32,
    ats_wins: u32,
    ats_losses: u32,
    ats_pushes: u32,
    pts_for: u64,
    pts_against: u64,
    yds_for: u64,
    yds_against: u64,
    tos_for: u64,
    tos_against: u64,
}

/// Reduce `games` to a `StatsSet` from `team`'s perspective in one pass.
/// Games the team did not play in are ignored.
pub fn aggregate(games: Vec<GameRecord>, team: &str) -> StatsSet {
    let mut stats = StatsSet::empty(team);
    for game in games {
        let Some(view) = game.view(team) else {
            continue;
        };

        let (pts_for, pts_against) = (view.pts_for(), view.pts_against());
        match pts_for.cmp(&pts_against) {
            std::cmp::Ordering::Greater => stats.wins += 1,
            std::cmp::Ordering::Less => stats.losses += 1,
            std::cmp::Ordering::Equal => stats.ties += 1,
        }

        if let Some(spread) = view.spread() {
            let adjusted = f64::from(pts_for) - f64::from(pts_against) + spread;
            if adjusted > 0.0 {
                stats.ats_wins += 1;
            } else if adjusted < 0.0 {
                stats.ats_losses += 1;
            } else {
                stats.ats_pushes += 1;
            }
        }

        stats.pts_for += u64::from(pts_for);
        stats.pts_against += u64::from(pts_against);
        stats.yds_for += u64::from(view.yds_for());
        stats.yds_against += u64::from(view.yds_against());
        stats.tos_for += u64::from(view.tos_for());
        stats.tos_against += u64::from(view.tos_against());
        stats.games.push(game);
    }
    stats
}

impl StatsSet {
    /// All-zero statistics: the result of aggregating no games.
    pub fn empty(team: &str) -> Self {
        StatsSet {
            team: team.to_string(),
            games: Vec::new(),
            wins: 0,
            losses: 0,
            ties: 0,
            ats_wins: 0,
            ats_losses: 0,
            ats_pushes: 0,
            pts_for: 0,
            pts_against: 0,
            yds_for: 0,
            yds_against: 0,
            tos_for: 0,
            tos_against: 0,
        }
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    /// The qualifying games, most recent first.
    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    pub fn num_games(&self) -> u32 {
        self.games.len() as u32
    }

    pub fn num_wins(&self) -> u32 {
        self.wins
    }

    pub fn num_losses(&self) -> u32 {
        self.losses
    }

    pub fn num_ties(&self) -> u32 {
        self.ties
    }

    pub fn num_ats_wins(&self) -> u32 {
        self.ats_wins
    }

    pub fn num_ats_losses(&self) -> u32 {
        self.ats_losses
    }

    pub fn num_ats_pushes(&self) -> u32 {
        self.ats_pushes
    }

    /// Games that had a recorded spread.
    pub fn num_ats_games(&self) -> u32 {
        self.ats_wins + self.ats_losses + self.ats_pushes
    }

    pub fn pts_for(&self) -> u64 {
        self.pts_for
    }

    pub fn pts_against(&self) -> u64 {
        self.pts_against
    }

    pub fn yds_for(&self) -> u64 {
        self.yds_for
    }

    pub fn yds_against(&self) -> u64 {
        self.yds_against
    }

    /// Turnovers committed by the team.
    pub fn tos_for(&self) -> u64 {
        self.tos_for
    }

    /// Turnovers committed by opponents.
    pub fn tos_against(&self) -> u64 {
        self.tos_against
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    // -- Derived --

    /// Ties count as half a win. 0.0 with no games.
    pub fn win_pct(&self) -> f64 {
        ratio(f64::from(self.wins) + 0.5 * f64::from(self.ties), self.num_games())
    }

    pub fn loss_pct(&self) -> f64 {
        ratio(f64::from(self.losses) + 0.5 * f64::from(self.ties), self.num_games())
    }

    /// ATS wins over games with a recorded spread (pushes included in the
    /// denominator). 0.0 when no game had a spread.
    pub fn ats_win_pct(&self) -> f64 {
        ratio(f64::from(self.ats_wins), self.num_ats_games())
    }

    pub fn pts_margin(&self) -> i64 {
        self.pts_for as i64 - self.pts_against as i64
    }

    pub fn yds_margin(&self) -> i64 {
        self.yds_for as i64 - self.yds_against as i64
    }

    /// Takeaways minus giveaways: higher is better for the team.
    pub fn tos_margin(&self) -> i64 {
        self.tos_against as i64 - self.tos_for as i64
    }

    pub fn avg_pts_margin(&self) -> f64 {
        ratio(self.pts_margin() as f64, self.num_games())
    }

    /// Average combined score of the team's games.
    pub fn avg_total_pts(&self) -> f64 {
        ratio((self.pts_for + self.pts_against) as f64, self.num_games())
    }

    /// "W-L" or "W-L-T" record string.
    pub fn record(&self) -> String {
        if self.ties > 0 {
            format!("{}-{}-{}", self.wins, self.losses, self.ties)
        } else {
            format!("{}-{}", self.wins, self.losses)
        }
    }
}

fn ratio(numerator: f64, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / f64::from(denominator)
    }
}
