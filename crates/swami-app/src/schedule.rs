// Stored game rows: scheduled games with an optional final result.

use chrono::NaiveDateTime;
use serde::Serialize;

use swami_core::{GameRecord, MatchupContext, Pick};

/// Final box-score numbers for a played game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameResult {
    pub home_pts: u32,
    pub away_pts: u32,
    pub home_yds: u32,
    pub away_yds: u32,
    pub home_tos: u32,
    pub away_tos: u32,
}

/// How a pick fared. `None` where there is nothing to judge: a tie, an ATS
/// push, or no ATS pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PickGrade {
    pub su: Option<bool>,
    pub ats: Option<bool>,
}

/// One row of the games table. `result` is `None` until the game is played.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRow {
    pub game_id: i64,
    pub season: u16,
    pub week: u16,
    pub datetime: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
    pub neutral_site: bool,
    pub pt_spread: Option<f64>,
    pub over_under: Option<f64>,
    pub result: Option<GameResult>,
}

impl GameRow {
    /// The completed-game record, if the game has been played.
    pub fn to_record(&self) -> Option<GameRecord> {
        let r = self.result?;
        Some(GameRecord {
            game_id: self.game_id,
            season: self.season,
            week: self.week,
            datetime: self.datetime,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            neutral_site: self.neutral_site,
            pt_spread: self.pt_spread,
            over_under: self.over_under,
            home_pts: r.home_pts,
            away_pts: r.away_pts,
            home_yds: r.home_yds,
            away_yds: r.away_yds,
            home_tos: r.home_tos,
            away_tos: r.away_tos,
        })
    }

    /// The prediction context for this game: only history strictly before
    /// kickoff may be used.
    pub fn matchup(&self) -> MatchupContext {
        MatchupContext {
            game_id: Some(self.game_id),
            season: self.season,
            week: self.week,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            cutoff: self.datetime,
            pt_spread: self.pt_spread,
            over_under: self.over_under,
            neutral_site: self.neutral_site,
        }
    }

    /// Grade a pick against the final result; `None` until the game is played.
    pub fn grade(&self, pick: &Pick) -> Option<PickGrade> {
        let record = self.to_record()?;
        let su = record.winner().map(|w| w == pick.su_winner);
        let ats = match (pick.ats_winner.as_deref(), record.ats_winner()) {
            (Some(picked), Some(covered)) => Some(picked == covered),
            _ => None,
        };
        Some(PickGrade { su, ats })
    }

    /// `AWAY@HOME` label.
    pub fn label(&self) -> String {
        format!("{}@{}", self.away_team, self.home_team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(result: Option<GameResult>) -> GameRow {
        GameRow {
            game_id: 7,
            season: 2023,
            week: 14,
            datetime: NaiveDate::from_ymd_opt(2023, 12, 10)
                .unwrap()
                .and_hms_opt(16, 25, 0)
                .unwrap(),
            home_team: "KC".into(),
            away_team: "BUF".into(),
            neutral_site: false,
            pt_spread: Some(-1.5),
            over_under: Some(48.5),
            result,
        }
    }

    #[test]
    fn scheduled_game_has_no_record() {
        assert!(row(None).to_record().is_none());
    }

    #[test]
    fn played_game_converts_to_record() {
        let result = GameResult {
            home_pts: 17,
            away_pts: 20,
            home_yds: 346,
            away_yds: 331,
            home_tos: 1,
            away_tos: 2,
        };
        let record = row(Some(result)).to_record().unwrap();
        assert_eq!(record.game_id, 7);
        assert_eq!(record.winner(), Some("BUF"));
        assert_eq!(record.pt_spread, Some(-1.5));
    }

    #[test]
    fn grading_picks() {
        let pick = Pick::new("KC", Some("KC"), 3, 48);
        assert_eq!(row(None).grade(&pick), None);

        let mut played = row(Some(GameResult {
            home_pts: 17,
            away_pts: 20,
            home_yds: 0,
            away_yds: 0,
            home_tos: 0,
            away_tos: 0,
        }));
        let grade = played.grade(&pick).unwrap();
        assert_eq!(grade.su, Some(false));
        assert_eq!(grade.ats, Some(false));

        let grade = played.grade(&Pick::new("BUF", None, 3, 37)).unwrap();
        assert_eq!(grade.su, Some(true));
        assert_eq!(grade.ats, None);

        // Tie game, and a line that makes it an ATS push.
        if let Some(r) = played.result.as_mut() {
            r.away_pts = 17;
        }
        played.pt_spread = Some(0.0);
        let grade = played.grade(&pick).unwrap();
        assert_eq!(grade, PickGrade { su: None, ats: None });
    }

    #[test]
    fn matchup_cuts_off_at_kickoff() {
        let r = row(None);
        let ctx = r.matchup();
        assert_eq!(ctx.cutoff, r.datetime);
        assert_eq!(ctx.game_id, Some(7));
        assert_eq!(ctx.label(), "BUF@KC");
        assert_eq!(r.label(), "BUF@KC");
    }
}
