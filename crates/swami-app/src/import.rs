// CSV ingestion of team and game data.
//
// teams.csv: code,name,full_name,conference,division
// games.csv: game_id,season,week,datetime,home_team,away_team,neutral_site,
//            pt_spread,over_under,home_pts,away_pts,home_yds,away_yds,home_tos,away_tos
//
// Result columns are blank for games not yet played; once the scores are in,
// every box-score column is required. A malformed row fails the whole file
// with its line number; nothing is skipped.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::info;

use swami_core::game::{parse_spread, parse_week};
use swami_core::Team;

use crate::db::Database;
use crate::schedule::{GameResult, GameRow};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {message}")]
    Row { line: u64, message: String },
}

fn row_error(line: u64, message: impl Into<String>) -> ImportError {
    ImportError::Row {
        line,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTeam {
    code: String,
    name: String,
    full_name: String,
    conference: String,
    division: String,
}

/// Games row as text; typed conversion happens in `into_row` so errors can
/// name the offending column.
#[derive(Debug, Deserialize)]
struct RawGame {
    game_id: i64,
    season: u16,
    week: String,
    datetime: String,
    home_team: String,
    away_team: String,
    #[serde(default)]
    neutral_site: String,
    #[serde(default)]
    pt_spread: String,
    #[serde(default)]
    over_under: Option<f64>,
    #[serde(default)]
    home_pts: Option<u32>,
    #[serde(default)]
    away_pts: Option<u32>,
    #[serde(default)]
    home_yds: Option<u32>,
    #[serde(default)]
    away_yds: Option<u32>,
    #[serde(default)]
    home_tos: Option<u32>,
    #[serde(default)]
    away_tos: Option<u32>,
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "n" | "no" => Some(false),
        "1" | "true" | "y" | "yes" => Some(true),
        _ => None,
    }
}

impl RawTeam {
    fn into_team(self) -> Result<Team, String> {
        for (field, value) in [
            ("code", &self.code),
            ("conference", &self.conference),
            ("division", &self.division),
        ] {
            if value.is_empty() {
                return Err(format!("`{field}` must not be empty"));
            }
        }
        Ok(Team {
            code: self.code,
            name: self.name,
            full_name: self.full_name,
            conference: self.conference,
            division: self.division,
        })
    }
}

impl RawGame {
    fn into_row(self) -> Result<GameRow, String> {
        let week = parse_week(&self.week).ok_or_else(|| format!("invalid week `{}`", self.week))?;
        let datetime = parse_datetime(&self.datetime)
            .ok_or_else(|| format!("invalid datetime `{}`", self.datetime))?;
        let neutral_site = parse_flag(&self.neutral_site)
            .ok_or_else(|| format!("invalid neutral_site `{}`", self.neutral_site))?;
        let pt_spread = parse_spread(&self.pt_spread).map_err(|e| e.to_string())?;

        if self.home_team.is_empty() || self.away_team.is_empty() {
            return Err("home_team and away_team are required".into());
        }
        if self.home_team == self.away_team {
            return Err(format!("{} cannot play itself", self.home_team));
        }
        if self.over_under.is_some_and(|ou| !ou.is_finite() || ou < 0.0) {
            return Err("over_under must be a non-negative number".into());
        }

        let box_score = [
            ("home_yds", self.home_yds),
            ("away_yds", self.away_yds),
            ("home_tos", self.home_tos),
            ("away_tos", self.away_tos),
        ];
        let result = match (self.home_pts, self.away_pts) {
            (Some(home_pts), Some(away_pts)) => {
                match (self.home_yds, self.away_yds, self.home_tos, self.away_tos) {
                    (Some(home_yds), Some(away_yds), Some(home_tos), Some(away_tos)) => {
                        Some(GameResult {
                            home_pts,
                            away_pts,
                            home_yds,
                            away_yds,
                            home_tos,
                            away_tos,
                        })
                    }
                    _ => {
                        let missing: Vec<&str> = box_score
                            .iter()
                            .filter(|(_, v)| v.is_none())
                            .map(|(column, _)| *column)
                            .collect();
                        return Err(format!("played game is missing {}", missing.join(", ")));
                    }
                }
            }
            (None, None) => {
                if let Some((column, _)) = box_score.iter().find(|(_, v)| v.is_some()) {
                    return Err(format!("`{column}` is set for a game without scores"));
                }
                None
            }
            _ => return Err("home_pts and away_pts must both be present or both blank".into()),
        };

        Ok(GameRow {
            game_id: self.game_id,
            season: self.season,
            week,
            datetime,
            home_team: self.home_team,
            away_team: self.away_team,
            neutral_site,
            pt_spread,
            over_under: self.over_under,
            result,
        })
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

fn csv_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr)
}

pub fn load_teams_from_reader<R: Read>(rdr: R) -> Result<Vec<Team>, ImportError> {
    let mut reader = csv_reader(rdr);
    let headers = reader.headers()?.clone();
    let mut teams = Vec::new();
    let mut seen = HashSet::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let raw: RawTeam = record
            .deserialize(Some(&headers))
            .map_err(|e| row_error(line, e.to_string()))?;
        let team = raw.into_team().map_err(|m| row_error(line, m))?;
        if !seen.insert(team.code.clone()) {
            return Err(row_error(line, format!("duplicate team `{}`", team.code)));
        }
        teams.push(team);
    }
    Ok(teams)
}

pub fn load_games_from_reader<R: Read>(rdr: R) -> Result<Vec<GameRow>, ImportError> {
    let mut reader = csv_reader(rdr);
    let headers = reader.headers()?.clone();
    let mut games = Vec::new();
    let mut seen = HashSet::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let raw: RawGame = record
            .deserialize(Some(&headers))
            .map_err(|e| row_error(line, e.to_string()))?;
        let game = raw.into_row().map_err(|m| row_error(line, m))?;
        if !seen.insert(game.game_id) {
            return Err(row_error(line, format!("duplicate game_id {}", game.game_id)));
        }
        games.push(game);
    }
    Ok(games)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, ImportError> {
    std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_teams(path: &Path) -> Result<Vec<Team>, ImportError> {
    load_teams_from_reader(open(path)?)
}

pub fn load_games(path: &Path) -> Result<Vec<GameRow>, ImportError> {
    load_games_from_reader(open(path)?)
}

/// Load both CSV files and write them into the database. Teams go first so
/// game rows can reference them. Returns (teams, games) imported.
pub fn import_files(
    db: &Database,
    teams_path: &Path,
    games_path: &Path,
) -> anyhow::Result<(usize, usize)> {
    let teams = load_teams(teams_path)
        .with_context(|| format!("failed to load teams from {}", teams_path.display()))?;
    let games = load_games(games_path)
        .with_context(|| format!("failed to load games from {}", games_path.display()))?;
    let n_teams = db.import_teams(&teams)?;
    let n_games = db.import_games(&games)?;
    info!(teams = n_teams, games = n_games, "import complete");
    Ok((n_teams, n_games))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swami_core::game::{WEEK_DIVISION, WEEK_SUPER_BOWL};

    const TEAMS: &str = "\
code,name,full_name,conference,division
KC,Chiefs,Kansas City Chiefs,AFC,AFC West
BUF,Bills,Buffalo Bills,AFC,AFC East
";

    const GAMES_HEADER: &str = "game_id,season,week,datetime,home_team,away_team,neutral_site,pt_spread,over_under,home_pts,away_pts,home_yds,away_yds,home_tos,away_tos\n";

    fn games(rows: &str) -> Result<Vec<GameRow>, ImportError> {
        load_games_from_reader(format!("{GAMES_HEADER}{rows}").as_bytes())
    }

    #[test]
    fn loads_teams() {
        let teams = load_teams_from_reader(TEAMS.as_bytes()).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].full_name, "Kansas City Chiefs");
        assert_eq!(teams[1].division, "AFC East");
    }

    #[test]
    fn duplicate_team_is_rejected() {
        let text = format!("{TEAMS}KC,Chiefs,Kansas City Chiefs,AFC,AFC West\n");
        let err = load_teams_from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Row { line: 4, .. }), "{err}");
    }

    #[test]
    fn loads_played_and_scheduled_games() {
        let rows = games(
            "1,2023,1,2023-09-07 20:20,KC,DET,0,-4.5,53,20,21,316,368,1,1\n\
             2,2023,Division,2024-01-21 18:30,BUF,KC,,+2.5,45.5,,,,,,\n\
             3,2023,SuperBowl,2024-02-11 18:30:00,KC,SF,1,pick,,25,22,357,381,1,1\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].pt_spread, Some(-4.5));
        assert_eq!(rows[0].result.unwrap().away_yds, 368);

        assert_eq!(rows[1].week, WEEK_DIVISION);
        assert_eq!(rows[1].pt_spread, Some(2.5));
        assert!(rows[1].result.is_none());

        assert_eq!(rows[2].week, WEEK_SUPER_BOWL);
        assert!(rows[2].neutral_site);
        assert_eq!(rows[2].pt_spread, Some(0.0));
        assert_eq!(rows[2].over_under, None);
        assert_eq!(rows[2].result.unwrap().home_yds, 357);
    }

    #[test]
    fn malformed_row_reports_line() {
        let err = games(
            "1,2023,1,2023-09-07 20:20,KC,DET,0,-4.5,53,20,21,316,368,1,1\n\
             2,2023,Week Two,2023-09-14 20:15,KC,BUF,0,,,,,,,,\n",
        )
        .unwrap_err();
        match err {
            ImportError::Row { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("Week Two"));
            }
            other => panic!("expected Row error, got: {other}"),
        }
    }

    #[test]
    fn row_level_checks() {
        let cases = [
            ("1,2023,1,not-a-date,KC,DET,0,,,,,,,,\n", "datetime"),
            ("1,2023,1,2023-09-07 20:20,KC,KC,0,,,,,,,,\n", "itself"),
            ("1,2023,1,2023-09-07 20:20,KC,DET,maybe,,,,,,,,\n", "neutral_site"),
            ("1,2023,1,2023-09-07 20:20,KC,DET,0,-3x,,,,,,,\n", "-3x"),
            ("1,2023,1,2023-09-07 20:20,KC,DET,0,,,20,,,,,\n", "both"),
        ];
        for (row, needle) in cases {
            match games(row) {
                Err(ImportError::Row { line: 2, message }) => {
                    assert!(message.contains(needle), "{message} should mention {needle}");
                }
                other => panic!("expected Row error for {row:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn played_game_needs_full_box_score() {
        let err = games("1,2023,1,2023-09-07 20:20,KC,DET,0,-4.5,53,20,21,,,,\n").unwrap_err();
        match err {
            ImportError::Row { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("home_yds, away_yds, home_tos, away_tos"), "{message}");
            }
            other => panic!("expected Row error, got: {other}"),
        }

        let err = games("1,2023,1,2023-09-07 20:20,KC,DET,0,-4.5,53,20,21,316,368,1,\n").unwrap_err();
        assert!(
            matches!(&err, ImportError::Row { message, .. } if message.ends_with("away_tos")),
            "{err}"
        );

        // Box-score numbers without a final score are just as suspect.
        let err = games("1,2023,1,2023-09-07 20:20,KC,DET,0,-4.5,53,,,316,,,\n").unwrap_err();
        assert!(matches!(&err, ImportError::Row { message, .. } if message.contains("home_yds")));
    }

    #[test]
    fn duplicate_game_id_is_rejected() {
        let err = games(
            "1,2023,1,2023-09-07 20:20,KC,DET,0,,,,,,,,\n\
             1,2023,2,2023-09-14 20:20,KC,BUF,0,,,,,,,,\n",
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::Row { line: 3, .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_teams(Path::new("/nonexistent/teams.csv")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
