// SQLite persistence layer: teams, the game schedule with results, and
// recorded swami picks.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use swami_core::{
    DataError, GameCorpus, GameRecord, MemoryCorpus, Pick, Team, TeamMeta, UnplayedGame,
};

use crate::schedule::{GameResult, GameRow};

/// Stored datetime format. Lexical order matches chronological order.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const GAME_COLUMNS: &str = "game_id, season, week, datetime, home_team, away_team, neutral_site,
     pt_spread, over_under, home_pts, away_pts, home_yds, away_yds, home_tos, away_tos";

/// A pick a swami made for a scheduled game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwamiPick {
    pub swami: String,
    pub game_id: i64,
    pub pick: Pick,
}

/// SQLite-backed store for teams, games, and swami picks.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                code       TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                full_name  TEXT NOT NULL,
                conference TEXT NOT NULL,
                division   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS games (
                game_id      INTEGER PRIMARY KEY,
                season       INTEGER NOT NULL,
                week         INTEGER NOT NULL,
                datetime     TEXT NOT NULL,
                home_team    TEXT NOT NULL REFERENCES teams(code),
                away_team    TEXT NOT NULL REFERENCES teams(code),
                neutral_site INTEGER NOT NULL DEFAULT 0,
                pt_spread    REAL,
                over_under   REAL,
                home_pts     INTEGER,
                away_pts     INTEGER,
                home_yds     INTEGER,
                away_yds     INTEGER,
                home_tos     INTEGER,
                away_tos     INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_games_datetime ON games(datetime);
            CREATE INDEX IF NOT EXISTS idx_games_season_week ON games(season, week);

            CREATE TABLE IF NOT EXISTS swami_picks (
                swami      TEXT NOT NULL,
                game_id    INTEGER NOT NULL REFERENCES games(game_id),
                su_winner  TEXT NOT NULL,
                ats_winner TEXT,
                pts_margin INTEGER NOT NULL,
                total_pts  INTEGER NOT NULL,
                pick_ts    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (swami, game_id)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // -----------------------------------------------------------------------
    // Import
    // -----------------------------------------------------------------------

    /// Insert or replace teams in a single transaction.
    pub fn import_teams(&self, teams: &[Team]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin team import")?;
        for team in teams {
            tx.execute(
                "INSERT OR REPLACE INTO teams (code, name, full_name, conference, division)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![team.code, team.name, team.full_name, team.conference, team.division],
            )
            .with_context(|| format!("failed to import team {}", team.code))?;
        }
        tx.commit().context("failed to commit team import")?;
        info!(count = teams.len(), "imported teams");
        Ok(teams.len())
    }

    /// Insert or replace games in a single transaction. Re-importing a game
    /// (e.g. once its result is known) overwrites the earlier row.
    pub fn import_games(&self, games: &[GameRow]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin game import")?;
        for g in games {
            let r = g.result;
            tx.execute(
                "INSERT OR REPLACE INTO games (game_id, season, week, datetime, home_team,
                    away_team, neutral_site, pt_spread, over_under, home_pts, away_pts,
                    home_yds, away_yds, home_tos, away_tos)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    g.game_id,
                    g.season,
                    g.week,
                    g.datetime.format(DATETIME_FORMAT).to_string(),
                    g.home_team,
                    g.away_team,
                    g.neutral_site,
                    g.pt_spread,
                    g.over_under,
                    r.map(|r| r.home_pts),
                    r.map(|r| r.away_pts),
                    r.map(|r| r.home_yds),
                    r.map(|r| r.away_yds),
                    r.map(|r| r.home_tos),
                    r.map(|r| r.away_tos),
                ],
            )
            .with_context(|| format!("failed to import game {}", g.game_id))?;
        }
        tx.commit().context("failed to commit game import")?;
        info!(count = games.len(), "imported games");
        Ok(games.len())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT code, name, full_name, conference, division FROM teams ORDER BY code")
            .context("failed to prepare teams query")?;
        let teams = stmt
            .query_map([], |row| {
                Ok(Team {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    full_name: row.get(2)?,
                    conference: row.get(3)?,
                    division: row.get(4)?,
                })
            })
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;
        Ok(teams)
    }

    /// Look up a single game by id.
    pub fn game(&self, game_id: i64) -> Result<Option<GameRow>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {GAME_COLUMNS} FROM games WHERE game_id = ?1"),
            params![game_id],
            game_row,
        )
        .optional()
        .with_context(|| format!("failed to load game {game_id}"))
    }

    /// All games of one week, in kickoff order.
    pub fn slate(&self, season: u16, week: u16) -> Result<Vec<GameRow>> {
        self.query_games(
            &format!(
                "SELECT {GAME_COLUMNS} FROM games WHERE season = ?1 AND week = ?2
                 ORDER BY datetime, game_id"
            ),
            params![season, week],
        )
    }

    pub fn num_games(&self) -> Result<usize> {
        let conn = self.conn();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))
            .context("failed to count games")?;
        Ok(n as usize)
    }

    /// Materialize every team and game into an in-memory corpus. Games
    /// without results are carried as unplayed, so a snapshot query reaching
    /// past one fails exactly like `find_games` on the live store.
    pub fn load_corpus(&self) -> Result<MemoryCorpus> {
        let teams = self.teams()?;
        let rows = self.query_games(
            &format!("SELECT {GAME_COLUMNS} FROM games ORDER BY datetime, game_id"),
            [],
        )?;
        let mut games: Vec<GameRecord> = Vec::with_capacity(rows.len());
        let mut unplayed = Vec::new();
        for row in &rows {
            match row.to_record() {
                Some(record) => games.push(record),
                None => unplayed.push(UnplayedGame {
                    game_id: row.game_id,
                    datetime: row.datetime,
                    home_team: row.home_team.clone(),
                    away_team: row.away_team.clone(),
                }),
            }
        }
        debug!(
            teams = teams.len(),
            games = games.len(),
            unplayed = unplayed.len(),
            "loaded corpus snapshot"
        );
        Ok(MemoryCorpus::new(teams, games).with_unplayed(unplayed))
    }

    fn query_games<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<GameRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql).context("failed to prepare games query")?;
        let rows = stmt
            .query_map(params, game_row)
            .context("failed to query games")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game rows")?;
        Ok(rows)
    }

    fn team_exists(&self, team: &str) -> Result<bool> {
        let conn = self.conn();
        let found = conn
            .query_row("SELECT 1 FROM teams WHERE code = ?1", params![team], |_| Ok(()))
            .optional()
            .context("failed to look up team")?;
        Ok(found.is_some())
    }

    // -----------------------------------------------------------------------
    // Swami picks
    // -----------------------------------------------------------------------

    /// Record a swami's pick for a game. Uses INSERT OR REPLACE so re-running
    /// a swami overwrites its previous pick.
    pub fn record_pick(&self, swami: &str, game_id: i64, pick: &Pick) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO swami_picks
                (swami, game_id, su_winner, ats_winner, pts_margin, total_pts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                swami,
                game_id,
                pick.su_winner,
                pick.ats_winner,
                pick.pts_margin,
                pick.total_pts,
            ],
        )
        .with_context(|| format!("failed to record pick by {swami} for game {game_id}"))?;
        Ok(())
    }

    /// All recorded picks for a game, ordered by swami name.
    pub fn load_picks(&self, game_id: i64) -> Result<Vec<SwamiPick>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT swami, game_id, su_winner, ats_winner, pts_margin, total_pts
                 FROM swami_picks WHERE game_id = ?1 ORDER BY swami",
            )
            .context("failed to prepare load_picks query")?;
        let picks = stmt
            .query_map(params![game_id], |row| {
                Ok(SwamiPick {
                    swami: row.get(0)?,
                    game_id: row.get(1)?,
                    pick: Pick {
                        su_winner: row.get(2)?,
                        ats_winner: row.get(3)?,
                        pts_margin: row.get(4)?,
                        total_pts: row.get(5)?,
                    },
                })
            })
            .context("failed to query swami picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map swami pick rows")?;
        Ok(picks)
    }
}

// ---------------------------------------------------------------------------
// Corpus access
// ---------------------------------------------------------------------------

fn backend(e: anyhow::Error) -> DataError {
    DataError::Backend(e.into())
}

impl GameCorpus for Database {
    /// Completed games only. A game before the cutoff without a result is a
    /// gap in the ingested data and fails the query.
    fn find_games(&self, team: &str, before: NaiveDateTime) -> Result<Vec<GameRecord>, DataError> {
        if !self.team_exists(team).map_err(backend)? {
            return Err(DataError::UnknownTeam(team.to_string()));
        }
        let rows = self
            .query_games(
                &format!(
                    "SELECT {GAME_COLUMNS} FROM games
                     WHERE (home_team = ?1 OR away_team = ?1) AND datetime < ?2
                     ORDER BY datetime, game_id"
                ),
                params![team, before.format(DATETIME_FORMAT).to_string()],
            )
            .map_err(backend)?;

        rows.iter()
            .map(|row| row.to_record().ok_or_else(|| DataError::unplayed(row.game_id)))
            .collect()
    }

    fn team_meta(&self, team: &str) -> Result<TeamMeta, DataError> {
        let conn = self.conn();
        conn.query_row(
            "SELECT conference, division FROM teams WHERE code = ?1",
            params![team],
            |row| {
                Ok(TeamMeta {
                    conference: row.get(0)?,
                    division: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(|e| DataError::Backend(Box::new(e)))?
        .ok_or_else(|| DataError::UnknownTeam(team.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Map a row selected with `GAME_COLUMNS`.
fn game_row(row: &Row<'_>) -> rusqlite::Result<GameRow> {
    let datetime_text: String = row.get(3)?;
    let datetime = NaiveDateTime::parse_from_str(&datetime_text, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let home_pts: Option<u32> = row.get(9)?;
    let away_pts: Option<u32> = row.get(10)?;
    let result = match (home_pts, away_pts) {
        (Some(home_pts), Some(away_pts)) => Some(GameResult {
            home_pts,
            away_pts,
            home_yds: box_score(row, 11)?,
            away_yds: box_score(row, 12)?,
            home_tos: box_score(row, 13)?,
            away_tos: box_score(row, 14)?,
        }),
        (None, None) => None,
        _ => return Err(incomplete(9, "only one side has a score")),
    };

    Ok(GameRow {
        game_id: row.get(0)?,
        season: row.get(1)?,
        week: row.get(2)?,
        datetime,
        home_team: row.get(4)?,
        away_team: row.get(5)?,
        neutral_site: row.get(6)?,
        pt_spread: row.get(7)?,
        over_under: row.get(8)?,
        result,
    })
}

/// A box-score column of a played game. Blank is an error, never zero.
fn box_score(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    row.get::<_, Option<u32>>(idx)?
        .ok_or_else(|| incomplete(idx, "played game is missing a box-score value"))
}

fn incomplete(idx: usize, message: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Null, message.to_string().into())
}
