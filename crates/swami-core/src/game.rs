// Game, team, and matchup data model.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

// ---------------------------------------------------------------------------
// Weeks
// ---------------------------------------------------------------------------

/// Week values below this are regular-season week ordinals; playoff rounds
/// use the special values below.
pub const PLAYOFF_WEEK_BASE: u16 = 100;

pub const WEEK_WILD_CARD: u16 = 100;
pub const WEEK_DIVISION: u16 = 200;
pub const WEEK_CONF_CHAMP: u16 = 300;
pub const WEEK_SUPER_BOWL: u16 = 400;

/// Parse a week label: either a regular-season ordinal ("7") or a playoff
/// round name ("WildCard", "Division", "ConfChamp", "SuperBowl").
pub fn parse_week(s: &str) -> Option<u16> {
    let s = s.trim();
    match s {
        "WildCard" => Some(WEEK_WILD_CARD),
        "Division" => Some(WEEK_DIVISION),
        "ConfChamp" => Some(WEEK_CONF_CHAMP),
        "SuperBowl" => Some(WEEK_SUPER_BOWL),
        _ => s
            .parse::<u16>()
            .ok()
            .filter(|w| (1..PLAYOFF_WEEK_BASE).contains(w)),
    }
}

/// Whether a week value denotes a playoff round.
pub fn is_playoff_week(week: u16) -> bool {
    week >= PLAYOFF_WEEK_BASE
}

// ---------------------------------------------------------------------------
// Point spreads
// ---------------------------------------------------------------------------

/// Parse a point spread as published ("-7", "+3.5", "pick"). Empty input means
/// no line was recorded. Spreads are home-relative: negative = home favored.
pub fn parse_spread(s: &str) -> Result<Option<f64>, DataError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if s.eq_ignore_ascii_case("pick") || s.eq_ignore_ascii_case("pk") {
        return Ok(Some(0.0));
    }
    match s.trim_start_matches('+').parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(DataError::BadSpread(s.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// A currently active team. Prior incarnations of a franchise are folded into
/// the current code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub code: String,
    pub name: String,
    pub full_name: String,
    pub conference: String,
    pub division: String,
}

impl Team {
    pub fn meta(&self) -> TeamMeta {
        TeamMeta {
            conference: self.conference.clone(),
            division: self.division.clone(),
        }
    }
}

/// League membership used to classify opponents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMeta {
    pub conference: String,
    pub division: String,
}

// ---------------------------------------------------------------------------
// Game records
// ---------------------------------------------------------------------------

/// A completed game. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: i64,
    /// Year the season started.
    pub season: u16,
    /// Regular-season ordinal or a playoff round value.
    pub week: u16,
    pub datetime: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
    pub neutral_site: bool,
    /// Home-relative line (negative = home favored, 0.0 = pick).
    pub pt_spread: Option<f64>,
    pub over_under: Option<f64>,
    pub home_pts: u32,
    pub away_pts: u32,
    pub home_yds: u32,
    pub away_yds: u32,
    pub home_tos: u32,
    pub away_tos: u32,
}

impl GameRecord {
    /// Whether `team` played in this game.
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// View this game from one participant's side. Returns `None` when the
    /// team did not play in it.
    pub fn view<'a>(&'a self, team: &str) -> Option<TeamView<'a>> {
        if self.home_team == team {
            Some(TeamView { game: self, is_home: true })
        } else if self.away_team == team {
            Some(TeamView { game: self, is_home: false })
        } else {
            None
        }
    }

    /// Straight-up winner; `None` for a tie.
    pub fn winner(&self) -> Option<&str> {
        match self.home_pts.cmp(&self.away_pts) {
            std::cmp::Ordering::Greater => Some(&self.home_team),
            std::cmp::Ordering::Less => Some(&self.away_team),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Winner against the spread; `None` without a line or on a push.
    pub fn ats_winner(&self) -> Option<&str> {
        let spread = self.pt_spread?;
        let home_adjusted = f64::from(self.home_pts) - f64::from(self.away_pts) + spread;
        if home_adjusted > 0.0 {
            Some(&self.home_team)
        } else if home_adjusted < 0.0 {
            Some(&self.away_team)
        } else {
            None
        }
    }

    pub fn total_pts(&self) -> u32 {
        self.home_pts + self.away_pts
    }
}

/// A game seen from one participant's side: "for" is that team, "against" is
/// the opponent.
#[derive(Debug, Clone, Copy)]
pub struct TeamView<'a> {
    pub game: &'a GameRecord,
    pub is_home: bool,
}

impl<'a> TeamView<'a> {
    pub fn opponent(&self) -> &'a str {
        if self.is_home {
            &self.game.away_team
        } else {
            &self.game.home_team
        }
    }

    pub fn pts_for(&self) -> u32 {
        if self.is_home {
            self.game.home_pts
        } else {
            self.game.away_pts
        }
    }

    pub fn pts_against(&self) -> u32 {
        if self.is_home {
            self.game.away_pts
        } else {
            self.game.home_pts
        }
    }

    pub fn yds_for(&self) -> u32 {
        if self.is_home {
            self.game.home_yds
        } else {
            self.game.away_yds
        }
    }

    pub fn yds_against(&self) -> u32 {
        if self.is_home {
            self.game.away_yds
        } else {
            self.game.home_yds
        }
    }

    /// Turnovers committed by this team.
    pub fn tos_for(&self) -> u32 {
        if self.is_home {
            self.game.home_tos
        } else {
            self.game.away_tos
        }
    }

    /// Turnovers committed by the opponent.
    pub fn tos_against(&self) -> u32 {
        if self.is_home {
            self.game.away_tos
        } else {
            self.game.home_tos
        }
    }

    /// Spread from this team's side (negative = this team favored).
    pub fn spread(&self) -> Option<f64> {
        self.game
            .pt_spread
            .map(|s| if self.is_home { s } else { -s })
    }
}

// ---------------------------------------------------------------------------
// Matchup context
// ---------------------------------------------------------------------------

/// The game being predicted. Only games strictly before `cutoff` may inform
/// the prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupContext {
    pub game_id: Option<i64>,
    pub season: u16,
    pub week: u16,
    pub home_team: String,
    pub away_team: String,
    pub cutoff: NaiveDateTime,
    pub pt_spread: Option<f64>,
    pub over_under: Option<f64>,
    pub neutral_site: bool,
}

impl MatchupContext {
    /// The other side of the matchup, or `None` if `team` is not playing.
    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if team == self.home_team {
            Some(&self.away_team)
        } else if team == self.away_team {
            Some(&self.home_team)
        } else {
            None
        }
    }

    /// Short label used in logs and CLI output (e.g. `KC@BUF`).
    pub fn label(&self) -> String {
        format!("{}@{}", self.away_team, self.home_team)
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
