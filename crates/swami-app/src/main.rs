// Swami entry point.
//
// Every command follows the same startup:
// 1. Initialize tracing (log to file, not the terminal)
// 2. Load config (copying defaults on first run)
// 3. Open the database
// then runs one of: import, swamis, pick, slate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use swami_app::config::{self, Config};
use swami_app::db::Database;
use swami_app::import;
use swami_app::schedule::{GameRow, PickGrade};
use swami_app::slate;
use swami_core::game::parse_week;
use swami_core::{Prediction, Swami};

#[derive(Parser)]
#[command(name = "swami")]
#[command(about = "Football picks from configurable statistical swamis", long_about = None)]
struct Cli {
    /// Database file (overrides config/swami.toml)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import teams and games from CSV
    Import {
        /// Teams CSV (defaults to data_paths.teams)
        #[arg(long)]
        teams: Option<PathBuf>,
        /// Games CSV (defaults to data_paths.games)
        #[arg(long)]
        games: Option<PathBuf>,
    },
    /// List configured swamis
    Swamis,
    /// Predict a single game with one swami
    Pick {
        swami: String,
        game_id: i64,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Record the pick in the database
        #[arg(long)]
        save: bool,
    },
    /// Predict every game of a week
    Slate {
        #[arg(long)]
        season: u16,
        /// Week number or playoff round (WildCard, Division, ConfChamp, SuperBowl)
        #[arg(long)]
        week: String,
        /// Only these swamis (repeatable; default all)
        #[arg(long = "swami")]
        swamis: Vec<String>,
        /// Record picks in the database
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("swami starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: {} swamis", config.swamis.len());

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let db = open_database(&db_path)?;
    info!("Database opened at {}", db_path.display());

    match cli.command {
        Commands::Import { teams, games } => cmd_import(&config, &db, teams, games),
        Commands::Swamis => {
            cmd_swamis(&config);
            Ok(())
        }
        Commands::Pick {
            swami,
            game_id,
            json,
            save,
        } => cmd_pick(&config, &db, &swami, game_id, json, save),
        Commands::Slate {
            season,
            week,
            swamis,
            save,
        } => cmd_slate(&config, &db, season, &week, &swamis, save).await,
    }
}

fn open_database(path: &Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Database::open(&path.to_string_lossy()).context("failed to open database")
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_import(
    config: &Config,
    db: &Database,
    teams: Option<PathBuf>,
    games: Option<PathBuf>,
) -> anyhow::Result<()> {
    let teams = teams.unwrap_or_else(|| PathBuf::from(&config.data_paths.teams));
    let games = games.unwrap_or_else(|| PathBuf::from(&config.data_paths.games));
    let (n_teams, n_games) = import::import_files(db, &teams, &games)?;
    println!("Imported {n_teams} teams and {n_games} games");
    Ok(())
}

fn cmd_swamis(config: &Config) {
    for swami in &config.swamis {
        let criteria: Vec<&str> = swami.criteria().iter().map(|c| c.name()).collect();
        println!(
            "{:<14} {:<14} {:<22} [{}]",
            swami.name(),
            swami.strategy().name(),
            format!("{:?}", swami.policy()),
            criteria.join(", ")
        );
        if let Some(about) = swami.about_me() {
            println!("{:<14} {about}", "");
        }
    }
}

/// JSON shape of `pick --json`.
#[derive(Serialize)]
struct PickReport<'a> {
    swami: &'a str,
    game: &'a GameRow,
    prediction: &'a Prediction,
    grade: Option<PickGrade>,
}

fn cmd_pick(
    config: &Config,
    db: &Database,
    swami_name: &str,
    game_id: i64,
    json: bool,
    save: bool,
) -> anyhow::Result<()> {
    let swami = find_swami(config, swami_name)?;
    let Some(game) = db.game(game_id)? else {
        bail!("no game with id {game_id}");
    };

    let prediction = swami
        .predict(db, &game.matchup())
        .with_context(|| format!("{} could not pick {}", swami.name(), game.label()))?;
    let grade = prediction.pick().and_then(|p| game.grade(p));

    if json {
        let report = PickReport {
            swami: swami.name(),
            game: &game,
            prediction: &prediction,
            grade,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{:<10} {:<9} {}{}",
            swami.name(),
            game.label(),
            prediction,
            describe(grade)
        );
    }

    if save {
        save_prediction(db, swami.name(), game_id, &prediction)?;
    }
    Ok(())
}

async fn cmd_slate(
    config: &Config,
    db: &Database,
    season: u16,
    week: &str,
    names: &[String],
    save: bool,
) -> anyhow::Result<()> {
    let Some(week) = parse_week(week) else {
        bail!("invalid week `{week}`");
    };
    let swamis: Vec<Swami> = if names.is_empty() {
        config.swamis.clone()
    } else {
        names
            .iter()
            .map(|n| find_swami(config, n).cloned())
            .collect::<anyhow::Result<_>>()?
    };

    let games = db.slate(season, week)?;
    if games.is_empty() {
        bail!("no games scheduled for season {season} week {week}");
    }
    let corpus = Arc::new(db.load_corpus()?);

    let entries = slate::run_slate(corpus, &games, &swamis).await;
    let mut failures = 0usize;
    for entry in &entries {
        match &entry.outcome {
            Ok(prediction) => {
                let grade = prediction.pick().and_then(|p| entry.game.grade(p));
                println!(
                    "{:<10} {:<9} {}{}",
                    entry.swami,
                    entry.game.label(),
                    prediction,
                    describe(grade)
                );
                if save {
                    save_prediction(db, &entry.swami, entry.game.game_id, prediction)?;
                }
            }
            Err(e) => {
                failures += 1;
                println!("{:<10} {:<9} error: {e:#}", entry.swami, entry.game.label());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} predictions failed", entries.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_swami<'a>(config: &'a Config, name: &str) -> anyhow::Result<&'a Swami> {
    match config.swami(name) {
        Some(swami) => Ok(swami),
        None => {
            let known: Vec<&str> = config.swamis.iter().map(|s| s.name()).collect();
            bail!("unknown swami `{name}` (configured: {})", known.join(", "))
        }
    }
}

fn save_prediction(
    db: &Database,
    swami: &str,
    game_id: i64,
    prediction: &Prediction,
) -> anyhow::Result<()> {
    if let Some(pick) = prediction.pick() {
        db.record_pick(swami, game_id, pick)?;
    }
    Ok(())
}

fn describe(grade: Option<PickGrade>) -> String {
    let verdict = |v: Option<bool>| match v {
        Some(true) => "right",
        Some(false) => "wrong",
        None => "n/a",
    };
    match grade {
        Some(g) => format!("  [SU {}, ATS {}]", verdict(g.su), verdict(g.ats)),
        None => String::new(),
    }
}

/// Initialize tracing to log to a file, keeping stdout for command output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("swami.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("swami_core=info,swami_app=info,swami=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
