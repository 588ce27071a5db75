// Integration tests for the swami app.
//
// These exercise the full path from CSV fixtures through the SQLite store to
// predictions: import, corpus access (live database and in-memory snapshot),
// the concurrent slate runner, pick persistence, and grading.

use std::path::Path;
use std::sync::Arc;

use swami_app::db::Database;
use swami_app::import;
use swami_app::slate::run_slate;
use swami_core::{DataError, Pick, PredictError, Prediction, Stage, Swami, SwamiParams};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

fn imported_db() -> Database {
    let db = Database::open(":memory:").expect("in-memory database should open");
    let fixtures = Path::new(FIXTURES);
    import::import_files(&db, &fixtures.join("teams.csv"), &fixtures.join("games.csv"))
        .expect("fixtures should import");
    db
}

fn swami(name: &str, strategy: &str, criteria: &[&str]) -> Swami {
    let params = SwamiParams {
        strategy: Some(strategy.into()),
        criteria: Some(criteria.iter().map(|c| c.to_string()).collect()),
        ..Default::default()
    };
    Swami::build(name, &params).expect("valid swami")
}

fn lineup() -> Vec<Swami> {
    vec![
        swami("CyberSeason", "vs_all", &["wins", "pts"]),
        swami("Grudge", "vs_team", &["wins", "pts"]),
        swami("Vegas", "las_vegas", &[]),
    ]
}

// ===========================================================================
// Import
// ===========================================================================

#[test]
fn csv_import_loads_all_fixture_data() {
    let db = imported_db();
    assert_eq!(db.teams().unwrap().len(), 8);
    assert_eq!(db.num_games().unwrap(), 16);

    let week4 = db.slate(2023, 4).unwrap();
    assert_eq!(week4.len(), 4);
    assert!(week4.iter().all(|g| g.result.is_none()));

    let pick_line = db.game(8).unwrap().unwrap();
    assert_eq!(pick_line.pt_spread, Some(0.0));

    let corpus = db.load_corpus().unwrap();
    assert_eq!(corpus.num_games(), 12);
    assert_eq!(corpus.num_unplayed(), 4);
}

// ===========================================================================
// Predictions
// ===========================================================================

#[test]
fn live_database_and_snapshot_agree() {
    let db = imported_db();
    let snapshot = db.load_corpus().unwrap();
    for game in db.slate(2023, 4).unwrap() {
        for s in lineup() {
            let live = s.predict(&db, &game.matchup()).unwrap();
            let cached = s.predict(&snapshot, &game.matchup()).unwrap();
            assert_eq!(live, cached, "{} on {}", s.name(), game.label());
        }
    }
}

#[test]
fn known_week_four_picks() {
    let db = imported_db();
    let game = db.game(13).unwrap().unwrap();
    let ctx = game.matchup();
    let [season, grudge, vegas] = lineup().try_into().unwrap();

    // KC 3-0 (+20) at LV 0-3; KC by 7 does not cover 8.5.
    assert_eq!(
        season.predict(&db, &ctx).unwrap(),
        Prediction::Pick(Pick::new("KC", Some("LV"), 7, 45))
    );
    // Only the week 1 meeting counts: KC by 14 covers.
    assert_eq!(
        grudge.predict(&db, &ctx).unwrap(),
        Prediction::Pick(Pick::new("KC", Some("KC"), 14, 48))
    );
    assert_eq!(
        vegas.predict(&db, &ctx).unwrap(),
        Prediction::Pick(Pick::new("KC", None, 9, 45))
    );
}

/// Schedule a week 5 game while the week 4 games still have no results.
fn import_week_five(db: &Database) {
    let week5 = "game_id,season,week,datetime,home_team,away_team,neutral_site,pt_spread,over_under,home_pts,away_pts,home_yds,away_yds,home_tos,away_tos\n\
                 17,2023,5,2023-10-08 13:00,KC,MIA,0,-3,50,,,,,,\n";
    let rows = import::load_games_from_reader(week5.as_bytes()).unwrap();
    db.import_games(&rows).unwrap();
}

#[test]
fn unplayed_game_inside_history_is_a_data_error() {
    let db = imported_db();
    import_week_five(&db);

    let game = db.game(17).unwrap().unwrap();
    let err = lineup()[0].predict(&db, &game.matchup()).unwrap_err();
    assert_eq!(err.stage, Stage::Selecting);
    assert!(matches!(err.source, DataError::Malformed { game_id: 13, .. }));
}

#[tokio::test]
async fn slate_reports_the_same_gap_as_a_single_pick() {
    let db = imported_db();
    import_week_five(&db);
    let games = db.slate(2023, 5).unwrap();
    let corpus = Arc::new(db.load_corpus().unwrap());

    let entries = run_slate(corpus, &games, &lineup()).await;
    assert_eq!(entries.len(), 3);

    // Both analysis swamis hit the unplayed week 4 game.
    for entry in &entries[..2] {
        let err = entry.outcome.as_ref().expect_err("history has a gap");
        let predict = err.downcast_ref::<PredictError>().expect("a prediction error");
        assert_eq!(predict.stage, Stage::Selecting);
        assert!(matches!(predict.source, DataError::Malformed { game_id: 13, .. }));
    }
    // Following the line needs no history.
    assert_eq!(
        entries[2].outcome.as_ref().unwrap(),
        &Prediction::Pick(Pick::new("KC", None, 3, 50))
    );
}

// ===========================================================================
// Slate runner and persistence
// ===========================================================================

#[tokio::test]
async fn slate_runs_every_pair_and_records_picks() {
    let db = imported_db();
    let games = db.slate(2023, 4).unwrap();
    let swamis = lineup();
    let corpus = Arc::new(db.load_corpus().unwrap());

    let entries = run_slate(corpus, &games, &swamis).await;
    assert_eq!(entries.len(), games.len() * swamis.len());
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.game.game_id, games[i / swamis.len()].game_id);
        assert_eq!(entry.swami, swamis[i % swamis.len()].name());
        let prediction = entry.outcome.as_ref().expect("every prediction succeeds");
        let pick = prediction.pick().expect("home-team tie-break always picks");
        db.record_pick(&entry.swami, entry.game.game_id, pick).unwrap();
    }

    let saved = db.load_picks(13).unwrap();
    let names: Vec<&str> = saved.iter().map(|p| p.swami.as_str()).collect();
    assert_eq!(names, vec!["CyberSeason", "Grudge", "Vegas"]);
    assert_eq!(saved[0].pick, Pick::new("KC", Some("LV"), 7, 45));
}

#[test]
fn picks_are_graded_once_results_arrive() {
    let db = imported_db();
    let pick = Pick::new("KC", Some("LV"), 7, 45);
    assert_eq!(db.game(13).unwrap().unwrap().grade(&pick), None);

    // KC wins 17-13: a straight-up win that does not cover 8.5.
    let result = "game_id,season,week,datetime,home_team,away_team,neutral_site,pt_spread,over_under,home_pts,away_pts,home_yds,away_yds,home_tos,away_tos\n\
                  13,2023,4,2023-10-01 13:00,LV,KC,0,+8.5,45,13,17,310,330,1,1\n";
    db.import_games(&import::load_games_from_reader(result.as_bytes()).unwrap())
        .unwrap();

    let grade = db.game(13).unwrap().unwrap().grade(&pick).unwrap();
    assert_eq!(grade.su, Some(true));
    assert_eq!(grade.ats, Some(true));
}
