use gamification_engine::db::DbPool;
use gamification_engine::engine::Engine;
use gamification_engine::models::leaderboard::Timeframe;
use rusqlite::named_params;
use tempfile::tempdir;

fn setup_engine() -> (Engine, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("test.sqlite");
    let pool = DbPool::new(db_path).expect("db pool");
    (Engine::new(pool), dir)
}

#[test]
fn test_rank_recomputed_after_every_upsert() {
    let (engine, _dir) = setup_engine();

    engine.upsert_score("alice", None, 300).unwrap();
    engine.upsert_score("bob", None, 500).unwrap();
    engine.upsert_score("carol", None, 100).unwrap();

    let rows = engine.get_leaderboard(None, None, None).unwrap();
    let ranked: Vec<(&str, i64)> = rows
        .iter()
        .map(|row| (row.user_id.as_str(), row.rank))
        .collect();
    assert_eq!(ranked, vec![("bob", 1), ("alice", 2), ("carol", 3)]);

    // Carol overtakes everyone; every rank shifts.
    engine.upsert_score("carol", None, 900).unwrap();
    let rows = engine.get_leaderboard(None, None, None).unwrap();
    assert_eq!(rows[0].user_id, "carol");
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[1].user_id, "bob");
    assert_eq!(rows[1].rank, 2);
    assert_eq!(rows[2].user_id, "alice");
    assert_eq!(rows[2].rank, 3);
}

#[test]
fn test_score_overwrite_and_tie_determinism() {
    let (engine, _dir) = setup_engine();

    // {A:300, B:500, B:500 (overwrite), C:100}: the second B write replaces
    // the first rather than stacking.
    engine.upsert_score("A", None, 300).unwrap();
    engine.upsert_score("B", None, 500).unwrap();
    engine.upsert_score("B", None, 500).unwrap();
    engine.upsert_score("C", None, 100).unwrap();

    let first = engine.get_leaderboard(None, None, None).unwrap();
    assert_eq!(first.len(), 3);
    assert!(first.windows(2).all(|pair| pair[0].score >= pair[1].score));

    // A second pass over unchanged inputs yields the identical ordering.
    engine.upsert_score("C", None, 100).unwrap();
    let second = engine.get_leaderboard(None, None, None).unwrap();
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.user_id, b.user_id);
        assert_eq!(a.rank, b.rank);
    }
}

#[test]
fn test_timeframe_excludes_stale_entries() {
    let (engine, _dir) = setup_engine();

    engine.upsert_score("fresh", None, 100).unwrap();
    engine.upsert_score("stale", None, 900).unwrap();

    // Age one entry past the weekly cutoff directly in the store.
    engine
        .db_pool()
        .with_connection(|conn| {
            conn.execute(
                "UPDATE leaderboard_entries SET updated_at = :when WHERE user_id = 'stale'",
                named_params! {":when": "2020-01-01T00:00:00+00:00"},
            )?;
            Ok(())
        })
        .unwrap();

    let weekly = engine
        .get_leaderboard(None, Some(Timeframe::Weekly), None)
        .unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].user_id, "fresh");
    // Ranks are dense within the filtered view.
    assert_eq!(weekly[0].rank, 1);

    let all_time = engine.get_leaderboard(None, None, None).unwrap();
    assert_eq!(all_time.len(), 2);
}

#[test]
fn test_monthly_window_reaches_past_weekly() {
    let (engine, _dir) = setup_engine();

    engine.upsert_score("recent", None, 100).unwrap();
    engine.upsert_score("mid_month", None, 900).unwrap();

    // Backdate one entry 20 days: outside the weekly window, inside monthly.
    let backdated = (chrono::Utc::now() - chrono::Duration::days(20)).to_rfc3339();
    engine
        .db_pool()
        .with_connection(|conn| {
            conn.execute(
                "UPDATE leaderboard_entries SET updated_at = :when WHERE user_id = 'mid_month'",
                named_params! {":when": backdated},
            )?;
            Ok(())
        })
        .unwrap();

    let weekly = engine
        .get_leaderboard(None, Some(Timeframe::Weekly), None)
        .unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].user_id, "recent");

    let monthly = engine
        .get_leaderboard(None, Some(Timeframe::Monthly), None)
        .unwrap();
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0].user_id, "mid_month");
}

#[test]
fn test_concurrent_upserts_keep_ranks_dense() {
    let (engine, _dir) = setup_engine();

    let mut handles = Vec::new();
    for index in 0..4i64 {
        let engine = engine.clone();
        handles.push(std::thread::spawn(move || {
            for round in 0..5i64 {
                let user = format!("user{index}");
                engine.upsert_score(&user, None, index * 100 + round).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let rows = engine.get_leaderboard(None, None, Some(100)).unwrap();
    let ranks: Vec<i64> = rows.iter().map(|row| row.rank).collect();
    let expected: Vec<i64> = (1..=rows.len() as i64).collect();
    assert_eq!(ranks, expected);
}
