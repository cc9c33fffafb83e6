mod test_utils;

use chrono::NaiveDate;
use test_utils::{entity, setup_store};
use trendwatch::config::ScorerConfig;
use trendwatch::scorer::{Scorer, ScoringWeights};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

fn config(top_n: usize) -> ScorerConfig {
    ScorerConfig {
        top_n,
        ..ScorerConfig::default()
    }
}

#[tokio::test]
async fn ranking_is_contiguous_and_score_descending() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    store.save_entity(&entity("a/slow", Some(5), None, 100, 2, 1))?;
    store.save_entity(&entity("b/fast", Some(500), Some(2000), 9000, 300, 40))?;
    store.save_entity(&entity("c/mid", Some(80), Some(400), 800, 20, 10))?;
    store.save_entity(&entity("d/idle", None, None, 50, 0, 0))?;

    let report = Scorer::new(store.clone(), config(0)).run(date(16)).await?;
    assert_eq!(report.scored, 4);
    assert_eq!(report.ranked, 4);
    assert_eq!(report.updated, 4);
    assert_eq!(report.failed, 0);

    let ranking = store.load_ranking(date(16))?;
    assert_eq!(ranking.total, 4);
    let ranks: Vec<u32> = ranking.items.iter().map(|item| item.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
    assert!(
        ranking
            .items
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score)
    );
    assert_eq!(ranking.items[0].entity_id, "b__fast");
    assert_eq!(ranking.items[3].entity_id, "d__idle");
    assert_eq!(ranking.items[3].score, 0.0);

    let stored = store.load_entity("b__fast")?;
    assert_eq!(stored.rank, Some(1));
    assert_eq!(stored.score, ranking.items[0].score);
    Ok(())
}

#[tokio::test]
async fn single_entity_at_every_maximum_scores_weight_total() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    store.save_entity(&entity("solo/top", Some(10), Some(70), 20, 4, 2))?;

    Scorer::new(store.clone(), config(100)).run(date(16)).await?;

    let expected = (ScoringWeights::default().total() * 10_000.0).round() / 100.0;
    assert_eq!(store.load_entity("solo__top")?.score, expected);
    Ok(())
}

#[tokio::test]
async fn rank_change_tracks_previous_day() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    store.save_entity(&entity("a/one", Some(100), None, 10, 0, 0))?;
    store.save_entity(&entity("b/two", Some(50), None, 10, 0, 0))?;

    let scorer = Scorer::new(store.clone(), config(0));
    scorer.run(date(15)).await?;
    assert_eq!(store.load_ranking(date(15))?.rank_of("b__two"), Some(2));

    // b/two overtakes a/one and a newcomer appears.
    store.save_entity(&entity("b/two", Some(400), None, 10, 0, 0))?;
    store.save_entity(&entity("c/new", Some(10), None, 10, 0, 0))?;
    scorer.run(date(16)).await?;

    let ranking = store.load_ranking(date(16))?;
    let change = |id: &str| {
        ranking
            .items
            .iter()
            .find(|item| item.entity_id == id)
            .and_then(|item| item.rank_change)
    };
    assert_eq!(ranking.rank_of("b__two"), Some(1));
    assert_eq!(change("b__two"), Some(1));
    assert_eq!(change("a__one"), Some(-1));
    assert_eq!(change("c__new"), None);

    // Re-running the same day still compares against the previous day.
    scorer.run(date(16)).await?;
    let rerun = store.load_ranking(date(16))?;
    assert_eq!(rerun.items[0].rank_change, Some(1));
    Ok(())
}

#[tokio::test]
async fn entities_outside_top_n_lose_their_rank() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    let mut stale = entity("c/low", Some(1), None, 10, 0, 0);
    stale.rank = Some(1);
    store.save_entity(&stale)?;
    store.save_entity(&entity("a/high", Some(100), None, 10, 0, 0))?;
    store.save_entity(&entity("b/mid", Some(50), None, 10, 0, 0))?;

    let report = Scorer::new(store.clone(), config(2)).run(date(16)).await?;
    assert_eq!(report.scored, 3);
    assert_eq!(report.ranked, 2);

    let low = store.load_entity("c__low")?;
    assert_eq!(low.rank, None);
    assert_eq!(low.score, 0.35);
    assert_eq!(store.load_ranking(date(16))?.total, 2);
    Ok(())
}

#[tokio::test]
async fn archived_entities_are_excluded() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    let mut archived = entity("old/repo", Some(999), None, 10_000, 500, 50);
    archived.is_archived = true;
    archived.rank = Some(1);
    archived.score = 88.0;
    store.save_entity(&archived)?;
    store.save_entity(&entity("new/repo", Some(5), None, 10, 1, 1))?;

    Scorer::new(store.clone(), config(0)).run(date(16)).await?;

    let ranking = store.load_ranking(date(16))?;
    assert_eq!(ranking.total, 1);
    assert_eq!(ranking.items[0].entity_id, "new__repo");

    let archived = store.load_entity("old__repo")?;
    assert_eq!(archived.rank, None);
    assert_eq!(archived.score, 88.0);
    Ok(())
}

#[tokio::test]
async fn ranked_entities_get_a_scored_snapshot() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    store.save_entity(&entity("a/one", Some(100), None, 10, 0, 0))?;
    store.save_entity(&entity("b/two", Some(50), None, 10, 0, 0))?;

    Scorer::new(store.clone(), config(1)).run(date(16)).await?;

    let events = store.load_snapshots(date(16))?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_id, "a__one");
    assert_eq!(events[0].rank, Some(1));
    assert_eq!(events[0].score, Some(35.0));
    assert_eq!(events[0].daily_stars, Some(100));
    Ok(())
}

#[tokio::test]
async fn empty_store_writes_nothing() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    let report = Scorer::new(store.clone(), config(0)).run(date(16)).await?;
    assert_eq!(report.scored, 0);
    assert!(store.load_latest_ranking()?.is_none());
    Ok(())
}
