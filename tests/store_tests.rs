mod test_utils;

use chrono::NaiveDate;
use test_utils::{entity, setup_store, write_taxonomy};
use trendwatch::models::{
    Analysis, CategoryMatch, RankingArtifact, RankingItem, SnapshotEvent, snapshot,
};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

fn ranking(day: u32, ids: &[&str]) -> RankingArtifact {
    let items = ids
        .iter()
        .enumerate()
        .map(|(index, id)| RankingItem {
            rank: index as u32 + 1,
            entity_id: id.to_string(),
            full_name: id.replace("__", "/"),
            summary: None,
            language: None,
            category: None,
            stars: 10,
            daily_stars: None,
            weekly_stars: None,
            score: 50.0 - index as f64,
            rank_change: None,
        })
        .collect::<Vec<_>>();
    RankingArtifact {
        date: date(day),
        total: items.len(),
        items,
    }
}

#[test]
fn saved_entity_round_trips_without_leftovers() -> anyhow::Result<()> {
    let (dir, store) = setup_store()?;

    let mut original = entity("acme/llm-kit", Some(120), Some(900), 1500, 80, 7);
    original.description = Some("LLM toolkit".into());
    original.score = 73.21;
    original.rank = Some(2);
    original.category = Some("llm".into());
    original.categories = vec![
        CategoryMatch::new("llm", 0.8),
        CategoryMatch::new("rag", 1.0),
    ];
    original.analysis = Some(Analysis {
        status: "draft".into(),
        model: "reviewer".into(),
        summary: "Toolkit for LLM apps".into(),
        positioning: Some("batteries included".into()),
        features: vec![],
        use_cases: None,
        generated_at: test_utils::fixed_time(),
        reviewed_at: None,
    });

    store.save_entity(&original)?;
    let loaded = store.load_entity("acme__llm-kit")?;
    assert_eq!(loaded, original);

    // Overwrite and make sure only the final file remains.
    original.metrics.stars = 1499;
    store.save_entity(&original)?;
    assert_eq!(store.load_entity("acme__llm-kit")?.metrics.stars, 1499);

    let files: Vec<String> = std::fs::read_dir(dir.path().join("projects"))?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(files, vec!["acme__llm-kit.json".to_string()]);
    Ok(())
}

#[test]
fn entity_file_uses_snake_case_and_omits_absent_fields() -> anyhow::Result<()> {
    let (dir, store) = setup_store()?;
    store.save_entity(&entity("acme/bare", None, None, 5, 0, 0))?;

    let raw = std::fs::read_to_string(dir.path().join("projects/acme__bare.json"))?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(value["full_name"], "acme/bare");
    assert_eq!(value["stars"], 5);
    assert!(value.get("trending").is_none());
    assert!(value.get("analysis").is_none());
    assert!(value.get("rank").is_none());
    assert!(raw.contains('\n'), "entity files are indented");
    Ok(())
}

#[test]
fn list_entities_returns_every_saved_record_in_name_order() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    assert!(store.list_entities()?.is_empty());

    store.save_entity(&entity("zeta/one", None, None, 1, 0, 0))?;
    store.save_entity(&entity("alpha/two", None, None, 2, 0, 0))?;

    let ids: Vec<String> = store.list_entities()?.into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["alpha__two".to_string(), "zeta__one".to_string()]);
    Ok(())
}

#[test]
fn snapshots_append_and_latest_line_wins() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    let first = entity("acme/llm-kit", Some(10), None, 100, 5, 1);
    let mut second = first.clone();
    second.metrics.stars = 140;

    store.append_snapshot(&SnapshotEvent::capture(&first, date(15)))?;
    store.append_snapshot(&SnapshotEvent::capture(&entity("b/x", None, None, 3, 0, 0), date(15)))?;
    store.append_snapshot(&SnapshotEvent::capture(&second, date(15)))?;

    let events = store.load_snapshots(date(15))?;
    assert_eq!(events.len(), 3);

    let latest = snapshot::latest_per_entity(events);
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].entity_id, "acme__llm-kit");
    assert_eq!(latest[0].stars, 140);
    Ok(())
}

#[test]
fn loading_a_day_without_events_is_empty() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    assert!(store.load_snapshots(date(1))?.is_empty());
    Ok(())
}

#[test]
fn corrupt_snapshot_lines_are_skipped() -> anyhow::Result<()> {
    let (dir, store) = setup_store()?;
    store.append_snapshot(&SnapshotEvent::capture(&entity("a/one", None, None, 1, 0, 0), date(15)))?;

    let path = dir.path().join("snapshots/2026-10-15.jsonl");
    let mut raw = std::fs::read(&path)?;
    raw.extend_from_slice(b"{\"entity_id\":\"\xff\xfe\"\n");
    raw.extend_from_slice(b"not json at all\n\n");
    std::fs::write(&path, raw)?;

    store.append_snapshot(&SnapshotEvent::capture(&entity("b/two", None, None, 2, 0, 0), date(15)))?;

    let events = store.load_snapshots(date(15))?;
    let ids: Vec<&str> = events.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["a__one", "b__two"]);
    Ok(())
}

#[test]
fn latest_ranking_is_the_greatest_date() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    assert!(store.load_latest_ranking()?.is_none());

    store.save_ranking(&ranking(14, &["a__x", "b__y"]))?;
    store.save_ranking(&ranking(16, &["b__y"]))?;
    store.save_ranking(&ranking(15, &["c__z"]))?;

    assert_eq!(store.ranking_dates()?, vec![date(14), date(15), date(16)]);
    assert_eq!(store.load_latest_ranking()?.map(|r| r.date), Some(date(16)));
    assert_eq!(
        store.load_latest_ranking_before(date(16))?.map(|r| r.date),
        Some(date(15))
    );
    assert!(store.load_latest_ranking_before(date(14))?.is_none());
    assert_eq!(store.load_ranking(date(14))?.rank_of("b__y"), Some(2));
    Ok(())
}

#[test]
fn taxonomy_loads_from_data_dir() -> anyhow::Result<()> {
    let (_dir, store) = setup_store()?;
    assert!(store.load_taxonomy().unwrap_err().is_not_found());

    write_taxonomy(&store)?;
    let taxonomy = store.load_taxonomy()?;
    assert_eq!(taxonomy.len(), 4);
    assert_eq!(taxonomy.matchable().count(), 3);
    Ok(())
}
