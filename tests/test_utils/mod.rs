//! Shared fixtures for integration tests: temporary data directories,
//! taxonomy files, entity builders and trending page HTML.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;
use trendwatch::models::{Category, CategoryKeywords, TrackedEntity, TrendingSignal};
use trendwatch::store::DataStore;

/// Creates an empty data directory and a store rooted at it.
///
/// Keep the returned [`TempDir`] alive for the duration of the test.
pub fn setup_store() -> Result<(TempDir, DataStore)> {
    let dir = TempDir::new()?;
    let store = DataStore::new(dir.path());
    Ok((dir, store))
}

/// Writes a small AI taxonomy to `categories.json`.
pub fn write_taxonomy(store: &DataStore) -> Result<()> {
    let categories = vec![
        category("llm", 1, &["llm", "gpt"], &["language model", "llm"]),
        category("agent", 2, &["agent", "agents"], &["autonomous agent"]),
        category("rag", 3, &["rag"], &["retrieval"]),
        category("other", 99, &["ai"], &["artificial intelligence"]),
    ];
    std::fs::create_dir_all(store.root())?;
    std::fs::write(
        store.root().join("categories.json"),
        serde_json::to_vec_pretty(&categories)?,
    )?;
    Ok(())
}

fn category(slug: &str, sort_order: i32, topics: &[&str], description: &[&str]) -> Category {
    Category {
        slug: slug.to_string(),
        name: slug.to_uppercase(),
        description: format!("{slug} projects"),
        sort_order,
        keywords: CategoryKeywords {
            topics: topics.iter().map(|s| s.to_string()).collect(),
            description: description.iter().map(|s| s.to_string()).collect(),
        },
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap()
}

/// Entity with the counters the scorer looks at.
pub fn entity(
    full_name: &str,
    daily: Option<u64>,
    weekly: Option<u64>,
    stars: u64,
    forks: u64,
    open_issues: u64,
) -> TrackedEntity {
    let mut entity = TrackedEntity::new(full_name, fixed_time());
    entity.metrics.stars = stars;
    entity.metrics.forks = forks;
    entity.metrics.open_issues = open_issues;
    if daily.is_some() || weekly.is_some() {
        entity.trending = Some(TrendingSignal {
            daily_stars: daily,
            weekly_stars: weekly,
            ..TrendingSignal::default()
        });
    }
    entity
}

/// One row of a fake trending page.
pub struct Row<'a> {
    pub full_name: &'a str,
    pub description: &'a str,
    pub stars: &'a str,
    pub period_stars: &'a str,
}

/// Renders rows using the trending page markup.
pub fn trending_page(rows: &[Row<'_>]) -> String {
    let body: String = rows
        .iter()
        .map(|row| {
            format!(
                r#"<article class="Box-row">
                  <h2 class="h3 lh-condensed"><a href="/{name}">{name}</a></h2>
                  <p class="col-9 color-fg-muted my-1 pr-4">{description}</p>
                  <div class="f6 color-fg-muted mt-2">
                    <span itemprop="programmingLanguage">Python</span>
                    <a class="Link--muted d-inline-block mr-3" href="/{name}/stargazers">{stars}</a>
                    <a class="Link--muted d-inline-block mr-3" href="/{name}/forks">12</a>
                    <span class="d-inline-block float-sm-right">{period} stars today</span>
                  </div>
                </article>"#,
                name = row.full_name,
                description = row.description,
                stars = row.stars,
                period = row.period_stars,
            )
        })
        .collect();
    format!("<html><body><div class=\"Box\">{body}</div></body></html>")
}

/// `GET /repos/{owner}/{repo}` payload.
pub fn repo_json(full_name: &str, stars: u64) -> serde_json::Value {
    json!({
        "full_name": full_name,
        "description": "Fixture repository",
        "language": "Python",
        "license": { "spdx_id": "Apache-2.0" },
        "homepage": "",
        "stargazers_count": stars,
        "forks_count": stars / 10,
        "open_issues_count": 3,
        "watchers_count": stars,
        "archived": false,
        "pushed_at": "2026-10-14T10:00:00Z",
        "created_at": "2025-02-01T00:00:00Z"
    })
}
