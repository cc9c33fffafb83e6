//! # Scorer
//!
//! Scores every non-archived entity from its trending gains, forks and open
//! issues, writes the day's ranking artifact and updates each entity's
//! `score` and `rank`.
//!
//! ```text
//! score = round2(100 * (w_daily * daily/max_daily
//!                     + w_weekly * weekly/max_weekly
//!                     + w_forks * forks/max_forks      (only when stars > 0)
//!                     + w_issues * issues/max_issues))
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::ScorerConfig;
use crate::error::StoreError;
use crate::models::{RankingArtifact, RankingItem, SnapshotEvent, TrackedEntity};
use crate::store::DataStore;

/// Factor weights. They are applied as given, not renormalised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub daily_stars: f64,
    pub weekly_stars: f64,
    pub forks: f64,
    pub issues: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            daily_stars: 0.35,
            weekly_stars: 0.25,
            forks: 0.15,
            issues: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.daily_stars + self.weekly_stars + self.forks + self.issues
    }
}

/// Outcome counters for one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub date: NaiveDate,
    pub scored: usize,
    pub ranked: usize,
    pub updated: usize,
    pub failed: usize,
}

impl ScoreReport {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            scored: 0,
            ranked: 0,
            updated: 0,
            failed: 0,
        }
    }
}

pub struct Scorer {
    store: DataStore,
    config: ScorerConfig,
}

impl Scorer {
    pub fn new(store: DataStore, config: ScorerConfig) -> Self {
        Self { store, config }
    }

    /// Score, rank and persist. Only listing the store or writing the
    /// ranking artifact can fail the run.
    #[instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> Result<ScoreReport, StoreError> {
        let (mut active, archived): (Vec<_>, Vec<_>) = self
            .store
            .list_entities()?
            .into_iter()
            .partition(|entity| !entity.is_archived);

        let mut report = ScoreReport::empty(today);
        if active.is_empty() {
            warn!("No active entities to score");
            self.clear_ranks(archived, &mut report);
            return Ok(report);
        }

        compute_scores(&mut active, &self.config.weights);
        active.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        report.scored = active.len();

        let top_n = effective_top_n(self.config.top_n, active.len());
        for (index, entity) in active.iter_mut().enumerate() {
            entity.rank = (index < top_n).then_some(index as u32 + 1);
        }

        let previous = match self.store.load_latest_ranking_before(today) {
            Ok(previous) => previous,
            Err(err) => {
                warn!(error = %err, "Previous ranking unreadable, treating every entry as new");
                None
            }
        };

        let ranking = build_ranking(&active[..top_n], today, previous.as_ref());
        self.store.save_ranking(&ranking)?;
        report.ranked = ranking.items.len();
        info!(date = %today, ranked = report.ranked, "Ranking saved");

        let now = Utc::now();
        for mut entity in active {
            entity.updated_at = now;
            match self.store.save_entity(&entity) {
                Ok(()) => report.updated += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(entity_id = %entity.id, error = %err, "Failed to persist score");
                    continue;
                }
            }

            if self.config.record_snapshots && entity.rank.is_some() {
                let event = SnapshotEvent::capture_scored(&entity, today);
                if let Err(err) = self.store.append_snapshot(&event) {
                    warn!(entity_id = %entity.id, error = %err, "Failed to append scored snapshot");
                }
            }
        }

        self.clear_ranks(archived, &mut report);

        counter!("trendwatch_entities_scored_total").increment(report.scored as u64);
        info!(
            date = %today,
            scored = report.scored,
            ranked = report.ranked,
            updated = report.updated,
            failed = report.failed,
            "Scoring run completed"
        );
        Ok(report)
    }

    /// Archived entities keep their last score but drop out of the ranking.
    fn clear_ranks(&self, archived: Vec<TrackedEntity>, report: &mut ScoreReport) {
        for mut entity in archived.into_iter().filter(|e| e.rank.is_some()) {
            entity.rank = None;
            entity.updated_at = Utc::now();
            match self.store.save_entity(&entity) {
                Ok(()) => {
                    debug!(entity_id = %entity.id, "Cleared rank of archived entity");
                    report.updated += 1;
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(entity_id = %entity.id, error = %err, "Failed to clear archived rank");
                }
            }
        }
    }
}

/// Assign `score` to every entity, normalising each factor by its maximum
/// across `entities`.
pub fn compute_scores(entities: &mut [TrackedEntity], weights: &ScoringWeights) {
    let max_of = |f: &dyn Fn(&TrackedEntity) -> f64| {
        let max = entities.iter().map(f).fold(0.0_f64, f64::max);
        if max > 0.0 { max } else { 1.0 }
    };

    let daily = |e: &TrackedEntity| e.daily_stars().unwrap_or(0) as f64;
    let weekly = |e: &TrackedEntity| e.weekly_stars().unwrap_or(0) as f64;
    let forks = |e: &TrackedEntity| e.metrics.forks as f64;
    let issues = |e: &TrackedEntity| e.metrics.open_issues as f64;

    let max_daily = max_of(&daily);
    let max_weekly = max_of(&weekly);
    let max_forks = max_of(&forks);
    let max_issues = max_of(&issues);

    for entity in entities.iter_mut() {
        let fork_norm = if entity.metrics.stars > 0 {
            forks(entity) / max_forks
        } else {
            0.0
        };

        let raw = weights.daily_stars * daily(entity) / max_daily
            + weights.weekly_stars * weekly(entity) / max_weekly
            + weights.forks * fork_norm
            + weights.issues * issues(entity) / max_issues;

        entity.score = round2(raw * 100.0);
    }
}

/// Ranking artifact for already sorted and ranked entities.
pub fn build_ranking(
    ranked: &[TrackedEntity],
    date: NaiveDate,
    previous: Option<&RankingArtifact>,
) -> RankingArtifact {
    let previous_ranks: HashMap<&str, u32> = previous
        .map(|artifact| {
            artifact
                .items
                .iter()
                .map(|item| (item.entity_id.as_str(), item.rank))
                .collect()
        })
        .unwrap_or_default();

    let items: Vec<RankingItem> = ranked
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            let rank = index as u32 + 1;
            RankingItem {
                rank,
                entity_id: entity.id.clone(),
                full_name: entity.full_name.clone(),
                summary: entity
                    .analysis
                    .as_ref()
                    .map(|analysis| analysis.summary.clone())
                    .filter(|summary| !summary.is_empty()),
                language: entity.language.clone(),
                category: entity.category.clone(),
                stars: entity.metrics.stars,
                daily_stars: entity.daily_stars(),
                weekly_stars: entity.weekly_stars(),
                score: entity.score,
                rank_change: previous_ranks
                    .get(entity.id.as_str())
                    .map(|&prev| i64::from(prev) - i64::from(rank)),
            }
        })
        .collect();

    RankingArtifact {
        date,
        total: items.len(),
        items,
    }
}

/// Divide by the maximum so the largest value maps to 1.0. A non-positive
/// maximum is treated as 1.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    values.iter().map(|v| v / max).collect()
}

/// Min-max scale onto 0..=100; a constant input maps every value to 50.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let (min, max) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range == 0.0 {
        return vec![50.0; values.len()];
    }

    values.iter().map(|v| (v - min) / range * 100.0).collect()
}

fn effective_top_n(top_n: usize, population: usize) -> usize {
    if top_n == 0 || top_n > population {
        population
    } else {
        top_n
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
