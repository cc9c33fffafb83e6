//! Snapshot event model
//!
//! One JSON line in `snapshots/<date>.jsonl`.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TrackedEntity;

/// Point-in-time metrics for one entity on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    pub entity_id: String,
    pub date: NaiveDate,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub watchers: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_stars: Option<u64>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl SnapshotEvent {
    /// Capture the counters of `entity` on `date` without score or rank.
    pub fn capture(entity: &TrackedEntity, date: NaiveDate) -> Self {
        Self {
            entity_id: entity.id.clone(),
            date,
            stars: entity.metrics.stars,
            forks: entity.metrics.forks,
            open_issues: entity.metrics.open_issues,
            watchers: entity.metrics.watchers,
            score: None,
            rank: None,
            daily_stars: None,
        }
    }

    /// Capture including the scoring outcome.
    pub fn capture_scored(entity: &TrackedEntity, date: NaiveDate) -> Self {
        Self {
            score: Some(entity.score),
            rank: entity.rank,
            daily_stars: entity.daily_stars(),
            ..Self::capture(entity, date)
        }
    }
}

/// Collapse duplicate lines, keeping the last one written for each entity.
///
/// Output order follows the first appearance of each entity.
pub fn latest_per_entity(events: Vec<SnapshotEvent>) -> Vec<SnapshotEvent> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<SnapshotEvent> = Vec::new();

    for event in events {
        match positions.get(&event.entity_id) {
            Some(&index) => latest[index] = event,
            None => {
                positions.insert(event.entity_id.clone(), latest.len());
                latest.push(event);
            }
        }
    }

    latest
}
