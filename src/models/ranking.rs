//! Daily ranking artifact (`rankings/<date>.json`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingArtifact {
    pub date: NaiveDate,
    pub total: usize,
    pub items: Vec<RankingItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingItem {
    pub rank: u32,
    pub entity_id: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub stars: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_stars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_stars: Option<u64>,
    pub score: f64,
    /// Previous rank minus current rank; absent for new entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_change: Option<i64>,
}

impl RankingArtifact {
    /// Rank of `entity_id` in this artifact, if listed.
    pub fn rank_of(&self, entity_id: &str) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.entity_id == entity_id)
            .map(|item| item.rank)
    }
}
