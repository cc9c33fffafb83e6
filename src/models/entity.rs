//! Tracked entity model
//!
//! One durable record per discovered repository, stored as
//! `projects/<id>.json`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Repository tracked across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    /// Storage key derived from `full_name` (`owner__repo`)
    pub id: String,

    /// Two-part repository name (`owner/repo`)
    pub full_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// SPDX identifier of the license
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(flatten)]
    pub metrics: EntityMetrics,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_remote: Option<DateTime<Utc>>,

    /// Score in [0, 100], recomputed by every scoring run
    #[serde(default)]
    pub score: f64,

    /// 1-based position in the most recent ranking, when within the top-N
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    /// Primary category slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trending: Option<TrendingSignal>,

    /// Narrative analysis produced outside the pipeline; carried over untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,

    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cumulative counters reported by the metadata API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetrics {
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub watchers: u64,
}

/// Period-scoped figures observed on the trending listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_stars: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_stars: Option<u64>,

    /// Row position on the listing page the entity was last seen on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_rank: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_trending: Option<NaiveDate>,
}

/// Category assignment with a confidence in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMatch {
    pub slug: String,
    pub confidence: f64,
}

impl CategoryMatch {
    pub fn new(slug: impl Into<String>, confidence: f64) -> Self {
        Self {
            slug: slug.into(),
            confidence,
        }
    }
}

/// Narrative analysis attached to an entity by an external reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// draft | published | rejected
    pub status: String,
    pub model: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positioning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<AnalysisFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cases: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFeature {
    pub name: String,
    pub desc: String,
}

impl TrackedEntity {
    /// Create a bare record for `full_name` with zeroed metrics.
    pub fn new(full_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let full_name = full_name.into();
        Self {
            id: super::derive_id(&full_name),
            full_name,
            description: None,
            language: None,
            license: None,
            topics: Vec::new(),
            homepage: None,
            metrics: EntityMetrics::default(),
            is_archived: false,
            pushed_at: None,
            created_at_remote: None,
            score: 0.0,
            rank: None,
            category: None,
            categories: Vec::new(),
            trending: None,
            analysis: None,
            first_seen_at: now,
            updated_at: now,
        }
    }

    pub fn daily_stars(&self) -> Option<u64> {
        self.trending.as_ref().and_then(|t| t.daily_stars)
    }

    pub fn weekly_stars(&self) -> Option<u64> {
        self.trending.as_ref().and_then(|t| t.weekly_stars)
    }
}
