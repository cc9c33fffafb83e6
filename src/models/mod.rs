//! # Data Models
//!
//! Durable records shared by the scrape pipeline, the store and the scorer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod entity;
pub mod ranking;
pub mod snapshot;
pub mod taxonomy;

pub use entity::{Analysis, CategoryMatch, EntityMetrics, TrackedEntity, TrendingSignal};
pub use ranking::{RankingArtifact, RankingItem};
pub use snapshot::SnapshotEvent;
pub use taxonomy::{Category, CategoryKeywords, FALLBACK_CATEGORY, Taxonomy};

/// Trending window the listing was fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a period selector is neither `daily` nor `weekly`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trending period '{0}', expected 'daily' or 'weekly'")]
pub struct ParsePeriodError(pub String);

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            _ => Err(ParsePeriodError(value.to_string())),
        }
    }
}

/// Derive the storage id for a two-part repository name (`owner/repo` -> `owner__repo`).
pub fn derive_id(full_name: &str) -> String {
    full_name.replace('/', "__")
}

/// Split `owner/repo` into its two parts, rejecting anything else.
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (owner, name) = full_name.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_id_replaces_separator() {
        assert_eq!(derive_id("owner/repo"), "owner__repo");
        assert_eq!(derive_id("owner/repo"), derive_id("owner/repo"));
        assert_eq!(derive_id("huggingface/transformers"), "huggingface__transformers");
    }

    #[test]
    fn split_full_name_requires_two_parts() {
        assert_eq!(split_full_name("a/b"), Some(("a", "b")));
        assert_eq!(split_full_name("a"), None);
        assert_eq!(split_full_name("/b"), None);
        assert_eq!(split_full_name("a/"), None);
        assert_eq!(split_full_name("a/b/c"), None);
    }

    #[test]
    fn period_parses_case_insensitively() {
        assert_eq!("Daily".parse::<Period>().unwrap(), Period::Daily);
        assert_eq!(" weekly ".parse::<Period>().unwrap(), Period::Weekly);
        assert!("monthly".parse::<Period>().is_err());
        assert_eq!(Period::Weekly.to_string(), "weekly");
    }
}
