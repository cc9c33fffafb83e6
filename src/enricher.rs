//! # Enricher
//!
//! Turns a pre-filtered listing candidate into a persisted [`TrackedEntity`]:
//! remote metadata, topic classification, merge with the stored record, and
//! an atomic save.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument, warn};

use crate::classifier;
use crate::connectors::{MetadataSource, RemoteRepository};
use crate::error::EnrichError;
use crate::models::{
    CategoryMatch, EntityMetrics, Period, Taxonomy, TrackedEntity, TrendingSignal, derive_id,
    split_full_name,
};
use crate::store::DataStore;
use crate::trending::ListingItem;

/// Listing row that passed the keyword pre-filter.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item: ListingItem,
    pub matches: Vec<CategoryMatch>,
}

pub struct Enricher {
    metadata: Arc<dyn MetadataSource>,
    store: DataStore,
    taxonomy: Arc<Taxonomy>,
}

impl Enricher {
    pub fn new(metadata: Arc<dyn MetadataSource>, store: DataStore, taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            metadata,
            store,
            taxonomy,
        }
    }

    /// Enrich and persist one candidate.
    #[instrument(skip_all, fields(full_name = %candidate.item.full_name, period = %period))]
    pub async fn enrich(
        &self,
        candidate: &Candidate,
        period: Period,
        today: NaiveDate,
    ) -> Result<TrackedEntity, EnrichError> {
        let full_name = candidate.item.full_name.as_str();
        let (owner, name) = split_full_name(full_name)
            .ok_or_else(|| EnrichError::InvalidName(full_name.to_string()))?;

        let remote = self
            .metadata
            .repository(owner, name)
            .await
            .map_err(|source| EnrichError::Metadata {
                full_name: full_name.to_string(),
                source,
            })?;

        let topics = match self.metadata.topics(owner, name).await {
            Ok(topics) => topics,
            Err(err) => {
                warn!(full_name, error = %err, "Failed to fetch topics, continuing without");
                Vec::new()
            }
        };

        let topic_matches = classifier::match_by_topics(&topics, &self.taxonomy);
        let matches = classifier::merge(&candidate.matches, &topic_matches);

        let id = derive_id(full_name);
        let existing = match self.store.load_entity(&id) {
            Ok(entity) => Some(entity),
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                warn!(entity_id = %id, error = %err, "Existing record unreadable, treating as new");
                None
            }
        };

        let now = Utc::now();
        let fresh = build_entity(&candidate.item, &remote, topics, matches, period, today, now);
        let entity = apply_merge_rule(fresh, existing.as_ref(), period, now);

        self.store
            .save_entity(&entity)
            .map_err(|source| EnrichError::Store {
                id: entity.id.clone(),
                source,
            })?;

        debug!(
            entity_id = %entity.id,
            stars = entity.metrics.stars,
            category = ?entity.category,
            "Entity saved"
        );
        Ok(entity)
    }
}

/// Record built purely from this run's observations.
pub fn build_entity(
    item: &ListingItem,
    remote: &RemoteRepository,
    topics: Vec<String>,
    matches: Vec<CategoryMatch>,
    period: Period,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> TrackedEntity {
    let mut entity = TrackedEntity::new(item.full_name.clone(), now);

    entity.description = non_empty(remote.description.as_deref());
    entity.language = non_empty(remote.language.as_deref());
    entity.license = remote.spdx_id().map(str::to_string);
    entity.homepage = non_empty(remote.homepage.as_deref());
    entity.topics = topics;
    entity.metrics = EntityMetrics {
        stars: remote.stargazers_count,
        forks: remote.forks_count,
        open_issues: remote.open_issues_count,
        watchers: remote.watchers_count,
    };
    entity.is_archived = remote.archived;
    entity.pushed_at = remote.pushed_at;
    entity.created_at_remote = remote.created_at;
    entity.category = classifier::primary(&matches).map(|m| m.slug.clone());
    entity.categories = matches;

    let gain = (item.period_stars > 0).then_some(item.period_stars);
    entity.trending = Some(TrendingSignal {
        daily_stars: gain.filter(|_| period == Period::Daily),
        weekly_stars: gain.filter(|_| period == Period::Weekly),
        listing_rank: Some(item.rank),
        last_seen_trending: Some(today),
    });

    entity
}

/// Reconcile a fresh record with what was stored before.
///
/// Score, rank, analysis and `first_seen_at` carry over. On a daily fetch the
/// stored weekly gain is kept; a weekly fetch does not keep the daily gain.
pub fn apply_merge_rule(
    mut fresh: TrackedEntity,
    existing: Option<&TrackedEntity>,
    period: Period,
    now: DateTime<Utc>,
) -> TrackedEntity {
    fresh.updated_at = now;

    let Some(existing) = existing else {
        fresh.first_seen_at = now;
        return fresh;
    };

    fresh.first_seen_at = existing.first_seen_at;
    fresh.score = existing.score;
    fresh.rank = existing.rank;
    if existing.analysis.is_some() {
        fresh.analysis = existing.analysis.clone();
    }

    if period == Period::Daily {
        if let Some(weekly) = existing.weekly_stars() {
            fresh.trending.get_or_insert_with(TrendingSignal::default).weekly_stars = Some(weekly);
        }
    }

    fresh
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
