//! # Scrape Pipeline
//!
//! One scrape run: fetch the listing, pre-filter with the keyword classifier,
//! then enrich and persist candidates one at a time. Per-entity failures are
//! logged and counted; only a failed listing fetch aborts the run.

use std::sync::Arc;

use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::classifier;
use crate::enricher::{Candidate, Enricher};
use crate::error::PipelineError;
use crate::models::{Period, SnapshotEvent, Taxonomy, TrackedEntity};
use crate::store::DataStore;
use crate::trending::{ListingItem, ListingQuery, TrendingFetcher, dedupe_items};

/// What a scrape run should cover.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub period: Period,
    /// Empty means the all-languages listing only.
    pub languages: Vec<String>,
    /// Log candidates without calling the metadata API or writing anything.
    pub dry_run: bool,
}

impl ScrapeOptions {
    fn queries(&self) -> Vec<ListingQuery> {
        if self.languages.is_empty() {
            return vec![ListingQuery::new(self.period, None)];
        }
        self.languages
            .iter()
            .map(|language| ListingQuery::new(self.period, Some(language.clone())))
            .collect()
    }
}

/// Outcome counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub listed: usize,
    pub candidates: usize,
    pub saved: usize,
    pub snapshots: usize,
    pub failed: usize,
    pub cancelled: bool,
}

pub struct ScrapePipeline {
    fetcher: TrendingFetcher,
    enricher: Enricher,
    store: DataStore,
    taxonomy: Arc<Taxonomy>,
    options: ScrapeOptions,
}

impl ScrapePipeline {
    pub fn new(
        fetcher: TrendingFetcher,
        enricher: Enricher,
        store: DataStore,
        taxonomy: Arc<Taxonomy>,
        options: ScrapeOptions,
    ) -> Self {
        Self {
            fetcher,
            enricher,
            store,
            taxonomy,
            options,
        }
    }

    /// Run once for `today`. Cancellation is checked before each entity.
    #[instrument(skip_all, fields(period = %self.options.period, dry_run = self.options.dry_run))]
    pub async fn run(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();

        let mut pages = Vec::new();
        for (query, result) in self.fetcher.fetch_many(self.options.queries()).await {
            match result {
                Ok(items) => pages.push(items),
                Err(err) => {
                    warn!(language = ?query.language, error = %err, "Listing fetch failed, aborting run");
                    return Err(err.into());
                }
            }
        }

        let items = dedupe_items(pages);
        report.listed = items.len();

        let candidates = prefilter(items, &self.taxonomy);
        report.candidates = candidates.len();
        info!(
            listed = report.listed,
            candidates = report.candidates,
            "Trending listing pre-filtered"
        );

        if self.options.dry_run {
            for candidate in &candidates {
                info!(
                    full_name = %candidate.item.full_name,
                    rank = candidate.item.rank,
                    period_stars = candidate.item.period_stars,
                    category = ?classifier::primary(&candidate.matches).map(|m| m.slug.as_str()),
                    "Dry run candidate"
                );
            }
            return Ok(report);
        }

        for candidate in &candidates {
            if cancel.is_cancelled() {
                info!(
                    processed = report.saved + report.failed,
                    remaining = report.candidates - report.saved - report.failed,
                    "Scrape run cancelled"
                );
                report.cancelled = true;
                break;
            }

            match self.enricher.enrich(candidate, self.options.period, today).await {
                Ok(entity) => {
                    report.saved += 1;
                    counter!("trendwatch_entities_saved_total").increment(1);
                    if self.record_snapshot(&entity, today) {
                        report.snapshots += 1;
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    counter!("trendwatch_entities_failed_total").increment(1);
                    warn!(
                        full_name = %candidate.item.full_name,
                        error = %err,
                        "Failed to enrich candidate"
                    );
                }
            }
        }

        info!(
            listed = report.listed,
            candidates = report.candidates,
            saved = report.saved,
            snapshots = report.snapshots,
            failed = report.failed,
            cancelled = report.cancelled,
            "Scrape run completed"
        );
        Ok(report)
    }

    fn record_snapshot(&self, entity: &TrackedEntity, today: NaiveDate) -> bool {
        let mut event = SnapshotEvent::capture(entity, today);
        if self.options.period == Period::Daily {
            event.daily_stars = entity.daily_stars();
        }

        match self.store.append_snapshot(&event) {
            Ok(()) => true,
            Err(err) => {
                warn!(entity_id = %entity.id, error = %err, "Failed to append snapshot");
                false
            }
        }
    }
}

/// Keep listing items matching at least one category by name or description.
pub fn prefilter(items: Vec<ListingItem>, taxonomy: &Taxonomy) -> Vec<Candidate> {
    items
        .into_iter()
        .filter_map(|item| {
            let matches =
                classifier::match_by_text(&item.full_name, item.description.as_deref(), taxonomy);
            (!matches.is_empty()).then_some(Candidate { item, matches })
        })
        .collect()
}

/// Load the taxonomy a run depends on; absence is fatal.
pub fn load_taxonomy(store: &DataStore) -> Result<Arc<Taxonomy>, PipelineError> {
    let taxonomy = store.load_taxonomy().map_err(PipelineError::Taxonomy)?;
    info!(categories = taxonomy.len(), "Taxonomy loaded");
    Ok(Arc::new(taxonomy))
}
