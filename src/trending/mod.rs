//! # Trending Listing Fetcher
//!
//! Downloads the trending HTML page for a period (and optional language) and
//! turns it into [`ListingItem`]s. Requests share one [`RequestThrottle`] and
//! a bounded number of in-flight requests.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::{GitHubConfig, ScraperConfig};
use crate::credentials::CredentialRotator;
use crate::models::Period;
use crate::throttle::RequestThrottle;

pub mod parse;

pub use parse::{ListingItem, parse_count, parse_listing};

/// Failure fetching a listing page. Fatal for the invocation that hit it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid listing URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("listing request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("listing fetch task aborted: {0}")]
    Aborted(String),
}

/// One page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub period: Period,
    pub language: Option<String>,
}

impl ListingQuery {
    pub fn new(period: Period, language: Option<String>) -> Self {
        Self {
            period,
            language: language.filter(|lang| !lang.trim().is_empty()),
        }
    }
}

/// Fetches and parses trending listing pages.
#[derive(Clone)]
pub struct TrendingFetcher {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialRotator>,
    throttle: Arc<RequestThrottle>,
    permits: Arc<Semaphore>,
}

impl TrendingFetcher {
    pub fn new(
        client: reqwest::Client,
        github: &GitHubConfig,
        scraper: &ScraperConfig,
        credentials: Arc<CredentialRotator>,
    ) -> Self {
        let throttle = RequestThrottle::new(
            Duration::from_millis(scraper.min_request_interval_ms),
            Duration::from_millis(scraper.request_jitter_ms),
        );

        Self {
            client,
            base_url: github.trending_url.trim_end_matches('/').to_string(),
            credentials,
            throttle: Arc::new(throttle),
            permits: Arc::new(Semaphore::new(scraper.max_concurrent_requests.max(1))),
        }
    }

    /// Build the page URL: `<base>[/<language>]?since=<period>`.
    pub fn listing_url(&self, query: &ListingQuery) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)?;
        if let Some(language) = &query.language {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().push(&language.to_lowercase());
        }
        url.query_pairs_mut()
            .append_pair("since", query.period.as_str());
        Ok(url)
    }

    /// Fetch and parse one listing page.
    #[instrument(skip(self), fields(period = %query.period, language = ?query.language))]
    pub async fn fetch(&self, query: &ListingQuery) -> Result<Vec<ListingItem>, FetchError> {
        let url = self.listing_url(query)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| FetchError::Aborted(err.to_string()))?;
        self.throttle.acquire().await;

        info!(url = %url, "Fetching trending listing");
        let mut request = self
            .client
            .get(url.clone())
            .header("Accept", "text/html");
        if let Some(token) = self.credentials.next() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Trending listing request failed");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        let items = parse_listing(&body);
        info!(url = %url, items = items.len(), "Parsed trending listing");
        Ok(items)
    }

    /// Fetch several pages concurrently (bounded by the configured permits).
    ///
    /// Results are returned in the order of `queries`.
    pub async fn fetch_many(
        &self,
        queries: Vec<ListingQuery>,
    ) -> Vec<(ListingQuery, Result<Vec<ListingItem>, FetchError>)> {
        let mut tasks = JoinSet::new();
        for (index, query) in queries.iter().cloned().enumerate() {
            let fetcher = self.clone();
            tasks.spawn(async move {
                let result = fetcher.fetch(&query).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<Vec<ListingItem>, FetchError>>> =
            queries.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => warn!(error = %err, "Listing fetch task failed to join"),
            }
        }

        queries
            .into_iter()
            .zip(results)
            .map(|(query, result)| {
                let result = result
                    .unwrap_or_else(|| Err(FetchError::Aborted("task did not complete".into())));
                (query, result)
            })
            .collect()
    }
}

/// Concatenate pages, keeping the first occurrence of each repository.
pub fn dedupe_items(pages: Vec<Vec<ListingItem>>) -> Vec<ListingItem> {
    let mut seen = std::collections::HashSet::new();
    pages
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.full_name.to_lowercase()))
        .collect()
}
