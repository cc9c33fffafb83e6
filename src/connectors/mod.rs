//! Connectors module
//!
//! Remote metadata sources used during enrichment. The enricher only sees the
//! [`MetadataSource`] trait so tests can swap in an in-memory source.

use async_trait::async_trait;

pub mod github;

pub use github::{GitHubClient, GitHubError, RateLimitInfo, RemoteLicense, RemoteRepository};

/// Authoritative repository metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Core repository fields (counts, archive flag, license, timestamps).
    async fn repository(&self, owner: &str, name: &str) -> Result<RemoteRepository, GitHubError>;

    /// Topic tags attached to the repository.
    async fn topics(&self, owner: &str, name: &str) -> Result<Vec<String>, GitHubError>;

    /// Decoded README text, `None` when the repository has no README.
    async fn readme(&self, owner: &str, name: &str) -> Result<Option<String>, GitHubError>;
}
