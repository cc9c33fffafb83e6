//! # trendwatch
//!
//! Discovers trending repositories, classifies them against a keyword
//! taxonomy, enriches them with GitHub metadata and produces a daily ranking
//! with rank-change deltas. Everything is persisted as JSON files under a
//! data directory.

pub mod classifier;
pub mod config;
pub mod connectors;
pub mod credentials;
pub mod enricher;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scorer;
pub mod store;
pub mod telemetry;
pub mod throttle;
pub mod trending;
