//! # trendwatch command line
//!
//! `scrape` refreshes entities from the trending listing, `score` rebuilds
//! today's ranking, `run` does both in sequence.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use trendwatch::config::{AppConfig, ConfigLoader};
use trendwatch::connectors::{GitHubClient, github};
use trendwatch::credentials::CredentialRotator;
use trendwatch::enricher::Enricher;
use trendwatch::models::Period;
use trendwatch::pipeline::{RunReport, ScrapeOptions, ScrapePipeline, load_taxonomy};
use trendwatch::scorer::{ScoreReport, Scorer};
use trendwatch::store::DataStore;
use trendwatch::telemetry::init_tracing;
use trendwatch::throttle::RequestThrottle;
use trendwatch::trending::TrendingFetcher;

#[derive(Parser)]
#[command(name = "trendwatch", version, about = "Trending repository tracker")]
struct Cli {
    /// Override TRENDWATCH_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the trending listing, enrich candidates and save them
    Scrape(ScrapeArgs),
    /// Score stored entities and write today's ranking
    Score,
    /// Scrape, then score
    Run(ScrapeArgs),
}

#[derive(Args)]
struct ScrapeArgs {
    /// Trending window: daily or weekly
    #[arg(long)]
    since: Option<Period>,

    /// Language listing to fetch; repeatable
    #[arg(long = "language")]
    languages: Vec<String>,

    /// List candidates without calling the API or writing files
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    init_tracing(&config).context("initializing tracing")?;
    info!(profile = %config.profile, data_dir = %config.data_dir.display(), "Configuration loaded");
    if let Ok(redacted) = config.redacted_json() {
        debug!(config = %redacted, "Effective configuration");
    }

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let store = DataStore::new(&config.data_dir);
    let today = Utc::now().date_naive();

    match cli.command {
        Command::Scrape(args) => {
            let report = scrape(&config, &store, args, today, &cancel).await?;
            print_report(&report)?;
        }
        Command::Score => {
            let report = score(&config, &store, today).await?;
            print_report(&report)?;
        }
        Command::Run(args) => {
            let dry_run = args.dry_run;
            let scrape_report = scrape(&config, &store, args, today, &cancel).await?;
            print_report(&scrape_report)?;

            if scrape_report.cancelled || dry_run {
                info!("Skipping scoring");
            } else {
                let score_report = score(&config, &store, today).await?;
                print_report(&score_report)?;
            }
        }
    }

    Ok(())
}

async fn scrape(
    config: &AppConfig,
    store: &DataStore,
    args: ScrapeArgs,
    today: NaiveDate,
    cancel: &CancellationToken,
) -> Result<RunReport> {
    let credentials = Arc::new(CredentialRotator::new(config.github.tokens.clone()));
    if credentials.count() == 0 {
        warn!("No GitHub tokens configured, requests are unauthenticated");
    }

    let http = github::http_client(&config.github).context("building HTTP client")?;
    let fetcher = TrendingFetcher::new(
        http.clone(),
        &config.github,
        &config.scraper,
        credentials.clone(),
    );
    let api_throttle = Arc::new(RequestThrottle::new(
        Duration::from_millis(config.github.api_min_interval_ms),
        Duration::ZERO,
    ));
    let client = GitHubClient::new(http, &config.github, credentials).with_throttle(api_throttle);

    let taxonomy = load_taxonomy(store)?;
    let enricher = Enricher::new(Arc::new(client), store.clone(), taxonomy.clone());

    let options = ScrapeOptions {
        period: args.since.unwrap_or(config.scraper.since),
        languages: if args.languages.is_empty() {
            config.scraper.languages.clone()
        } else {
            args.languages
        },
        dry_run: args.dry_run,
    };

    let pipeline = ScrapePipeline::new(fetcher, enricher, store.clone(), taxonomy, options);
    let report = pipeline
        .run(today, cancel)
        .await
        .context("scrape run failed")?;
    Ok(report)
}

async fn score(config: &AppConfig, store: &DataStore, today: NaiveDate) -> Result<ScoreReport> {
    let scorer = Scorer::new(store.clone(), config.scorer.clone());
    let report = scorer.run(today).await.context("scoring run failed")?;
    Ok(report)
}

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, finishing the current entity");
                cancel.cancel();
            }
            Err(err) => warn!(error = %err, "Failed to listen for interrupt"),
        }
    });
}
