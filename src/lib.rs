// src/lib.rs
//! Catalog acquisition for e-commerce listings: numbered pages over HTTP,
//! click-to-load listings and variant pickers through a WebDriver session.

pub mod aggregator;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod scroll;
pub mod selectors;
pub mod sink;
pub mod variants;
pub mod wait;
pub mod webdriver;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

pub use aggregator::{CategoryAggregator, CategoryReport};
pub use browser::{BrowserSession, ElementHandle};
pub use config::{CrawlConfig, LimitsConfig};
pub use error::{BrowserError, Result, ScraperError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use model::{Category, CategoryConfig, LoadingStrategy, Product, RatingStrategy, VariantPrices};
pub use sink::{CsvSink, RecordSink, read_products};
pub use wait::{WaitPolicy, Waiter};
pub use webdriver::{WebDriverConfig, WebDriverSession};

#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reports: Vec<CategoryReport>,
}

impl CrawlSummary {
    pub fn all_succeeded(&self) -> bool {
        self.reports.iter().all(CategoryReport::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CategoryReport> {
        self.reports.iter().filter(|r| !r.succeeded())
    }
}

/// Crawls `categories` into CSV files under `config.output_dir`.
///
/// A WebDriver session is started only when some category needs a browser and is
/// closed again before returning. If it cannot be started, browser categories
/// fail with `BrowserUnavailable` and the others still run.
pub async fn run_crawl(
    config: &CrawlConfig,
    categories: &[CategoryConfig],
    cancel: CancellationToken,
) -> Result<CrawlSummary> {
    let run_id = Uuid::new_v4();
    let span = info_span!("crawl", %run_id);

    async move {
        let started_at = Utc::now();
        info!(categories = categories.len(), output_dir = %config.output_dir.display(), "starting crawl");

        let fetcher = HttpFetcher::new(&config.user_agent, config.request_timeout())?;
        let sink = CsvSink::new(&config.output_dir);
        let waiter = Waiter::new(config.wait, cancel);

        let mut session = None;
        if categories.iter().any(|c| c.strategy.needs_browser()) {
            match WebDriverSession::start(&config.webdriver).await {
                Ok(started) => session = Some(started),
                Err(e) => error!(url = %config.webdriver.url, error = %e, "could not start webdriver session"),
            }
        }

        let mut aggregator = CategoryAggregator::new(&fetcher, sink, config.limits, waiter);
        if let Some(session) = session.as_mut() {
            aggregator = aggregator.with_session(session);
        }
        let reports = aggregator.run_all(categories).await;
        drop(aggregator);

        if let Some(session) = session {
            if let Err(e) = session.quit().await {
                warn!(error = %e, "failed to close webdriver session");
            }
        }

        let summary = CrawlSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            reports,
        };
        info!(
            succeeded = summary.reports.len() - summary.failures().count(),
            failed = summary.failures().count(),
            "crawl finished"
        );
        Ok::<CrawlSummary, ScraperError>(summary)
    }
    .instrument(span)
    .await
}
