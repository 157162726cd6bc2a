// src/aggregator.rs
use std::path::PathBuf;

use scraper::Html;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;

use crate::browser::BrowserSession;
use crate::config::LimitsConfig;
use crate::error::{Result, ScraperError};
use crate::extract;
use crate::fetch::PageFetcher;
use crate::model::{Category, CatalogEntry, CategoryConfig, LoadingStrategy, Product, VariantPrices};
use crate::pagination::PaginationController;
use crate::scroll::ScrollController;
use crate::sink::RecordSink;
use crate::variants::VariantPriceResolver;
use crate::wait::Waiter;

/// Outcome of one category within a multi-category run.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryReport {
    pub name: String,
    pub strategy: LoadingStrategy,
    pub products: usize,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl CategoryReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Crawls categories one at a time and hands each finished list to the sink.
pub struct CategoryAggregator<'s, K> {
    fetcher: &'s dyn PageFetcher,
    session: Option<&'s mut dyn BrowserSession>,
    sink: K,
    limits: LimitsConfig,
    waiter: Waiter,
}

impl<'s, K: RecordSink> CategoryAggregator<'s, K> {
    pub fn new(fetcher: &'s dyn PageFetcher, sink: K, limits: LimitsConfig, waiter: Waiter) -> Self {
        Self {
            fetcher,
            session: None,
            sink,
            limits,
            waiter,
        }
    }

    pub fn with_session(mut self, session: &'s mut dyn BrowserSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Crawls one category and writes it to the sink.
    pub async fn run(&mut self, category: &CategoryConfig) -> Result<Vec<Product>> {
        self.crawl(category).await.map(|(products, _)| products)
    }

    /// Crawls every category in order. A failed category is reported and the next one still runs.
    pub async fn run_all(&mut self, categories: &[CategoryConfig]) -> Vec<CategoryReport> {
        let mut reports = Vec::with_capacity(categories.len());
        for category in categories {
            let span = info_span!("category", name = %category.name);
            let outcome = self.crawl(category).instrument(span).await;
            let report = match outcome {
                Ok((products, path)) => CategoryReport {
                    name: category.name.clone(),
                    strategy: category.strategy,
                    products: products.len(),
                    output: Some(path),
                    error: None,
                },
                Err(e) => {
                    error!(category = %category.name, error = %e, "category failed");
                    CategoryReport {
                        name: category.name.clone(),
                        strategy: category.strategy,
                        products: 0,
                        output: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }
        reports
    }

    async fn crawl(&mut self, category: &CategoryConfig) -> Result<(Vec<Product>, PathBuf)> {
        self.waiter.check_cancelled()?;
        if category.strategy.needs_browser() && self.session.is_none() {
            return Err(ScraperError::BrowserUnavailable(category.name.clone()));
        }
        info!(category = %category.name, url = %category.url, strategy = ?category.strategy, "crawling category");

        let entries = self.collect(category).await?;
        let products = if category.strategy.resolves_variants() {
            self.resolve_variants(category, entries).await?
        } else {
            entries.into_iter().map(|entry| entry.product).collect()
        };

        let record = Category {
            name: category.name.clone(),
            url: category.url.clone(),
            variant_bearing: category.strategy.resolves_variants(),
            products,
        };
        let path = self.sink.write(&record)?;
        Ok((record.products, path))
    }

    async fn collect(&mut self, category: &CategoryConfig) -> Result<Vec<CatalogEntry>> {
        let rating = category.rating_strategy();
        match category.strategy {
            LoadingStrategy::Paginated | LoadingStrategy::Variants => {
                PaginationController::new(self.fetcher, self.limits.max_pages(), self.waiter.cancel_token())
                    .collect(&category.url, rating)
                    .await
            }
            LoadingStrategy::InfiniteScroll => {
                let session = self
                    .session
                    .as_deref_mut()
                    .ok_or_else(|| ScraperError::BrowserUnavailable(category.name.clone()))?;
                let outcome = ScrollController::new(self.waiter.clone(), self.limits.max_scroll_cycles())
                    .load_all(session, &category.url)
                    .await?;
                let document = Html::parse_document(&outcome.html);
                extract::parse_page(&document, rating)
            }
        }
    }

    /// Attaches a variant map to every product. A detail page without a picker yields an empty map.
    async fn resolve_variants(&mut self, category: &CategoryConfig, entries: Vec<CatalogEntry>) -> Result<Vec<Product>> {
        let base = Url::parse(&category.url)?;
        let session = self
            .session
            .as_deref_mut()
            .ok_or_else(|| ScraperError::BrowserUnavailable(category.name.clone()))?;
        let resolver = VariantPriceResolver::new(self.waiter.clone());

        let mut products = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut product = entry.product;
            let prices = match entry.detail_href {
                Some(href) => {
                    let detail = base.join(&href)?;
                    match resolver.resolve(session, detail.as_str()).await {
                        Ok(prices) => prices,
                        Err(e) if e.is_element_not_found() => {
                            debug!(title = %product.title, url = %detail, "no variant picker");
                            VariantPrices::new()
                        }
                        Err(e) => return Err(e),
                    }
                }
                None => {
                    warn!(title = %product.title, "entry has no detail link");
                    VariantPrices::new()
                }
            };
            product.variant_prices = Some(prices);
            products.push(product);
        }
        Ok(products)
    }
}
