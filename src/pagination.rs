// src/pagination.rs
//! Sequential fetch + extract over a statically numbered page range.

use futures::stream::{self, StreamExt, TryStreamExt};
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, ScraperError};
use crate::extract;
use crate::fetch::PageFetcher;
use crate::model::{CatalogEntry, RatingStrategy};
use crate::selectors::listing;

/// Total page count from the first page's pagination control; 1 when there is none.
///
/// The second-to-last item of the control is the last numbered page.
pub fn page_count(document: &Html) -> Result<u32> {
    let Some(pagination) = document.select(&listing::PAGINATION).next() else {
        return Ok(1);
    };
    let items: Vec<_> = pagination.select(&listing::PAGINATION_ITEM).collect();
    let label = items
        .len()
        .checked_sub(2)
        .map(|i| items[i].text().collect::<String>())
        .ok_or_else(|| ScraperError::parse("page count", pagination.html()))?;
    label
        .trim()
        .parse()
        .map_err(|_| ScraperError::parse("page count", label))
}

pub struct PaginationController<'a> {
    fetcher: &'a dyn PageFetcher,
    max_pages: Option<u32>,
    cancel: CancellationToken,
}

impl<'a> PaginationController<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, max_pages: Option<u32>, cancel: CancellationToken) -> Self {
        Self { fetcher, max_pages, cancel }
    }

    /// All entries of a category, page order then DOM order. Any failed page aborts the lot.
    pub async fn collect(&self, url: &str, rating: RatingStrategy) -> Result<Vec<CatalogEntry>> {
        let body = self.fetcher.fetch(url, &[]).await?;
        let (total, mut entries) = {
            let document = Html::parse_document(&body);
            (page_count(&document)?, extract::parse_page(&document, rating)?)
        };

        if let Some(limit) = self.max_pages {
            if total > limit {
                return Err(ScraperError::MaxIterationsExceeded { what: "pagination", limit });
            }
        }
        info!(url, pages = total, first_page_products = entries.len(), "discovered pages");

        let rest: Vec<Vec<CatalogEntry>> = stream::iter(2..=total)
            .then(|page| self.fetch_page(url, page, rating))
            .try_collect()
            .await?;
        entries.extend(rest.into_iter().flatten());
        Ok(entries)
    }

    async fn fetch_page(&self, url: &str, page: u32, rating: RatingStrategy) -> Result<Vec<CatalogEntry>> {
        if self.cancel.is_cancelled() {
            return Err(ScraperError::Cancelled);
        }
        debug!(url, page, "parsing page");
        let body = self.fetcher.fetch(url, &[("page", page.to_string())]).await?;
        let document = Html::parse_document(&body);
        extract::parse_page(&document, rating)
    }
}
