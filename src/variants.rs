// src/variants.rs
use tracing::{debug, warn};

use crate::browser::{BrowserSession, ElementHandle};
use crate::error::{Result, ScraperError};
use crate::extract::parse_price;
use crate::model::VariantPrices;
use crate::selectors::browser as css;
use crate::wait::{Condition, Waiter};

/// Walks the variant picker of a product detail page and records the price
/// displayed for each selectable option.
///
/// The session is left on the last activated option. Every call navigates
/// first, so resolving the same product twice is always safe.
pub struct VariantPriceResolver {
    waiter: Waiter,
}

impl VariantPriceResolver {
    pub fn new(waiter: Waiter) -> Self {
        Self { waiter }
    }

    /// Fails with `ElementNotFound` only when the page has no picker or the picker has no
    /// options. An option or price node that disappears partway through is `VariantLost`.
    pub async fn resolve(&self, session: &mut dyn BrowserSession, detail_url: &str) -> Result<VariantPrices> {
        session.navigate(detail_url).await?;

        let container = session
            .find(css::SWATCHES)
            .await?
            .ok_or_else(|| ScraperError::not_found(css::SWATCHES))?;
        let options = session.find_all_within(&container, css::SWATCH_BUTTON).await?;
        if options.is_empty() {
            return Err(ScraperError::not_found(format!("{} {}", css::SWATCHES, css::SWATCH_BUTTON)));
        }

        let mut prices = VariantPrices::new();
        for (index, option) in options.iter().enumerate() {
            self.waiter.check_cancelled()?;
            match self.read_option(session, detail_url, option).await {
                Ok(Some((label, price))) => {
                    prices.insert(label, price);
                }
                Ok(None) => {}
                Err(e) if e.is_element_not_found() => {
                    return Err(ScraperError::VariantLost {
                        url: detail_url.to_string(),
                        index,
                        resolved: prices.len(),
                        source: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(prices)
    }

    /// Selects one option and reads the price it shows. `None` for a disabled option.
    async fn read_option(
        &self,
        session: &mut dyn BrowserSession,
        detail_url: &str,
        option: &ElementHandle,
    ) -> Result<Option<(String, f64)>> {
        let label = option_label(session, option).await?;
        if !session.is_enabled(option).await? {
            debug!(detail_url, %label, "skipping disabled variant");
            return Ok(None);
        }

        session.click(option).await?;
        let active = Condition::ClassPresent { element: option, class: css::SWATCH_ACTIVE_CLASS };
        match self.waiter.wait_for(session, active).await {
            Ok(()) => {}
            Err(ScraperError::WaitTimeout { .. }) => {
                warn!(detail_url, %label, "variant never showed as selected, reading price anyway");
            }
            Err(e) => return Err(e),
        }

        let price = displayed_price(session).await?;
        debug!(detail_url, %label, price, "variant price");
        Ok(Some((label, price)))
    }
}

async fn option_label(session: &mut dyn BrowserSession, option: &ElementHandle) -> Result<String> {
    match session.attribute(option, css::SWATCH_VALUE_ATTR).await? {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Ok(session.text(option).await?.trim().to_string()),
    }
}

async fn displayed_price(session: &mut dyn BrowserSession) -> Result<f64> {
    let node = session
        .find(css::DETAIL_PRICE)
        .await?
        .ok_or_else(|| ScraperError::not_found(css::DETAIL_PRICE))?;
    parse_price(&session.text(&node).await?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::browser::fakes::{FakeBrowser, FakeSwatch};
    use crate::wait::WaitPolicy;

    const DETAIL: &str = "https://shop.test/product/31";

    fn resolver() -> VariantPriceResolver {
        let policy = WaitPolicy {
            poll_interval: Duration::from_millis(50),
            timeout: Duration::from_millis(400),
            retries: 0,
        };
        VariantPriceResolver::new(Waiter::new(policy, CancellationToken::new()))
    }

    fn swatches() -> Vec<FakeSwatch> {
        vec![
            FakeSwatch { value: "A", enabled: true, price: 1178.99 },
            FakeSwatch { value: "B", enabled: false, price: 1188.99 },
            FakeSwatch { value: "C", enabled: true, price: 1198.99 },
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_variants_are_skipped() {
        let mut browser = FakeBrowser::detail(swatches(), 1099.0);

        let prices = resolver().resolve(&mut browser, DETAIL).await.unwrap();

        assert_eq!(
            prices,
            VariantPrices::from([("A".to_string(), 1178.99), ("C".to_string(), 1198.99)])
        );
        assert_eq!(browser.clicks, ["swatch-0", "swatch-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_picker_is_element_not_found() {
        let mut browser = FakeBrowser::default();

        let err = resolver().resolve(&mut browser, DETAIL).await.unwrap_err();
        assert!(err.is_element_not_found());

        let mut empty = FakeBrowser::detail(Vec::new(), 10.0);
        let err = resolver().resolve(&mut empty, DETAIL).await.unwrap_err();
        assert!(err.is_element_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn price_node_vanishing_midway_is_a_hard_error() {
        let mut browser = FakeBrowser {
            price_reads_left: Some(1),
            ..FakeBrowser::detail(swatches(), 1099.0)
        };

        let err = resolver().resolve(&mut browser, DETAIL).await.unwrap_err();

        assert!(!err.is_element_not_found());
        assert!(matches!(
            err,
            ScraperError::VariantLost { index: 2, resolved: 1, ref source, .. }
                if matches!(**source, ScraperError::ElementNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn price_is_read_even_when_selection_never_shows() {
        let mut browser = FakeBrowser {
            inert_swatches: true,
            ..FakeBrowser::detail(swatches(), 1099.0)
        };

        let prices = resolver().resolve(&mut browser, DETAIL).await.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices["C"], 1198.99);
    }

    #[tokio::test(start_paused = true)]
    async fn every_call_navigates_first() {
        let mut browser = FakeBrowser::detail(swatches(), 1099.0);
        let resolver = resolver();

        let first = resolver.resolve(&mut browser, DETAIL).await.unwrap();
        let second = resolver.resolve(&mut browser, DETAIL).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(browser.navigations, [DETAIL, DETAIL]);
    }
}
