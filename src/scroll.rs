// src/scroll.rs
//! Click-to-load traversal of a single rendered listing.

use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, ElementHandle};
use crate::error::{Result, ScraperError};
use crate::selectors::browser as css;
use crate::wait::{Condition, Waiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    BannerCheck,
    LoadMore,
    Done,
}

#[derive(Debug, Clone)]
pub struct ScrollOutcome {
    /// Page source once no load-more control remains.
    pub html: String,
    pub cycles: u32,
}

/// Clicks the cookie-consent banner away when it is present and visible.
pub async fn dismiss_cookie_banner(session: &mut dyn BrowserSession) -> Result<bool> {
    let Some(banner) = session.find(css::ACCEPT_COOKIES).await? else {
        return Ok(false);
    };
    if !session.is_visible(&banner).await? {
        return Ok(false);
    }
    session.click(&banner).await?;
    debug!("dismissed cookie banner");
    Ok(true)
}

pub struct ScrollController {
    waiter: Waiter,
    max_cycles: Option<u32>,
}

impl ScrollController {
    pub fn new(waiter: Waiter, max_cycles: Option<u32>) -> Self {
        Self { waiter, max_cycles }
    }

    /// Navigates to `url` and clicks load-more until it is gone.
    pub async fn load_all(&self, session: &mut dyn BrowserSession, url: &str) -> Result<ScrollOutcome> {
        let mut state = ScrollState::Idle;
        let mut cycles = 0;
        while state != ScrollState::Done {
            state = match state {
                ScrollState::Idle => {
                    session.navigate(url).await?;
                    ScrollState::BannerCheck
                }
                ScrollState::BannerCheck => {
                    self.waiter.check_cancelled()?;
                    match dismiss_cookie_banner(session).await {
                        Err(e) if !e.is_element_not_found() => return Err(e),
                        _ => ScrollState::LoadMore,
                    }
                }
                ScrollState::LoadMore => match self.load_more(session, cycles).await {
                    Ok(true) => {
                        cycles += 1;
                        debug!(url, cycles, "loaded more entries");
                        ScrollState::BannerCheck
                    }
                    Ok(false) => ScrollState::Done,
                    Err(e) if e.is_element_not_found() => {
                        debug!(url, error = %e, "load-more control went away");
                        ScrollState::Done
                    }
                    Err(e) => return Err(e),
                },
                ScrollState::Done => ScrollState::Done,
            };
        }

        let html = session.page_source().await?;
        info!(url, cycles, "listing fully loaded");
        Ok(ScrollOutcome { html, cycles })
    }

    /// One cycle. `Ok(false)` when there is no visible control left to click.
    async fn load_more(&self, session: &mut dyn BrowserSession, cycles: u32) -> Result<bool> {
        let Some(button) = session.find(css::LOAD_MORE).await? else {
            return Ok(false);
        };
        if !session.is_visible(&button).await? {
            return Ok(false);
        }
        if let Some(limit) = self.max_cycles {
            if cycles >= limit {
                return Err(ScraperError::MaxIterationsExceeded { what: "scroll", limit });
            }
        }

        let baseline = session.find_all(css::ENTRY).await?.len();
        let retries = self.waiter.policy().retries;
        let mut attempt = 0;
        loop {
            session.click(&button).await?;
            match self.await_growth(session, &button, baseline).await {
                Ok(()) => return Ok(true),
                Err(ScraperError::WaitTimeout { .. }) if attempt < retries => {
                    attempt += 1;
                    warn!(baseline, attempt, retries, "no new entries after load-more, clicking again");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn await_growth(
        &self,
        session: &mut dyn BrowserSession,
        button: &ElementHandle,
        baseline: usize,
    ) -> Result<()> {
        let conditions = [
            Condition::CountExceeds { selector: css::ENTRY, baseline },
            Condition::Hidden(button),
        ];
        self.waiter.wait_for_any(session, &conditions).await
    }
}
