// src/wait.rs
//! Poll-until-condition waits against a browser session.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserSession, ElementHandle, has_class};
use crate::error::{BrowserError, Result, ScraperError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
    #[serde(with = "millis", rename = "poll_interval_ms")]
    pub poll_interval: Duration,
    #[serde(with = "millis", rename = "timeout_ms")]
    pub timeout: Duration,
    /// Extra attempts a caller may spend (e.g. re-clicking) after a timed-out wait.
    pub retries: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(10),
            retries: 2,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Something observable on the live page.
#[derive(Debug, Clone)]
pub enum Condition<'a> {
    /// More than `baseline` elements match `selector`.
    CountExceeds { selector: &'a str, baseline: usize },
    /// The element is not displayed, or no longer attached.
    Hidden(&'a ElementHandle),
    /// The element's class list contains `class`.
    ClassPresent { element: &'a ElementHandle, class: &'a str },
}

impl Condition<'_> {
    async fn holds(&self, session: &mut dyn BrowserSession) -> Result<bool, BrowserError> {
        match *self {
            Condition::CountExceeds { selector, baseline } => {
                Ok(session.find_all(selector).await?.len() > baseline)
            }
            Condition::Hidden(element) => match session.is_visible(element).await {
                Ok(visible) => Ok(!visible),
                Err(BrowserError::NoSuchElement(_) | BrowserError::StaleElement(_)) => Ok(true),
                Err(e) => Err(e),
            },
            Condition::ClassPresent { element, class } => has_class(session, element, class).await,
        }
    }
}

impl fmt::Display for Condition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Condition::CountExceeds { selector, baseline } => {
                write!(f, "more than {baseline} `{selector}` elements")
            }
            Condition::Hidden(element) => write!(f, "element {} to hide", element.id()),
            Condition::ClassPresent { element, class } => {
                write!(f, "element {} to gain class `{class}`", element.id())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Waiter {
    policy: WaitPolicy,
    cancel: CancellationToken,
}

impl Waiter {
    pub fn new(policy: WaitPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ScraperError::Cancelled);
        }
        Ok(())
    }

    pub async fn wait_for(&self, session: &mut dyn BrowserSession, condition: Condition<'_>) -> Result<()> {
        self.wait_for_any(session, &[condition]).await
    }

    /// Polls until one of `conditions` holds, the timeout elapses, or the crawl is cancelled.
    pub async fn wait_for_any(&self, session: &mut dyn BrowserSession, conditions: &[Condition<'_>]) -> Result<()> {
        let deadline = Instant::now() + self.policy.timeout;
        loop {
            self.check_cancelled()?;
            for condition in conditions {
                if condition.holds(session).await? {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                let condition = conditions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" or ");
                return Err(ScraperError::WaitTimeout { condition, timeout: self.policy.timeout });
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ScraperError::Cancelled),
                _ = sleep(self.policy.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fakes::FakeBrowser;
    use crate::selectors::browser as css;

    fn waiter(cancel: &CancellationToken) -> Waiter {
        Waiter::new(
            WaitPolicy {
                poll_interval: Duration::from_millis(50),
                timeout: Duration::from_millis(500),
                retries: 0,
            },
            cancel.clone(),
        )
    }

    #[test]
    fn policy_durations_serialize_as_millis() {
        let policy = WaitPolicy::default();
        let value = serde_json::to_value(policy).unwrap();
        assert_eq!(value["poll_interval_ms"], 100);
        assert_eq!(value["timeout_ms"], 10_000);
        assert_eq!(serde_json::from_value::<WaitPolicy>(value).unwrap(), policy);

        let unbounded = WaitPolicy { timeout: Duration::MAX, ..policy };
        let value = serde_json::to_value(unbounded).unwrap();
        assert_eq!(value["timeout_ms"], u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn satisfied_condition_returns_immediately() {
        let mut browser = FakeBrowser::scrolling(3, 3, 1);
        let cancel = CancellationToken::new();
        let condition = Condition::CountExceeds { selector: css::ENTRY, baseline: 2 };

        waiter(&cancel).wait_for(&mut browser, condition).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unmet_condition_times_out() {
        let mut browser = FakeBrowser::scrolling(3, 3, 1);
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let condition = Condition::CountExceeds { selector: css::ENTRY, baseline: 3 };

        let err = waiter(&cancel).wait_for(&mut browser, condition).await.unwrap_err();

        assert!(matches!(err, ScraperError::WaitTimeout { .. }));
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn detached_element_counts_as_hidden() {
        let mut browser = FakeBrowser::scrolling(0, 0, 0);
        let cancel = CancellationToken::new();
        let gone = ElementHandle("gone".into());

        waiter(&cancel).wait_for(&mut browser, Condition::Hidden(&gone)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_stops_early() {
        let mut browser = FakeBrowser::scrolling(3, 3, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let condition = Condition::CountExceeds { selector: css::ENTRY, baseline: 10 };

        let err = waiter(&cancel).wait_for(&mut browser, condition).await.unwrap_err();
        assert!(matches!(err, ScraperError::Cancelled));
    }
}
