// src/error.rs
use std::time::Duration;

use thiserror::Error;

/// Failures raised by a browser-automation session.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no such element: {0}")]
    NoSuchElement(String),
    #[error("stale element reference: {0}")]
    StaleElement(String),
    #[error("webdriver error {code}: {message}")]
    WebDriver { code: String, message: String },
    #[error("webdriver transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webdriver protocol error: {0}")]
    Protocol(String),
}

// --- Custom Error Type ---
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not parse {what} from {raw:?}")]
    Parse { what: &'static str, raw: String },
    #[error("catalog entry is missing {field}")]
    Extraction { field: &'static str },
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },
    #[error("variant option {index} on {url} went missing after {resolved} prices were read: {source}")]
    VariantLost {
        url: String,
        index: usize,
        resolved: usize,
        #[source]
        source: Box<ScraperError>,
    },
    #[error("{what} exceeded the limit of {limit} iterations")]
    MaxIterationsExceeded { what: &'static str, limit: u32 },
    #[error("timed out after {timeout:?} waiting for {condition}")]
    WaitTimeout { condition: String, timeout: Duration },
    #[error("crawl cancelled")]
    Cancelled,
    #[error("category {0} needs a browser session but none was started")]
    BrowserUnavailable(String),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("CSV error: {0}")]
    Sink(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl ScraperError {
    pub(crate) fn parse(what: &'static str, raw: impl Into<String>) -> Self {
        ScraperError::Parse { what, raw: raw.into() }
    }

    pub(crate) fn not_found(selector: impl Into<String>) -> Self {
        ScraperError::ElementNotFound { selector: selector.into() }
    }

    /// True for the benign "control is absent" signal, whichever layer raised it.
    pub fn is_element_not_found(&self) -> bool {
        matches!(
            self,
            ScraperError::ElementNotFound { .. }
                | ScraperError::Browser(BrowserError::NoSuchElement(_))
                | ScraperError::Browser(BrowserError::StaleElement(_))
        )
    }
}

impl From<toml::de::Error> for ScraperError {
    fn from(err: toml::de::Error) -> Self {
        ScraperError::Config(err.to_string())
    }
}

impl From<url::ParseError> for ScraperError {
    fn from(err: url::ParseError) -> Self {
        ScraperError::Config(format!("invalid url: {err}"))
    }
}

pub type Result<T, E = ScraperError> = std::result::Result<T, E>;
