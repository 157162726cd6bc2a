// src/webdriver.rs
//! W3C WebDriver session spoken directly over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, ElementHandle};
use crate::error::BrowserError;

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4ad2-e9f9-c72e9d6b3f24";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Endpoint of a running chromedriver/geckodriver/selenium server.
    pub url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub command_timeout_secs: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            browser: BrowserKind::Chrome,
            headless: true,
            command_timeout_secs: 40,
        }
    }
}

fn capabilities(config: &WebDriverConfig) -> Value {
    match config.browser {
        BrowserKind::Firefox => {
            let mut args = Vec::<String>::new();
            if config.headless {
                args.push("-headless".to_string());
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "firefox",
                        "moz:firefoxOptions": { "args": args }
                    }
                }
            })
        }
        BrowserKind::Chrome => {
            let mut args = Vec::<String>::new();
            if config.headless {
                args.push("--headless=new".to_string());
            }
            args.push("--window-size=1400,1200".to_string());
            args.push("--disable-gpu".to_string());
            args.push("--disable-dev-shm-usage".to_string());
            if !cfg!(target_os = "macos") {
                args.push("--no-sandbox".to_string());
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "goog:chromeOptions": { "args": args }
                    }
                }
            })
        }
    }
}

/// Unwraps the `value` member of a driver response, mapping W3C error codes.
fn decode(status: StatusCode, mut body: Value) -> Result<Value, BrowserError> {
    let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);
    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown webdriver error")
            .to_string();
        return Err(match code {
            "no such element" => BrowserError::NoSuchElement(message),
            "stale element reference" => BrowserError::StaleElement(message),
            _ => BrowserError::WebDriver { code: code.to_string(), message },
        });
    }
    if !status.is_success() {
        return Err(BrowserError::Protocol(format!("HTTP {}", status.as_u16())));
    }
    Ok(value)
}

fn element_of(value: &Value) -> Result<ElementHandle, BrowserError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_string()))
        .ok_or_else(|| BrowserError::Protocol(format!("not an element reference: {value}")))
}

fn elements_of(value: &Value) -> Result<Vec<ElementHandle>, BrowserError> {
    value
        .as_array()
        .ok_or_else(|| BrowserError::Protocol(format!("expected element list: {value}")))?
        .iter()
        .map(element_of)
        .collect()
}

fn css_locator(selector: &str) -> Value {
    json!({ "using": "css selector", "value": selector })
}

/// A live browser owned by the crawl. Call [`WebDriverSession::quit`] when done;
/// dropping an open session falls back to a best-effort background delete.
pub struct WebDriverSession {
    client: Client,
    session_url: String,
    session_id: String,
    closed: bool,
}

impl WebDriverSession {
    pub async fn start(config: &WebDriverConfig) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.command_timeout_secs))
            .build()?;
        let endpoint = config.url.trim_end_matches('/');

        let response = client
            .post(format!("{endpoint}/session"))
            .json(&capabilities(config))
            .send()
            .await?;
        let status = response.status();
        let created = decode(status, response.json().await?)?;
        let session_id = created
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("session create missing sessionId".to_string()))?
            .to_string();

        info!(%session_id, endpoint, browser = ?config.browser, "webdriver session started");
        Ok(Self {
            client,
            session_url: format!("{endpoint}/session/{session_id}"),
            session_id,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// Deletes the remote session. Consumes the handle so it is released exactly once.
    pub async fn quit(mut self) -> Result<(), BrowserError> {
        self.closed = true;
        self.command(Method::DELETE, "", None).await?;
        info!(session_id = %self.session_id, "webdriver session closed");
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, BrowserError> {
        let url = format!("{}{path}", self.session_url);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        decode(status, response.json().await?)
    }

    async fn get(&self, path: &str) -> Result<Value, BrowserError> {
        self.command(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, BrowserError> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn get_bool(&self, path: &str) -> Result<bool, BrowserError> {
        let value = self.get(path).await?;
        value
            .as_bool()
            .ok_or_else(|| BrowserError::Protocol(format!("expected boolean from {path}: {value}")))
    }

    async fn get_string(&self, path: &str) -> Result<String, BrowserError> {
        match self.get(path).await? {
            Value::String(s) => Ok(s),
            other => Err(BrowserError::Protocol(format!("expected string from {path}: {other}"))),
        }
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!(url, "navigating");
        self.post("/url", json!({ "url": url })).await.map(|_| ())
    }

    async fn find(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        match self.post("/element", css_locator(selector)).await {
            Ok(value) => element_of(&value).map(Some),
            Err(BrowserError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        elements_of(&self.post("/elements", css_locator(selector)).await?)
    }

    async fn find_all_within(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let path = format!("/element/{}/elements", parent.id());
        elements_of(&self.post(&path, css_locator(selector)).await?)
    }

    async fn is_visible(&mut self, element: &ElementHandle) -> Result<bool, BrowserError> {
        self.get_bool(&format!("/element/{}/displayed", element.id())).await
    }

    async fn is_enabled(&mut self, element: &ElementHandle) -> Result<bool, BrowserError> {
        self.get_bool(&format!("/element/{}/enabled", element.id())).await
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.post(&format!("/element/{}/click", element.id()), json!({}))
            .await
            .map(|_| ())
    }

    async fn text(&mut self, element: &ElementHandle) -> Result<String, BrowserError> {
        self.get_string(&format!("/element/{}/text", element.id())).await
    }

    async fn attribute(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>, BrowserError> {
        match self.get(&format!("/element/{}/attribute/{name}", element.id())).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.get_string("/source").await
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(session_id = %self.session_id, "webdriver session dropped without quit");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let request = self.client.delete(&self.session_url);
            handle.spawn(async move {
                let _ = request.send().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_capabilities_carry_headless_flag() {
        let caps = capabilities(&WebDriverConfig::default());
        let args = caps
            .pointer("/capabilities/alwaysMatch/goog:chromeOptions/args")
            .and_then(Value::as_array)
            .unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn firefox_capabilities_without_headless() {
        let config = WebDriverConfig {
            browser: BrowserKind::Firefox,
            headless: false,
            ..WebDriverConfig::default()
        };
        let caps = capabilities(&config);
        assert_eq!(caps.pointer("/capabilities/alwaysMatch/browserName"), Some(&json!("firefox")));
        assert_eq!(
            caps.pointer("/capabilities/alwaysMatch/moz:firefoxOptions/args"),
            Some(&json!([]))
        );
    }

    #[test]
    fn decode_maps_w3c_error_codes() {
        let missing = json!({ "value": { "error": "no such element", "message": "nope" } });
        assert!(matches!(
            decode(StatusCode::NOT_FOUND, missing),
            Err(BrowserError::NoSuchElement(m)) if m == "nope"
        ));

        let stale = json!({ "value": { "error": "stale element reference", "message": "gone" } });
        assert!(matches!(decode(StatusCode::NOT_FOUND, stale), Err(BrowserError::StaleElement(_))));

        let other = json!({ "value": { "error": "invalid session id", "message": "dead" } });
        assert!(matches!(
            decode(StatusCode::NOT_FOUND, other),
            Err(BrowserError::WebDriver { code, .. }) if code == "invalid session id"
        ));
    }

    #[test]
    fn decode_returns_value_member() {
        let ok = json!({ "value": true });
        assert_eq!(decode(StatusCode::OK, ok).unwrap(), json!(true));
        assert!(decode(StatusCode::INTERNAL_SERVER_ERROR, json!({ "value": null })).is_err());
    }

    #[test]
    fn element_references_use_w3c_key() {
        let value = json!([{ ELEMENT_KEY: "a" }, { ELEMENT_KEY: "b" }]);
        let elements = elements_of(&value).unwrap();
        assert_eq!(elements, [ElementHandle("a".into()), ElementHandle("b".into())]);
        assert!(element_of(&json!({ "ELEMENT": "legacy" })).is_err());
    }
}
