// src/browser.rs
use async_trait::async_trait;

use crate::error::BrowserError;

/// Opaque reference to an element inside the live page of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Browser-automation capability consumed by the scroll controller and the variant resolver.
///
/// One session is owned by the crawl and lent out as `&mut`, so every call is
/// strictly sequential. `find` returns `Ok(None)` for an absent element rather
/// than an error.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn find(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError>;

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn find_all_within(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn is_visible(&mut self, element: &ElementHandle) -> Result<bool, BrowserError>;

    async fn is_enabled(&mut self, element: &ElementHandle) -> Result<bool, BrowserError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError>;

    async fn text(&mut self, element: &ElementHandle) -> Result<String, BrowserError>;

    async fn attribute(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>, BrowserError>;

    async fn page_source(&mut self) -> Result<String, BrowserError>;
}

/// Whether `class` appears in the element's class list.
pub async fn has_class(
    session: &mut (dyn BrowserSession + '_),
    element: &ElementHandle,
    class: &str,
) -> Result<bool, BrowserError> {
    Ok(session
        .attribute(element, "class")
        .await?
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)))
}
