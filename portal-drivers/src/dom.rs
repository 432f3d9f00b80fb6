//! The page seam the extraction layer is written against.
use async_trait::async_trait;
use portal_common::Result;
use std::fmt;
use url::Url;

/// A raw element query understood by a [`PageDom`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Self::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Self::XPath(s.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{s}"),
            Selector::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// A live, rendered page.
///
/// Element handles are only valid until the next DOM-mutating action; a
/// backend reports use of an outdated handle as
/// [`portal_common::PortalError::StaleElement`]. Callers re-query instead of
/// caching handles across clicks.
#[async_trait]
pub trait PageDom: Send + Sync {
    type Element: Clone + fmt::Debug + Send + Sync;

    /// All matches in document order, searched below `scope` when given.
    async fn find_all(
        &self,
        scope: Option<&Self::Element>,
        selector: &Selector,
    ) -> Result<Vec<Self::Element>>;

    /// Rendered text of the element and its descendants.
    async fn text(&self, element: &Self::Element) -> Result<String>;

    async fn attr(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Assign `value` to a form control and dispatch `input` and `change`
    /// events so reactive frameworks observe the update.
    async fn set_value(&self, element: &Self::Element, value: &str) -> Result<()>;

    async fn send_keys(&self, element: &Self::Element, text: &str) -> Result<()>;

    async fn goto(&self, url: &Url) -> Result<()>;

    async fn current_url(&self) -> Result<Url>;

    /// PNG bytes of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn is_alive(&self) -> bool;

    /// First match, if any.
    async fn find(
        &self,
        scope: Option<&Self::Element>,
        selector: &Selector,
    ) -> Result<Option<Self::Element>> {
        Ok(self.find_all(scope, selector).await?.into_iter().next())
    }
}

/// Hands out the page a run operates on. Launching and closing the browser
/// belong to whoever implements this.
#[async_trait]
pub trait BrowserLifecycle: Send + Sync {
    type Page: PageDom;

    fn get_page(&self) -> Option<Self::Page>;

    async fn is_alive(&self) -> bool;
}
