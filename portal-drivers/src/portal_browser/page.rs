use crate::dom::{PageDom, Selector};
use anyhow::anyhow;
use async_trait::async_trait;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{elements::Element, Client, Locator};
use portal_common::{PortalError, Result};
use serde_json::json;
use tracing::debug;
use url::Url;

/// Assigns the value and fires the events Angular/React style forms listen to.
const SET_VALUE_SCRIPT: &str = r#"
    const el = arguments[0];
    el.value = arguments[1];
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return el.value;
"#;

/// Page wrapper over a live WebDriver session.
#[derive(Clone)]
pub struct PortalPage {
    pub(crate) client: Client,
}

impl PortalPage {
    /// Construct a page wrapper around an existing WebDriver client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map WebDriver failures onto the portal error taxonomy.
pub fn classify_cmd_error(err: CmdError) -> PortalError {
    match err {
        CmdError::Lost(e) => PortalError::SessionLost(e.to_string()),
        CmdError::WaitTimeout => PortalError::Timeout("webdriver wait".into()),
        CmdError::Standard(e) => match e.error {
            ErrorStatus::NoSuchElement => PortalError::NotFound(e.to_string()),
            ErrorStatus::StaleElementReference => PortalError::StaleElement(e.to_string()),
            ErrorStatus::InvalidSessionId | ErrorStatus::NoSuchWindow => {
                PortalError::SessionLost(e.to_string())
            }
            _ => PortalError::Driver(anyhow!("{e}")),
        },
        other => PortalError::Driver(anyhow::Error::from(other)),
    }
}

fn locator(selector: &Selector) -> Locator<'_> {
    match selector {
        Selector::Css(s) => Locator::Css(s),
        Selector::XPath(s) => Locator::XPath(s),
    }
}

#[async_trait]
impl PageDom for PortalPage {
    type Element = Element;

    async fn find_all(&self, scope: Option<&Element>, selector: &Selector) -> Result<Vec<Element>> {
        let found = match scope {
            Some(root) => root.find_all(locator(selector)).await,
            None => self.client.find_all(locator(selector)).await,
        };
        match found {
            Ok(elements) => Ok(elements),
            // find_all reports an empty match set as an error on some drivers
            Err(e) if e.is_no_such_element() => Ok(Vec::new()),
            Err(e) => Err(classify_cmd_error(e)),
        }
    }

    async fn text(&self, element: &Element) -> Result<String> {
        element.text().await.map_err(classify_cmd_error)
    }

    async fn attr(&self, element: &Element, name: &str) -> Result<Option<String>> {
        // The live value of a form control is a property; the attribute
        // only holds the value it was rendered with.
        let read = if name == "value" {
            element.prop(name).await
        } else {
            element.attr(name).await
        };
        read.map_err(classify_cmd_error)
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await.map_err(classify_cmd_error)
    }

    async fn set_value(&self, element: &Element, value: &str) -> Result<()> {
        let arg = serde_json::to_value(element)
            .map_err(|e| PortalError::Driver(anyhow!("serialise element: {e}")))?;
        let applied = self
            .client
            .execute(SET_VALUE_SCRIPT, vec![arg, json!(value)])
            .await
            .map_err(classify_cmd_error)?;
        debug!(target: "portal.driver", requested = value, applied = %applied, "value set");
        Ok(())
    }

    async fn send_keys(&self, element: &Element, text: &str) -> Result<()> {
        element.send_keys(text).await.map_err(classify_cmd_error)
    }

    async fn goto(&self, url: &Url) -> Result<()> {
        self.client.goto(url.as_str()).await.map_err(classify_cmd_error)
    }

    async fn current_url(&self) -> Result<Url> {
        self.client.current_url().await.map_err(classify_cmd_error)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.client.screenshot().await.map_err(classify_cmd_error)
    }

    async fn is_alive(&self) -> bool {
        self.client.current_url().await.is_ok()
    }
}
