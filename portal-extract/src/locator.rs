//! Finding elements on pages that have no stable identifiers.
//!
//! A lookup is a [`FallbackChain`]: an ordered list of [`Descriptor`]s tried
//! until one yields an element. Running out of strategies is an ordinary
//! `Ok(None)`, logged on `portal.locator` with every strategy that was
//! tried. Only fatal errors (a lost session) escape a chain; anything else a
//! strategy raises (an unsupported selector, a node that went stale
//! mid-scan) just moves on to the next strategy.
use portal_common::{OptionalExt, PortalError, Result};
use portal_drivers::portal_browser::behavioral::BehavioralEngine;
use portal_drivers::{PageDom, Selector};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Markup that decorates a label without being part of it.
const LABEL_DECORATION: &str = ".sr-only, .visually-hidden, .required, .text-danger, sup";

/// One way of describing an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// `id` attribute equals the value.
    Id(String),
    /// Any CSS (usually attribute) selector; first match wins.
    Css(String),
    /// A `<select>` whose first option's text contains the value.
    FirstOptionText(String),
    /// A `container` element whose `header` child's text contains `text`.
    HeaderText {
        container: String,
        header: String,
        text: String,
    },
    /// A `host` element (button, link) wrapping an icon with `class`.
    IconClass { host: String, class: String },
    /// XPath over `tag` elements whose normalised text contains `text`.
    XPathTextContains { tag: String, text: String },
    /// Elements matching `css` whose rendered text contains `text`.
    TextContains { css: String, text: String },
}

impl Descriptor {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn css(css: impl Into<String>) -> Self {
        Self::Css(css.into())
    }

    pub fn first_option(text: impl Into<String>) -> Self {
        Self::FirstOptionText(text.into())
    }

    pub fn header(container: &str, header: &str, text: impl Into<String>) -> Self {
        Self::HeaderText {
            container: container.into(),
            header: header.into(),
            text: text.into(),
        }
    }

    pub fn icon(host: &str, class: &str) -> Self {
        Self::IconClass {
            host: host.into(),
            class: class.into(),
        }
    }

    pub fn xpath_text(tag: &str, text: impl Into<String>) -> Self {
        Self::XPathTextContains {
            tag: tag.into(),
            text: text.into(),
        }
    }

    pub fn text(css: &str, text: impl Into<String>) -> Self {
        Self::TextContains {
            css: css.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Id(id) => write!(f, "id={id}"),
            Descriptor::Css(css) => write!(f, "css={css}"),
            Descriptor::FirstOptionText(t) => write!(f, "first-option~{t:?}"),
            Descriptor::HeaderText {
                container,
                header,
                text,
            } => write!(f, "{container}>{header}~{text:?}"),
            Descriptor::IconClass { host, class } => write!(f, "{host}>i.{class}"),
            Descriptor::XPathTextContains { tag, text } => write!(f, "xpath {tag}~{text:?}"),
            Descriptor::TextContains { css, text } => write!(f, "{css}~{text:?}"),
        }
    }
}

/// A named, ordered list of descriptors for one logical element.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    pub name: &'static str,
    pub steps: Vec<Descriptor>,
}

impl FallbackChain {
    pub fn new(name: &'static str, steps: Vec<Descriptor>) -> Self {
        Self { name, steps }
    }

    /// Every strategy, for diagnostics.
    pub fn describe(&self) -> String {
        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Result of a tab activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabActivation {
    AlreadyActive,
    Activated,
    NotFound,
}

/// Case-insensitive containment over whitespace-normalised text.
pub fn fuzzy_contains(haystack: &str, needle: &str) -> bool {
    let needle = normalise(needle);
    !needle.is_empty() && normalise(haystack).contains(&needle)
}

pub fn normalise(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Pick the option to select for `wanted`, in document order: exact value or
/// exact text first, then case-insensitive containment either way round.
pub fn match_option<'o>(options: &'o [(String, String)], wanted: &str) -> Option<&'o (String, String)> {
    let wanted_trim = wanted.trim();
    if let Some(exact) = options
        .iter()
        .find(|(value, text)| value == wanted_trim || text.trim() == wanted_trim)
    {
        return Some(exact);
    }

    let query = normalise(wanted);
    if query.is_empty() {
        return None;
    }
    options.iter().find(|(_, text)| {
        let text = normalise(text);
        !text.is_empty() && (text.contains(&query) || query.contains(&text))
    })
}

fn strip_label_noise(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}' | '\u{00AD}'))
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([':', '*', ' '])
        .trim()
        .to_string()
}

/// Element lookups against one page.
pub struct ElementLocator<'a, P: PageDom> {
    page: &'a P,
    behavior: &'a BehavioralEngine,
    settle: Duration,
}

impl<'a, P: PageDom> ElementLocator<'a, P> {
    pub fn new(page: &'a P, behavior: &'a BehavioralEngine, settle: Duration) -> Self {
        Self {
            page,
            behavior,
            settle,
        }
    }

    pub fn page(&self) -> &'a P {
        self.page
    }

    /// Wait the configured settle delay for a reactive re-render.
    pub async fn settle(&self) {
        self.behavior.settle(self.settle).await;
    }

    /// Walk `chain`; log the strategies tried when none matched.
    pub async fn locate(
        &self,
        scope: Option<&P::Element>,
        chain: &FallbackChain,
    ) -> Result<Option<P::Element>> {
        let found = self.try_locate(scope, chain).await?;
        if found.is_none() {
            info!(
                target: "portal.locator",
                lookup = chain.name,
                tried = %chain.describe(),
                "fallback chain exhausted"
            );
        }
        Ok(found)
    }

    /// [`Self::locate`] without the exhaustion log, for polling loops.
    pub async fn try_locate(
        &self,
        scope: Option<&P::Element>,
        chain: &FallbackChain,
    ) -> Result<Option<P::Element>> {
        for step in &chain.steps {
            match self.resolve_all(scope, step).await {
                Ok(found) => {
                    if let Some(el) = found.into_iter().next() {
                        debug!(target: "portal.locator", lookup = chain.name, strategy = %step, "matched");
                        return Ok(Some(el));
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(target: "portal.locator", lookup = chain.name, strategy = %step, error = %e, "strategy failed");
                }
            }
        }
        Ok(None)
    }

    /// All matches of the first strategy that yields any.
    pub async fn locate_all(
        &self,
        scope: Option<&P::Element>,
        chain: &FallbackChain,
    ) -> Result<Vec<P::Element>> {
        for step in &chain.steps {
            match self.resolve_all(scope, step).await {
                Ok(found) if !found.is_empty() => return Ok(found),
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(target: "portal.locator", lookup = chain.name, strategy = %step, error = %e, "strategy failed");
                }
            }
        }
        debug!(target: "portal.locator", lookup = chain.name, tried = %chain.describe(), "no matches");
        Ok(Vec::new())
    }

    /// Every element `descriptor` matches, in document order.
    pub async fn resolve_all(
        &self,
        scope: Option<&P::Element>,
        descriptor: &Descriptor,
    ) -> Result<Vec<P::Element>> {
        match descriptor {
            Descriptor::Id(id) => {
                let css = format!("[id=\"{}\"]", id.replace('"', "\\\""));
                self.page.find_all(scope, &Selector::Css(css)).await
            }
            Descriptor::Css(css) => self.page.find_all(scope, &Selector::css(css)).await,
            Descriptor::FirstOptionText(text) => {
                let mut out = Vec::new();
                for select in self.page.find_all(scope, &Selector::css("select")).await? {
                    let first = self
                        .page
                        .find(Some(&select), &Selector::css("option"))
                        .await?;
                    if let Some(option) = first {
                        if fuzzy_contains(&self.page.text(&option).await?, text) {
                            out.push(select);
                        }
                    }
                }
                Ok(out)
            }
            Descriptor::HeaderText {
                container,
                header,
                text,
            } => {
                let mut out = Vec::new();
                for candidate in self.page.find_all(scope, &Selector::css(container)).await? {
                    for head in self
                        .page
                        .find_all(Some(&candidate), &Selector::css(header))
                        .await?
                    {
                        if fuzzy_contains(&self.page.text(&head).await?, text) {
                            out.push(candidate.clone());
                            break;
                        }
                    }
                }
                Ok(out)
            }
            Descriptor::IconClass { host, class } => {
                let icon = format!("i.{class}, span.{class}");
                let mut out = Vec::new();
                for candidate in self.page.find_all(scope, &Selector::css(host)).await? {
                    if self
                        .page
                        .find(Some(&candidate), &Selector::css(&icon))
                        .await?
                        .is_some()
                    {
                        out.push(candidate);
                    }
                }
                Ok(out)
            }
            Descriptor::XPathTextContains { tag, text } => {
                let prefix = if scope.is_some() { ".//" } else { "//" };
                let literal = text.replace('\'', "");
                let xpath = format!("{prefix}{tag}[contains(normalize-space(.), '{literal}')]");
                self.page.find_all(scope, &Selector::XPath(xpath)).await
            }
            Descriptor::TextContains { css, text } => {
                let mut out = Vec::new();
                for candidate in self.page.find_all(scope, &Selector::css(css)).await? {
                    if fuzzy_contains(&self.page.text(&candidate).await?, text) {
                        out.push(candidate);
                    }
                }
                Ok(out)
            }
        }
    }

    /// Trimmed rendered text; absent elements read as empty.
    pub async fn text_of(&self, element: &P::Element) -> Result<String> {
        let text = self.page.text(element).await.optional()?;
        Ok(text.map(|t| t.trim().to_string()).unwrap_or_default())
    }

    /// Text of the first match of `css` under `scope`, if any.
    pub async fn child_text(&self, scope: &P::Element, css: &str) -> Result<Option<String>> {
        match self.page.find(Some(scope), &Selector::css(css)).await {
            Ok(Some(el)) => {
                let t = self.text_of(&el).await?;
                Ok((!t.is_empty()).then_some(t))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_fatal() => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Label text with decoration markup and zero-width characters removed,
    /// and trailing `:`/`*` trimmed.
    pub async fn clean_label(&self, label: &P::Element) -> Result<String> {
        let mut text = self.text_of(label).await?;
        for deco in self
            .page
            .find_all(Some(label), &Selector::css(LABEL_DECORATION))
            .await?
        {
            let noise = self.text_of(&deco).await?;
            if !noise.is_empty() {
                text = text.replacen(&noise, "", 1);
            }
        }
        Ok(strip_label_noise(&text))
    }

    /// Choose the option of `select` described by `wanted`, assign it with
    /// change/input notifications, then wait for the re-render. Returns the
    /// value chosen, or `None` when no option matched.
    pub async fn select_option(
        &self,
        select: &P::Element,
        wanted: &str,
    ) -> Result<Option<String>> {
        let mut options = Vec::new();
        for option in self
            .page
            .find_all(Some(select), &Selector::css("option"))
            .await?
        {
            let value = self.page.attr(&option, "value").await?.unwrap_or_default();
            let text = self.text_of(&option).await?;
            options.push((value, text));
        }

        let Some((value, text)) = match_option(&options, wanted).cloned() else {
            info!(
                target: "portal.locator",
                wanted,
                available = ?options.iter().map(|(_, t)| t.as_str()).collect::<Vec<_>>(),
                "no dropdown option matched"
            );
            return Ok(None);
        };

        self.page.set_value(select, &value).await?;
        debug!(target: "portal.locator", wanted, %value, %text, "dropdown option selected");
        self.settle().await;
        Ok(Some(value))
    }

    /// Activate the tab found by `chain` unless it already is. Never clicks
    /// an active tab, so repeated calls do not re-trigger its side effects.
    pub async fn activate_tab(&self, chain: &FallbackChain) -> Result<TabActivation> {
        let Some(tab) = self.locate(None, chain).await? else {
            return Ok(TabActivation::NotFound);
        };
        if self.is_active(&tab).await? {
            debug!(target: "portal.locator", tab = chain.name, "tab already active");
            return Ok(TabActivation::AlreadyActive);
        }
        self.page.click(&tab).await?;
        self.settle().await;
        Ok(TabActivation::Activated)
    }

    async fn is_active(&self, tab: &P::Element) -> Result<bool> {
        let class = self.page.attr(tab, "class").await?.unwrap_or_default();
        if class.split_whitespace().any(|c| c == "active") {
            return Ok(true);
        }
        let selected = self.page.attr(tab, "aria-selected").await?;
        Ok(selected.as_deref() == Some("true"))
    }

    /// Click, mapping a vanished target to `NotFound`.
    pub async fn click(&self, element: &P::Element, what: &str) -> Result<()> {
        self.page.click(element).await.map_err(|e| match e {
            PortalError::StaleElement(_) => PortalError::NotFound(format!("{what} (re-rendered before click)")),
            other => other,
        })
    }
}
