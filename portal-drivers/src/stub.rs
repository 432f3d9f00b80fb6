//! Scripted HTML fixture pages standing in for a live browser.
//!
//! A [`StubPage`] holds a set of named HTML documents and behaves like a
//! rendered page over the current one. Fixtures drive it with a handful of
//! attributes:
//!
//! - `data-stub-goto="name"`: clicking swaps to fixture `name`.
//! - `data-stub-onchange="name"`: setting the control's value swaps to `name`.
//! - `data-stub-toggle="css"`: clicking flips `aria-expanded` on the first
//!   match of `css` (or the clicked element when empty) and re-renders.
//! - `data-stub-download="file"`: clicking writes `file` into the download
//!   directory; with `data-stub-download-pending` only `file.crdownload`
//!   appears.
//! - `role="tab"`: clicking marks the tab `aria-selected` and re-renders.
//!
//! Every re-render bumps a generation counter; handles taken earlier fail
//! with [`PortalError::StaleElement`] exactly like a detached WebDriver node.
//! XPath selectors are not supported and fail with a driver error.
use crate::dom::{BrowserLifecycle, PageDom, Selector};
use anyhow::anyhow;
use async_trait::async_trait;
use portal_common::{PortalError, Result};
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Handle into a stub document: document-order position plus the render
/// generation it was taken in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubElement {
    generation: u64,
    ordinal: usize,
}

#[derive(Debug, Default)]
struct StubState {
    fixtures: HashMap<String, String>,
    routes: HashMap<String, String>,
    current: Option<String>,
    url: Option<Url>,
    generation: u64,
    overlays: HashMap<usize, HashMap<String, String>>,
    download_dir: Option<PathBuf>,
    clicks: Vec<String>,
    events: Vec<String>,
    dead: bool,
}

/// In-memory page over named HTML fixtures. Clones share state, so a test
/// can keep one handle for inspection while the code under test drives
/// another.
#[derive(Debug, Clone, Default)]
pub struct StubPage {
    state: Arc<Mutex<StubState>>,
}

impl StubPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named document.
    pub fn fixture(self, name: &str, html: &str) -> Self {
        self.lock()
            .fixtures
            .insert(name.to_string(), html.to_string());
        self
    }

    /// Make [`PageDom::goto`] on `url` load fixture `name`.
    pub fn route(self, url: &str, name: &str) -> Self {
        let key = Url::parse(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());
        self.lock().routes.insert(key, name.to_string());
        self
    }

    /// Load fixture `name` without going through a route.
    pub fn start_at(self, name: &str) -> Self {
        self.lock().swap_to(name);
        self
    }

    pub fn downloads_into(self, dir: impl Into<PathBuf>) -> Self {
        self.lock().download_dir = Some(dir.into());
        self
    }

    /// Simulate the browser going away.
    pub fn kill(&self) {
        self.lock().dead = true;
    }

    /// Description (id, else text) of every clicked element, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    /// Synthetic `input`/`change` events dispatched so far.
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub fn current_fixture(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// Effective `value` of the first element matching `css`.
    pub fn value_of(&self, css: &str) -> Option<String> {
        let state = self.lock();
        let doc = state.document().ok()?;
        let all = all_elements(&doc);
        let sel = scraper::Selector::parse(css).ok()?;
        let el = doc.select(&sel).next()?;
        let ordinal = ordinal_of(&all, el)?;
        state.effective_attr(el, ordinal, "value")
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StubState {
    fn ensure_alive(&self) -> Result<()> {
        if self.dead {
            return Err(PortalError::SessionLost("stub page closed".into()));
        }
        Ok(())
    }

    fn document(&self) -> Result<Html> {
        let name = self
            .current
            .as_ref()
            .ok_or_else(|| PortalError::Driver(anyhow!("no document loaded")))?;
        let html = self
            .fixtures
            .get(name)
            .ok_or_else(|| PortalError::Driver(anyhow!("unknown fixture {name}")))?;
        Ok(Html::parse_document(html))
    }

    fn swap_to(&mut self, name: &str) {
        self.current = Some(name.to_string());
        self.overlays.clear();
        self.generation += 1;
        let routed = self
            .routes
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .and_then(|(u, _)| Url::parse(u).ok());
        self.url = routed.or_else(|| Url::parse(&format!("stub://portal/{name}")).ok());
    }

    fn rerender(&mut self) {
        self.generation += 1;
    }

    fn handle(&self, ordinal: usize) -> StubElement {
        StubElement {
            generation: self.generation,
            ordinal,
        }
    }

    fn resolve<'a>(&self, all: &[ElementRef<'a>], handle: &StubElement) -> Result<ElementRef<'a>> {
        if handle.generation != self.generation {
            return Err(PortalError::StaleElement(format!(
                "element #{} from render {} (now {})",
                handle.ordinal, handle.generation, self.generation
            )));
        }
        all.get(handle.ordinal)
            .copied()
            .ok_or_else(|| PortalError::StaleElement(format!("element #{}", handle.ordinal)))
    }

    fn effective_attr(&self, el: ElementRef<'_>, ordinal: usize, name: &str) -> Option<String> {
        self.overlays
            .get(&ordinal)
            .and_then(|o| o.get(name).cloned())
            .or_else(|| el.value().attr(name).map(str::to_string))
    }

    fn set_overlay(&mut self, ordinal: usize, name: &str, value: String) {
        self.overlays
            .entry(ordinal)
            .or_default()
            .insert(name.to_string(), value);
    }

    fn find_all(&self, scope: Option<&StubElement>, selector: &Selector) -> Result<Vec<StubElement>> {
        self.ensure_alive()?;
        let css = match selector {
            Selector::Css(css) => css,
            Selector::XPath(x) => {
                return Err(PortalError::Driver(anyhow!(
                    "xpath is not supported by the stub page: {x}"
                )))
            }
        };
        let sel = parse_css(css)?;
        let doc = self.document()?;
        let all = all_elements(&doc);
        let found: Vec<ElementRef<'_>> = match scope {
            Some(handle) => self.resolve(&all, handle)?.select(&sel).collect(),
            None => doc.select(&sel).collect(),
        };
        Ok(found
            .into_iter()
            .filter_map(|el| ordinal_of(&all, el))
            .map(|ordinal| self.handle(ordinal))
            .collect())
    }

    fn text(&self, handle: &StubElement) -> Result<String> {
        self.ensure_alive()?;
        let doc = self.document()?;
        let all = all_elements(&doc);
        let el = self.resolve(&all, handle)?;
        let mut raw = String::new();
        push_rendered_text(el, &mut raw);
        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn attr(&self, handle: &StubElement, name: &str) -> Result<Option<String>> {
        self.ensure_alive()?;
        let doc = self.document()?;
        let all = all_elements(&doc);
        let el = self.resolve(&all, handle)?;
        Ok(self.effective_attr(el, handle.ordinal, name))
    }

    fn click(&mut self, handle: &StubElement) -> Result<()> {
        self.ensure_alive()?;
        let doc = self.document()?;
        let all = all_elements(&doc);
        let el = self.resolve(&all, handle)?;

        let label = el
            .value()
            .id()
            .map(str::to_string)
            .unwrap_or_else(|| {
                let mut t = String::new();
                push_rendered_text(el, &mut t);
                t.split_whitespace().collect::<Vec<_>>().join(" ")
            });
        self.clicks.push(label);

        let attrs = el.value();
        let download = attrs.attr("data-stub-download").map(str::to_string);
        let pending = attrs.attr("data-stub-download-pending").is_some();
        let toggle = attrs.attr("data-stub-toggle").map(str::to_string);
        let goto = attrs.attr("data-stub-goto").map(str::to_string);
        let is_tab = attrs.attr("role") == Some("tab");

        if let Some(file) = download {
            let dir = self
                .download_dir
                .clone()
                .ok_or_else(|| PortalError::Download("stub has no download directory".into()))?;
            let name = if pending {
                format!("{file}.crdownload")
            } else {
                file
            };
            std::fs::write(dir.join(name), b"%PDF-1.4 stub")?;
        }

        if let Some(target) = toggle {
            let target_ordinal = if target.trim().is_empty() {
                Some(handle.ordinal)
            } else {
                let sel = parse_css(&target)?;
                doc.select(&sel).next().and_then(|t| ordinal_of(&all, t))
            };
            if let Some(ordinal) = target_ordinal {
                let expanded = self.effective_attr(all[ordinal], ordinal, "aria-expanded")
                    == Some("true".to_string());
                let next = if expanded { "false" } else { "true" };
                self.set_overlay(ordinal, "aria-expanded", next.to_string());
            }
            self.rerender();
        }

        if is_tab {
            let tab_sel = parse_css("[role='tab']")?;
            let tabs: Vec<usize> = doc
                .select(&tab_sel)
                .filter_map(|t| ordinal_of(&all, t))
                .collect();
            for ordinal in tabs {
                let selected = if ordinal == handle.ordinal { "true" } else { "false" };
                self.set_overlay(ordinal, "aria-selected", selected.to_string());
            }
            self.rerender();
        }

        if let Some(name) = goto {
            self.swap_to(&name);
        }
        Ok(())
    }

    fn set_value(&mut self, handle: &StubElement, value: &str) -> Result<()> {
        self.ensure_alive()?;
        let doc = self.document()?;
        let all = all_elements(&doc);
        let el = self.resolve(&all, handle)?;
        let label = el.value().id().unwrap_or(el.value().name()).to_string();
        let onchange = el.value().attr("data-stub-onchange").map(str::to_string);

        self.set_overlay(handle.ordinal, "value", value.to_string());
        self.events.push(format!("input:{label}={value}"));
        self.events.push(format!("change:{label}={value}"));

        if let Some(name) = onchange {
            self.swap_to(&name);
        }
        Ok(())
    }

    fn send_keys(&mut self, handle: &StubElement, text: &str) -> Result<()> {
        self.ensure_alive()?;
        let doc = self.document()?;
        let all = all_elements(&doc);
        let el = self.resolve(&all, handle)?;
        let mut current = self
            .effective_attr(el, handle.ordinal, "value")
            .unwrap_or_default();
        current.push_str(text);
        self.set_overlay(handle.ordinal, "value", current);
        Ok(())
    }

    fn goto(&mut self, url: &Url) -> Result<()> {
        self.ensure_alive()?;
        let name = self
            .routes
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| PortalError::Driver(anyhow!("no fixture routed for {url}")))?;
        self.swap_to(&name);
        self.url = Some(url.clone());
        Ok(())
    }
}

fn parse_css(css: &str) -> Result<scraper::Selector> {
    scraper::Selector::parse(css)
        .map_err(|e| PortalError::Driver(anyhow!("invalid selector {css:?}: {e:?}")))
}

fn all_elements(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn ordinal_of(all: &[ElementRef<'_>], el: ElementRef<'_>) -> Option<usize> {
    all.iter().position(|e| e.id() == el.id())
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    let v = el.value();
    v.attr("hidden").is_some()
        || v
            .attr("style")
            .is_some_and(|s| s.replace(' ', "").contains("display:none"))
}

/// Text a user would see: hidden subtrees contribute nothing.
fn push_rendered_text(el: ElementRef<'_>, out: &mut String) {
    if is_hidden(el) {
        return;
    }
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            out.push(' ');
            push_rendered_text(child_el, out);
            out.push(' ');
        }
    }
}

#[async_trait]
impl PageDom for StubPage {
    type Element = StubElement;

    async fn find_all(&self, scope: Option<&StubElement>, selector: &Selector) -> Result<Vec<StubElement>> {
        self.lock().find_all(scope, selector)
    }

    async fn text(&self, element: &StubElement) -> Result<String> {
        self.lock().text(element)
    }

    async fn attr(&self, element: &StubElement, name: &str) -> Result<Option<String>> {
        self.lock().attr(element, name)
    }

    async fn click(&self, element: &StubElement) -> Result<()> {
        self.lock().click(element)
    }

    async fn set_value(&self, element: &StubElement, value: &str) -> Result<()> {
        self.lock().set_value(element, value)
    }

    async fn send_keys(&self, element: &StubElement, text: &str) -> Result<()> {
        self.lock().send_keys(element, text)
    }

    async fn goto(&self, url: &Url) -> Result<()> {
        self.lock().goto(url)
    }

    async fn current_url(&self) -> Result<Url> {
        let state = self.lock();
        state.ensure_alive()?;
        state
            .url
            .clone()
            .ok_or_else(|| PortalError::NotFound("no page loaded".into()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.lock().ensure_alive()?;
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn is_alive(&self) -> bool {
        !self.lock().dead
    }
}

#[async_trait]
impl BrowserLifecycle for StubPage {
    type Page = StubPage;

    fn get_page(&self) -> Option<StubPage> {
        (!self.lock().dead).then(|| self.clone())
    }

    async fn is_alive(&self) -> bool {
        !self.lock().dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r##"
        <html><body>
          <ul id="items"><li>one</li><li>two <span hidden>secret</span></li></ul>
          <button id="next" data-stub-goto="detail">Next</button>
          <div id="panel" aria-expanded="false"></div>
          <a id="toggle" data-stub-toggle="#panel">Toggle</a>
          <select id="action" data-stub-onchange="detail"><option value="1">A</option></select>
        </body></html>"##;
    const DETAIL: &str = r#"<html><body><h1 id="title">Detail</h1></body></html>"#;

    fn page() -> StubPage {
        StubPage::new()
            .fixture("list", LIST)
            .fixture("detail", DETAIL)
            .route("https://portal.example.gov/list", "list")
            .start_at("list")
    }

    #[tokio::test]
    async fn finds_and_reads_visible_text() {
        let page = page();
        let items = page.find_all(None, &Selector::css("#items li")).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(page.text(&items[1]).await.unwrap(), "two");

        let root = page.find(None, &Selector::css("#items")).await.unwrap().unwrap();
        let scoped = page.find_all(Some(&root), &Selector::css("li")).await.unwrap();
        assert_eq!(scoped, items);
    }

    #[tokio::test]
    async fn navigation_invalidates_handles() {
        let page = page();
        let next = page.find(None, &Selector::css("#next")).await.unwrap().unwrap();
        page.click(&next).await.unwrap();
        assert_eq!(page.current_fixture().as_deref(), Some("detail"));
        assert!(matches!(
            page.text(&next).await,
            Err(PortalError::StaleElement(_))
        ));
    }

    #[tokio::test]
    async fn toggle_flips_expansion_and_rerenders() {
        let page = page();
        let toggle = page.find(None, &Selector::css("#toggle")).await.unwrap().unwrap();
        page.click(&toggle).await.unwrap();

        let panel = page.find(None, &Selector::css("#panel")).await.unwrap().unwrap();
        assert_eq!(
            page.attr(&panel, "aria-expanded").await.unwrap().as_deref(),
            Some("true")
        );
        assert!(page.click(&toggle).await.is_err());
    }

    #[tokio::test]
    async fn set_value_dispatches_events() {
        let page = page();
        let select = page.find(None, &Selector::css("#action")).await.unwrap().unwrap();
        page.set_value(&select, "1").await.unwrap();
        assert_eq!(page.events(), vec!["input:action=1", "change:action=1"]);
        assert_eq!(page.current_fixture().as_deref(), Some("detail"));
    }

    #[tokio::test]
    async fn xpath_and_dead_sessions_fail() {
        let page = page();
        assert!(matches!(
            page.find_all(None, &Selector::xpath("//li")).await,
            Err(PortalError::Driver(_))
        ));
        page.kill();
        assert!(!PageDom::is_alive(&page).await);
        assert!(page.get_page().is_none());
        assert!(matches!(
            page.find_all(None, &Selector::css("li")).await,
            Err(PortalError::SessionLost(_))
        ));
    }

    #[tokio::test]
    async fn goto_follows_routes() {
        let page = page().start_at("detail");
        let url = Url::parse("https://portal.example.gov/list").unwrap();
        page.goto(&url).await.unwrap();
        assert_eq!(page.current_fixture().as_deref(), Some("list"));
        assert_eq!(page.current_url().await.unwrap(), url);
    }

    #[tokio::test]
    async fn downloads_land_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let page = StubPage::new()
            .fixture(
                "files",
                r#"<a id="a" data-stub-download="a.pdf">a</a>
                   <a id="b" data-stub-download="b.pdf" data-stub-download-pending>b</a>"#,
            )
            .start_at("files")
            .downloads_into(dir.path());
        for id in ["#a", "#b"] {
            let link = page.find(None, &Selector::css(id)).await.unwrap().unwrap();
            page.click(&link).await.unwrap();
        }
        assert!(dir.path().join("a.pdf").exists());
        assert!(dir.path().join("b.pdf.crdownload").exists());
        assert_eq!(page.clicks(), vec!["a", "b"]);
    }
}
