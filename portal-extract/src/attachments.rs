//! Attachment accordion walking and download confirmation.
//!
//! Expanding or collapsing a panel re-renders the accordion, so nothing is
//! cached between operations: the panel, its toggle and its rows are looked
//! up again by position before every click and every read.
use crate::locator::{ElementLocator, FallbackChain};
use crate::selectors;
use crate::sequencer::poll_until;
use crate::types::AttachmentRecord;
use crate::workflow::find_date;
use portal_common::{PortalError, Result};
use portal_config::TimingConfig;
use portal_drivers::{PageDom, Selector};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffixes browsers give files that are still being written.
pub const IN_PROGRESS_SUFFIXES: &[&str] = &[".crdownload", ".part", ".download", ".tmp"];

pub fn is_in_progress(name: &str) -> bool {
    IN_PROGRESS_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// File names currently in `dir`. A missing directory is empty.
pub async fn snapshot(dir: &Path) -> Result<BTreeSet<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = BTreeSet::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Files that appeared since `before`, once none of the new names is still
/// in progress. `None` means the download has not completed yet.
pub fn new_completed_files(before: &BTreeSet<String>, now: &BTreeSet<String>) -> Option<Vec<String>> {
    let fresh: Vec<&String> = now.difference(before).collect();
    if fresh.is_empty() || fresh.iter().any(|name| is_in_progress(name)) {
        return None;
    }
    Some(fresh.into_iter().cloned().collect())
}

async fn completed_since(dir: &Path, before: &BTreeSet<String>) -> Result<Option<Vec<String>>> {
    Ok(new_completed_files(before, &snapshot(dir).await?))
}

/// Poll `dir` until a download started after `before` has completed.
/// Returns the new file names, or an empty list when the budget ran out.
pub async fn wait_for_download(dir: &Path, before: &BTreeSet<String>, timing: &TimingConfig) -> Result<Vec<String>> {
    let done = poll_until(timing.download(), timing.poll_interval(), move || completed_since(dir, before)).await?;
    Ok(done.unwrap_or_default())
}

/// What one pass over the attachment tab produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentReport {
    pub records: Vec<AttachmentRecord>,
    /// Confirmed new files, in the order they completed.
    pub files: Vec<String>,
}

pub struct AttachmentDownloader<'a, P: PageDom> {
    locator: &'a ElementLocator<'a, P>,
    timing: &'a TimingConfig,
    downloads_dir: PathBuf,
    /// Container the panels live in; looked up again before every read.
    pane: Option<FallbackChain>,
    download: bool,
}

impl<'a, P: PageDom> AttachmentDownloader<'a, P> {
    pub fn new(locator: &'a ElementLocator<'a, P>, timing: &'a TimingConfig, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            locator,
            timing,
            downloads_dir: downloads_dir.into(),
            pane: None,
            download: true,
        }
    }

    /// Restrict panel lookups to the element `pane` finds. When it finds
    /// nothing the whole page is searched.
    pub fn within(mut self, pane: FallbackChain) -> Self {
        self.pane = Some(pane);
        self
    }

    /// Only read metadata; never click a download control.
    pub fn metadata_only(mut self) -> Self {
        self.download = false;
        self
    }

    /// Walk every panel in document order, appending to `report` as rows are
    /// read. On error `report` still holds everything collected before it.
    pub async fn run(&self, report: &mut AttachmentReport) -> Result<()> {
        if self.download {
            tokio::fs::create_dir_all(&self.downloads_dir).await?;
        }
        let panel_count = self.panels().await?.len();
        for index in 0..panel_count {
            self.process_panel(index, report).await?;
        }
        info!(
            target: "portal.attachments",
            panels = panel_count,
            rows = report.records.len(),
            files = report.files.len(),
            "attachments processed"
        );
        Ok(())
    }

    async fn panels(&self) -> Result<Vec<P::Element>> {
        let scope = match &self.pane {
            Some(chain) => self.locator.try_locate(None, chain).await?,
            None => None,
        };
        self.locator
            .locate_all(scope.as_ref(), &selectors::attachment_panels())
            .await
    }

    async fn panel(&self, index: usize) -> Result<P::Element> {
        self.panels()
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| PortalError::NotFound(format!("attachment panel {}", index + 1)))
    }

    async fn toggle(&self, index: usize) -> Result<Option<P::Element>> {
        let panel = self.panel(index).await?;
        self.locator.try_locate(Some(&panel), &selectors::panel_toggle()).await
    }

    async fn title(&self, index: usize) -> Result<String> {
        let title = match self.toggle(index).await? {
            Some(toggle) => self.locator.text_of(&toggle).await?,
            None => {
                let panel = self.panel(index).await?;
                self.locator
                    .child_text(&panel, ".card-header, .panel-heading")
                    .await?
                    .unwrap_or_default()
            }
        };
        if title.is_empty() {
            Ok(format!("Attachment group {}", index + 1))
        } else {
            Ok(title)
        }
    }

    async fn is_expanded(&self, index: usize) -> Result<bool> {
        let page = self.locator.page();
        if let Some(toggle) = self.toggle(index).await? {
            if let Some(expanded) = page.attr(&toggle, "aria-expanded").await? {
                return Ok(expanded == "true");
            }
        }
        let panel = self.panel(index).await?;
        let body = page
            .find(Some(&panel), &Selector::css(".collapse, .panel-collapse"))
            .await?;
        match body {
            Some(body) => {
                let class = page.attr(&body, "class").await?.unwrap_or_default();
                Ok(class.split_whitespace().any(|c| c == "show" || c == "in"))
            }
            // No collapsible body: the rows are always visible.
            None => Ok(true),
        }
    }

    async fn click_toggle(&self, index: usize) -> Result<bool> {
        let Some(toggle) = self.toggle(index).await? else {
            return Ok(false);
        };
        self.locator.click(&toggle, "panel toggle").await?;
        self.locator.settle().await;
        Ok(true)
    }

    async fn row(&self, panel: usize, row: usize) -> Result<Option<P::Element>> {
        let panel = self.panel(panel).await?;
        let rows = self.locator.locate_all(Some(&panel), &selectors::panel_rows()).await?;
        Ok(rows.into_iter().nth(row))
    }

    async fn process_panel(&self, index: usize, report: &mut AttachmentReport) -> Result<()> {
        let title = self.title(index).await?;
        let opened = if self.is_expanded(index).await? {
            false
        } else {
            self.click_toggle(index).await?
        };
        debug!(target: "portal.attachments", panel = %title, opened, "panel ready");

        let row_count = {
            let panel = self.panel(index).await?;
            self.locator.locate_all(Some(&panel), &selectors::panel_rows()).await?.len()
        };

        for row_index in 0..row_count {
            let Some((description, date)) = self.row_metadata(index, row_index).await? else {
                continue;
            };
            let downloaded = if self.download {
                match self.download_row(index, row_index).await {
                    Ok(Some(files)) => {
                        report.files.extend(files);
                        true
                    }
                    Ok(None) => false,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(
                            target: "portal.attachments",
                            panel = %title,
                            row = row_index,
                            error = %e,
                            "download failed; continuing with the next row"
                        );
                        false
                    }
                }
            } else {
                false
            };
            report.records.push(AttachmentRecord {
                panel_title: title.clone(),
                description,
                date,
                downloaded,
            });
        }

        if opened {
            match self.click_toggle(index).await {
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(target: "portal.attachments", panel = %title, error = %e, "panel left open");
                }
                Ok(_) => {}
            }
        }
        Ok(())
    }

    /// Description and date of a file row. Serial-number and control cells
    /// are skipped; `None` for rows without any cells.
    async fn row_metadata(&self, panel: usize, row: usize) -> Result<Option<(String, Option<String>)>> {
        let Some(row_el) = self.row(panel, row).await? else {
            return Ok(None);
        };
        let page = self.locator.page();
        let mut cells = page.find_all(Some(&row_el), &Selector::css("td")).await?;
        if cells.is_empty() {
            cells.push(row_el.clone());
        }

        let mut description = None;
        let mut date = None;
        for cell in &cells {
            let text = self.locator.text_of(cell).await?;
            if text.is_empty() || text.chars().all(|c| c.is_ascii_digit() || c == '.') {
                continue;
            }
            if date.is_none() {
                if let Some(found) = find_date(&text) {
                    date = Some(found);
                    if text.trim() == date.as_deref().unwrap_or_default() {
                        continue;
                    }
                }
            }
            if description.is_none() && !text.eq_ignore_ascii_case("download") {
                description = Some(text);
            }
        }
        Ok(Some((description.unwrap_or_default(), date)))
    }

    /// Trigger the row's download and wait for it to land. `None` when the
    /// row has no download control or the file never completed.
    async fn download_row(&self, panel: usize, row: usize) -> Result<Option<Vec<String>>> {
        let Some(row_el) = self.row(panel, row).await? else {
            return Ok(None);
        };
        let Some(control) = self
            .locator
            .try_locate(Some(&row_el), &selectors::download_control())
            .await?
        else {
            debug!(target: "portal.attachments", panel, row, "row has no download control");
            return Ok(None);
        };

        let before = snapshot(&self.downloads_dir).await?;
        self.locator.click(&control, "download control").await?;
        let files = wait_for_download(&self.downloads_dir, &before, self.timing).await?;
        if files.is_empty() {
            warn!(
                target: "portal.attachments",
                panel,
                row,
                dir = %self.downloads_dir.display(),
                "download did not complete in time"
            );
            return Ok(None);
        }
        debug!(target: "portal.attachments", ?files, "download confirmed");
        Ok(Some(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_download_is_not_complete() {
        let before = names(&["a.pdf"]);
        assert_eq!(new_completed_files(&before, &names(&["a.pdf", "b.pdf.crdownload"])), None);
        assert_eq!(
            new_completed_files(&before, &names(&["a.pdf", "b.pdf"])),
            Some(vec!["b.pdf".to_string()])
        );
    }

    #[test]
    fn nothing_new_is_not_complete() {
        let before = names(&["a.pdf"]);
        assert_eq!(new_completed_files(&before, &before), None);
    }

    #[test]
    fn leftover_partial_from_an_earlier_run_does_not_block() {
        let before = names(&["old.pdf.crdownload"]);
        assert_eq!(
            new_completed_files(&before, &names(&["old.pdf.crdownload", "c.pdf"])),
            Some(vec!["c.pdf".to_string()])
        );
    }

    #[tokio::test]
    async fn snapshot_lists_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert_eq!(snapshot(dir.path()).await.unwrap(), names(&["a.pdf"]));
        assert!(snapshot(&dir.path().join("missing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wait_gives_up_with_an_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf.part"), b"x").unwrap();
        let files = wait_for_download(dir.path(), &BTreeSet::new(), &TimingConfig::instant())
            .await
            .unwrap();
        assert!(files.is_empty());
    }
}
