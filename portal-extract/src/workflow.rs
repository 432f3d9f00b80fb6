//! Workflow timeline extraction.
//!
//! Each timeline entry is read into [`EntryParts`] from the live page, then
//! turned into a [`WorkflowEntry`] by pure code so the pruning and fallback
//! rules can be tested without a browser.
use crate::locator::ElementLocator;
use crate::selectors;
use crate::types::WorkflowEntry;
use portal_common::{PortalError, Result};
use portal_drivers::{PageDom, Selector};
use portal_transcode::TranscodedText;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Entries whose only content is shorter than this are noise.
pub const MIN_RAW_TEXT_CHARS: usize = 6;
pub const MAX_RAW_TEXT_CHARS: usize = 300;

/// Raw text pieces of one timeline entry as rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryParts {
    pub heading: Option<String>,
    pub badge: Option<String>,
    /// Text of decoration children (icons, relative times) inside the heading.
    pub decorations: Vec<String>,
    /// Start date, end date and assignee regions, in that order.
    pub regions: Vec<String>,
    pub remarks: Option<String>,
    pub full_text: String,
}

fn date_pattern() -> Option<&'static Regex> {
    static DATE: OnceLock<Option<Regex>> = OnceLock::new();
    DATE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{4}-\d{2}-\d{2}(?:[ T]\d{1,2}:\d{2}(?::\d{2})?)?|\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}(?:\s+\d{1,2}:\d{2}(?::\d{2})?(?:\s*[AP]M)?)?|\d{1,2}[\s\-](?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*[\s\-]\d{4})\b",
        )
        .ok()
    })
    .as_ref()
}

/// First date-looking substring of `region`.
pub fn find_date(region: &str) -> Option<String> {
    date_pattern()?
        .find(region)
        .map(|m| m.as_str().trim().to_string())
}

fn non_empty(text: &str) -> Option<String> {
    let t = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!t.is_empty()).then_some(t)
}

/// Drop a leading `Label:` from a region's text.
fn strip_region_label(text: &str) -> Option<String> {
    let value = match text.split_once(':') {
        Some((_, rest)) => rest,
        None => text,
    };
    non_empty(value)
}

/// Build an entry from its parts; `None` when it carries no signal.
pub fn build_entry(parts: &EntryParts) -> Option<WorkflowEntry> {
    let status = parts.badge.as_deref().and_then(non_empty);

    let process_name = parts.heading.as_deref().and_then(|heading| {
        let mut name = heading.to_string();
        for piece in parts.badge.iter().chain(parts.decorations.iter()) {
            if !piece.trim().is_empty() {
                name = name.replacen(piece.trim(), "", 1);
            }
        }
        non_empty(&name)
    });

    let start_date = parts.regions.first().and_then(|r| find_date(r));
    let end_date = parts.regions.get(1).and_then(|r| find_date(r));
    let assigned_to = parts.regions.get(2).and_then(|r| strip_region_label(r));
    let remarks = parts.remarks.as_deref().and_then(|r| {
        let r = r.trim();
        (!r.is_empty()).then(|| r.to_string())
    });

    let raw_text = if process_name.is_none() && remarks.is_none() {
        non_empty(&parts.full_text)
            .filter(|t| t.chars().count() >= MIN_RAW_TEXT_CHARS)
            .map(|t| t.chars().take(MAX_RAW_TEXT_CHARS).collect())
    } else {
        None
    };

    let entry = WorkflowEntry {
        status,
        process_name,
        start_date,
        end_date,
        assigned_to,
        remarks,
        remarks_original: None,
        raw_text,
        raw_text_original: None,
    };
    entry.has_signal().then_some(entry)
}

/// Convert Kruti Dev remarks and raw text to Unicode, keeping the source
/// when conversion changed it.
pub fn normalise_entry(entry: &mut WorkflowEntry) {
    if let Some(remarks) = entry.remarks.take() {
        let t = TranscodedText::auto(&remarks);
        entry.remarks_original = t.original_if_changed().map(str::to_string);
        entry.remarks = Some(t.text);
    }
    if let Some(raw) = entry.raw_text.take() {
        let t = TranscodedText::auto(&raw);
        entry.raw_text_original = t.original_if_changed().map(str::to_string);
        entry.raw_text = Some(t.text);
    }
    if entry.remarks_original.is_some() || entry.raw_text_original.is_some() {
        debug!(target: "portal.transcode", process = ?entry.process_name, "converted Kruti Dev text");
    }
}

/// Read every timeline entry under `scope` (the workflow pane, or the whole
/// page when the pane cannot be told apart).
pub async fn extract_workflow<P: PageDom>(
    locator: &ElementLocator<'_, P>,
    scope: Option<&P::Element>,
) -> Result<Vec<WorkflowEntry>> {
    let count = locator.locate_all(scope, &selectors::workflow_entries()).await?.len();
    let mut entries = Vec::new();
    for index in 0..count {
        let parts = match entry_parts(locator, scope, index).await {
            Ok(parts) => parts,
            Err(PortalError::StaleElement(_)) => entry_parts(locator, scope, index).await?,
            Err(e) => return Err(e),
        };
        let Some(parts) = parts else { continue };
        match build_entry(&parts) {
            Some(mut entry) => {
                normalise_entry(&mut entry);
                entries.push(entry);
            }
            None => debug!(target: "portal.workflow", index, "dropping entry without content"),
        }
    }
    info!(target: "portal.workflow", found = count, kept = entries.len(), "workflow extracted");
    Ok(entries)
}

async fn entry_parts<P: PageDom>(
    locator: &ElementLocator<'_, P>,
    scope: Option<&P::Element>,
    index: usize,
) -> Result<Option<EntryParts>> {
    let items = locator.locate_all(scope, &selectors::workflow_entries()).await?;
    let Some(item) = items.get(index) else {
        return Ok(None);
    };
    let page = locator.page();
    let mut parts = EntryParts::default();

    if let Some(heading) = page.find(Some(item), &Selector::css(selectors::WORKFLOW_HEADING)).await? {
        parts.heading = Some(locator.text_of(&heading).await?);
        parts.badge = locator.child_text(&heading, selectors::WORKFLOW_BADGE).await?;
        for deco in page
            .find_all(Some(&heading), &Selector::css(selectors::WORKFLOW_HEADING_DECORATION))
            .await?
        {
            parts.decorations.push(locator.text_of(&deco).await?);
        }
    }

    for region in page
        .find_all(Some(item), &Selector::css(selectors::WORKFLOW_REGIONS))
        .await?
    {
        parts.regions.push(locator.text_of(&region).await?);
    }

    parts.remarks = locator.child_text(item, selectors::WORKFLOW_REMARKS).await?;
    parts.full_text = locator.text_of(item).await?;
    Ok(Some(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_splits_into_status_and_process() {
        let parts = EntryParts {
            heading: Some("Completed Scrutiny by JE 2 days ago".into()),
            badge: Some("Completed".into()),
            decorations: vec!["2 days ago".into()],
            regions: vec![
                "Start: 01/02/2024 10:30".into(),
                "End: 2024-02-03".into(),
                "Assigned To: Ravi Kumar".into(),
            ],
            remarks: Some("दस्तावेज़ सत्यापित".into()),
            full_text: String::new(),
        };
        let entry = build_entry(&parts).unwrap();
        assert_eq!(entry.status.as_deref(), Some("Completed"));
        assert_eq!(entry.process_name.as_deref(), Some("Scrutiny by JE"));
        assert_eq!(entry.start_date.as_deref(), Some("01/02/2024 10:30"));
        assert_eq!(entry.end_date.as_deref(), Some("2024-02-03"));
        assert_eq!(entry.assigned_to.as_deref(), Some("Ravi Kumar"));
        assert!(entry.raw_text.is_none());
    }

    #[test]
    fn tiny_entries_without_heading_or_remarks_are_dropped() {
        let parts = EntryParts {
            full_text: "  ok  ".into(),
            ..Default::default()
        };
        assert!(build_entry(&parts).is_none());
    }

    #[test]
    fn plain_body_is_kept_as_raw_text() {
        let parts = EntryParts {
            full_text: "Forwarded.".into(),
            ..Default::default()
        };
        let entry = build_entry(&parts).unwrap();
        assert_eq!(entry.raw_text.as_deref(), Some("Forwarded."));
    }

    #[test]
    fn raw_text_is_capped() {
        let parts = EntryParts {
            full_text: "x".repeat(500),
            ..Default::default()
        };
        let entry = build_entry(&parts).unwrap();
        assert_eq!(entry.raw_text.unwrap().chars().count(), MAX_RAW_TEXT_CHARS);
    }

    #[test]
    fn kruti_dev_remarks_keep_their_source() {
        let mut entry = WorkflowEntry {
            process_name: Some("Scrutiny".into()),
            remarks: Some("vkosnu Lohd`r fd;k x;k".into()),
            ..Default::default()
        };
        normalise_entry(&mut entry);
        assert_eq!(entry.remarks.as_deref(), Some("आवेदन स्वीकृत किया गया"));
        assert_eq!(entry.remarks_original.as_deref(), Some("vkosnu Lohd`r fd;k x;k"));
    }

    #[test]
    fn unicode_remarks_pass_through() {
        let mut entry = WorkflowEntry {
            remarks: Some("आवेदन स्वीकृत".into()),
            ..Default::default()
        };
        normalise_entry(&mut entry);
        assert_eq!(entry.remarks.as_deref(), Some("आवेदन स्वीकृत"));
        assert!(entry.remarks_original.is_none());
    }

    #[test]
    fn dates_in_several_shapes() {
        assert_eq!(find_date("on 5-Mar-2024").as_deref(), Some("5-Mar-2024"));
        assert_eq!(find_date("End: 12.11.23").as_deref(), Some("12.11.23"));
        assert_eq!(find_date("pending"), None);
    }
}
