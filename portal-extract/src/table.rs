//! Results tables and labelled detail panels.
use crate::locator::ElementLocator;
use crate::selectors;
use crate::types::{FieldMap, TableRecord};
use portal_common::{PortalError, Result};
use portal_drivers::{PageDom, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Column keys used when the permit results table renders without a header.
pub const PERMIT_DEFAULT_HEADERS: &[&str] = &[
    "S.No",
    "File No",
    "Applicant Name",
    "Sector",
    "Application Date",
    "Status",
    "Action",
];

/// Column keys used when the case results table renders without a header.
pub const CASE_DEFAULT_HEADERS: &[&str] = &[
    "S.No",
    "Case No",
    "Petitioner",
    "Respondent",
    "Court",
    "Next Hearing",
    "Status",
    "Action",
];

/// Zip cell texts against headers by position. Missing cells read as empty
/// strings; cells past the last header are ignored.
pub fn zip_row(headers: &[String], cells: &[String]) -> FieldMap {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), cells.get(i).cloned().unwrap_or_default()))
        .collect()
}

/// Give blank headers a positional name and suffix repeated ones, so no
/// column silently overwrites another in the row maps.
pub fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() {
                format!("Column {}", i + 1)
            } else {
                h.trim().to_string()
            };
            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.clone()) {
                name = format!("{base} ({n})");
                n += 1;
            }
            name
        })
        .collect()
}

/// Read `container` as a header-keyed table. Falls back to
/// `default_headers` when no header cells exist.
pub async fn extract_table<P: PageDom>(
    locator: &ElementLocator<'_, P>,
    container: &P::Element,
    default_headers: &[&str],
) -> Result<TableRecord> {
    let mut raw_headers = Vec::new();
    for th in locator.locate_all(Some(container), &selectors::table_headers()).await? {
        raw_headers.push(locator.text_of(&th).await?);
    }
    let default_used = raw_headers.is_empty();
    let headers = if default_used {
        warn!(
            target: "portal.extract",
            defaults = ?default_headers,
            "no header cells found; using module default headers"
        );
        default_headers.iter().map(|h| h.to_string()).collect()
    } else {
        unique_headers(raw_headers)
    };

    let row_count = locator.locate_all(Some(container), &selectors::table_rows()).await?.len();
    let mut rows = Vec::new();
    for index in 0..row_count {
        let cells = match row_cells(locator, container, index).await {
            Ok(cells) => cells,
            Err(PortalError::StaleElement(_)) => {
                debug!(target: "portal.extract", index, "row went stale; re-reading");
                row_cells(locator, container, index).await?
            }
            Err(e) => return Err(e),
        };
        let Some(cells) = cells else { continue };
        if cells.is_empty() {
            continue;
        }
        rows.push(zip_row(&headers, &cells));
    }
    debug!(target: "portal.extract", columns = headers.len(), rows = rows.len(), "table extracted");

    Ok(TableRecord {
        headers,
        rows,
        default_headers: default_used,
    })
}

/// Cell texts of body row `index`, re-acquired from the live table. `None`
/// for rows that carry no data: header rows and a lone spanning
/// "no records" cell.
async fn row_cells<P: PageDom>(
    locator: &ElementLocator<'_, P>,
    container: &P::Element,
    index: usize,
) -> Result<Option<Vec<String>>> {
    let rows = locator.locate_all(Some(container), &selectors::table_rows()).await?;
    let Some(row) = rows.get(index) else {
        return Ok(None);
    };
    let page = locator.page();
    let cells = page.find_all(Some(row), &Selector::css("td")).await?;
    if cells.is_empty() {
        return Ok(None);
    }
    if cells.len() == 1 && page.attr(&cells[0], "colspan").await?.is_some() {
        debug!(target: "portal.extract", index, "skipping placeholder row");
        return Ok(None);
    }
    let mut texts = Vec::with_capacity(cells.len());
    for cell in &cells {
        texts.push(locator.text_of(cell).await?);
    }
    Ok(Some(texts))
}

/// Find the panel titled `title` (fuzzy) below `scope` and read its
/// labelled fields. A missing panel is an empty map.
pub async fn extract_section<P: PageDom>(
    locator: &ElementLocator<'_, P>,
    scope: Option<&P::Element>,
    title: &str,
) -> Result<FieldMap> {
    match locator.locate(scope, &selectors::section_panel(title)).await? {
        Some(panel) => extract_labeled_fields(locator, &panel).await,
        None => {
            debug!(target: "portal.extract", section = title, "section panel not found");
            Ok(FieldMap::new())
        }
    }
}

/// Label to value for every field group inside `panel`. The first
/// occurrence of a label wins.
pub async fn extract_labeled_fields<P: PageDom>(
    locator: &ElementLocator<'_, P>,
    panel: &P::Element,
) -> Result<FieldMap> {
    let mut fields = FieldMap::new();
    for group in locator.locate_all(Some(panel), &selectors::field_groups()).await? {
        let Some(label_el) = locator.try_locate(Some(&group), &selectors::field_label()).await? else {
            continue;
        };
        let label = locator.clean_label(&label_el).await?;
        if label.is_empty() || fields.contains_key(&label) {
            continue;
        }
        let value = field_value(locator, &group, &label_el).await?;
        fields.insert(label, value);
    }
    Ok(fields)
}

/// Value holders, highest priority first.
async fn field_value<P: PageDom>(
    locator: &ElementLocator<'_, P>,
    group: &P::Element,
    label: &P::Element,
) -> Result<String> {
    let page = locator.page();

    if let Some(input) = page
        .find(Some(group), &Selector::css("input:not([type='hidden']):not([type='checkbox'])"))
        .await?
    {
        return Ok(page.attr(&input, "value").await?.unwrap_or_default().trim().to_string());
    }

    if let Some(select) = page.find(Some(group), &Selector::css("select")).await? {
        return selected_text(locator, &select).await;
    }

    if let Some(area) = page.find(Some(group), &Selector::css("textarea")).await? {
        let value = page.attr(&area, "value").await?.unwrap_or_default();
        if !value.trim().is_empty() {
            return Ok(value.trim().to_string());
        }
        return locator.text_of(&area).await;
    }

    for css in [".form-control-static, p", ".value"] {
        if let Some(text) = locator.child_text(group, css).await? {
            return Ok(text);
        }
    }

    let whole = locator.text_of(group).await?;
    let label_text = locator.text_of(label).await?;
    Ok(whole
        .replacen(&label_text, "", 1)
        .trim()
        .trim_start_matches(':')
        .trim()
        .to_string())
}

/// Text of the option a select currently shows.
async fn selected_text<P: PageDom>(locator: &ElementLocator<'_, P>, select: &P::Element) -> Result<String> {
    let page = locator.page();
    let options = page.find_all(Some(select), &Selector::css("option")).await?;
    let current = page.attr(select, "value").await?;

    if let Some(current) = current.filter(|v| !v.is_empty()) {
        for option in &options {
            if page.attr(option, "value").await?.as_deref() == Some(current.as_str()) {
                return locator.text_of(option).await;
            }
        }
    }
    for option in &options {
        if page.attr(option, "selected").await?.is_some() {
            return locator.text_of(option).await;
        }
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_rows_fill_missing_columns_with_empty_strings() {
        let row = zip_row(&strings(&["A", "B", "C"]), &strings(&["1", "2"]));
        assert_eq!(row["A"], "1");
        assert_eq!(row["B"], "2");
        assert_eq!(row["C"], "");
    }

    #[test]
    fn extra_cells_are_ignored() {
        let row = zip_row(&strings(&["A"]), &strings(&["1", "2"]));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn blank_and_repeated_headers_are_named_apart() {
        let headers = unique_headers(strings(&["Status", "", "Status", " Date "]));
        assert_eq!(headers, strings(&["Status", "Column 2", "Status (2)", "Date"]));
    }
}
