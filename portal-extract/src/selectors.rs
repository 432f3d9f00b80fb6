//! Named lookups for both portals. Each returns a fallback chain whose first
//! strategy targets the current markup and whose later strategies survive
//! the layout changes seen so far.
use crate::locator::{Descriptor as D, FallbackChain};
use crate::types::{FilterField, SubmitMode};

/// Which tab of the detail view to activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Workflow,
    Attachment,
    CaseInfo,
    Action,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::Workflow => "Workflow",
            Tab::Attachment => "Attachment",
            Tab::CaseInfo => "Case Information",
            Tab::Action => "Action",
        }
    }

    fn id(&self) -> &'static str {
        match self {
            Tab::Workflow => "workflow-tab",
            Tab::Attachment => "attachment-tab",
            Tab::CaseInfo => "caseinfo-tab",
            Tab::Action => "action-tab",
        }
    }

    fn pane(&self) -> &'static str {
        match self {
            Tab::Workflow => "workflow",
            Tab::Attachment => "attachment",
            Tab::CaseInfo => "caseinfo",
            Tab::Action => "action",
        }
    }
}

pub const TAB_CSS: &str = "[role='tab'], .nav-tabs a, .nav-link";

/// Dashboard tile that opens a module, matched by its header text.
pub fn module_card(title: &str) -> FallbackChain {
    FallbackChain::new(
        "module card",
        vec![
            D::header(".card", ".card-header, .card-title", title),
            D::header(".dashboard-tile", "h4, h5, .tile-title", title),
            D::xpath_text("div[contains(@class,'card')]", title),
        ],
    )
}

/// Present once the module landing page has rendered its filter bar.
pub fn landing_marker(action_prompt: &str) -> FallbackChain {
    FallbackChain::new(
        "module landing",
        vec![
            D::first_option(action_prompt),
            D::css("select[formcontrolname='action']"),
            D::css("select[name='action']"),
        ],
    )
}

pub fn filter_control(field: FilterField, action_prompt: &str) -> FallbackChain {
    let steps = match field {
        FilterField::Action => return landing_marker(action_prompt),
        FilterField::Sector => vec![
            D::first_option("Select Sector"),
            D::css("select[formcontrolname='sector']"),
            D::css("select[name='sector']"),
        ],
        FilterField::SearchColumn => vec![
            D::first_option("Select Column"),
            D::css("select[formcontrolname='searchColumn']"),
            D::css("select[name='searchColumn']"),
        ],
        FilterField::Keyword => vec![
            D::id("keyword"),
            D::css("input[formcontrolname='keyword']"),
            D::css("input[placeholder*='Search']"),
        ],
        FilterField::FileNumber => vec![
            D::id("fileNumber"),
            D::css("input[formcontrolname='fileNo']"),
            D::css("input[placeholder*='File']"),
        ],
        FilterField::ApplicantName => vec![
            D::id("applicantName"),
            D::css("input[formcontrolname='applicantName']"),
            D::css("input[placeholder*='Applicant']"),
        ],
    };
    FallbackChain::new(field.as_str(), steps)
}

pub fn search_button() -> FallbackChain {
    FallbackChain::new(
        "search button",
        vec![
            D::id("btnSearch"),
            D::icon("button", "fa-search"),
            D::xpath_text("button", "Search"),
            D::text("button", "Search"),
        ],
    )
}

pub fn results_table() -> FallbackChain {
    FallbackChain::new(
        "results table",
        vec![
            D::css("table.results"),
            D::css("table.table"),
            D::css("table"),
        ],
    )
}

pub fn table_headers() -> FallbackChain {
    FallbackChain::new(
        "table headers",
        vec![D::css("thead th"), D::css("tr th")],
    )
}

pub fn table_rows() -> FallbackChain {
    FallbackChain::new("table rows", vec![D::css("tbody tr"), D::css("tr")])
}

/// Total-record badge on the landing page.
pub fn count_badge() -> FallbackChain {
    FallbackChain::new(
        "count badge",
        vec![
            D::css(".total-count"),
            D::css(".badge.total"),
            D::text(".badge", "Total"),
        ],
    )
}

/// Control inside a result row that opens the record.
pub fn open_record() -> FallbackChain {
    FallbackChain::new(
        "open record",
        vec![
            D::css("a.view, button.view"),
            D::icon("a, button", "fa-eye"),
            D::css("td a"),
        ],
    )
}

/// Present once the detail view has rendered.
pub fn detail_heading() -> FallbackChain {
    FallbackChain::new(
        "detail heading",
        vec![
            D::css(".modal-title"),
            D::css(".page-title"),
            D::css(".modal-header h4, .modal-header h5"),
        ],
    )
}

pub fn detail_summary() -> FallbackChain {
    FallbackChain::new(
        "detail summary",
        vec![
            D::css(".detail-summary"),
            D::css(".application-details"),
            D::css(".modal-body"),
        ],
    )
}

pub fn tab(tab: Tab) -> FallbackChain {
    FallbackChain::new(
        tab.label(),
        vec![
            D::id(tab.id()),
            D::text(TAB_CSS, tab.label()),
            D::xpath_text("a", tab.label()),
        ],
    )
}

/// Content pane of a tab; callers fall back to the whole page.
pub fn tab_pane(tab: Tab) -> FallbackChain {
    FallbackChain::new(
        "tab pane",
        vec![
            D::id(tab.pane()),
            D::css(&format!("[aria-labelledby='{}']", tab.id())),
            D::css(".tab-pane.active"),
        ],
    )
}

pub fn back_button() -> FallbackChain {
    FallbackChain::new(
        "back button",
        vec![
            D::css("button.back, a.back"),
            D::icon("button, a", "fa-arrow-left"),
            D::text("button, a", "Back"),
            D::css(".modal-header button.close"),
        ],
    )
}

/// Titled panel holding label/value groups.
pub fn section_panel(title: &str) -> FallbackChain {
    FallbackChain::new(
        "section panel",
        vec![
            D::header(".card", ".card-header", title),
            D::header(".panel", ".panel-heading", title),
            D::header("fieldset", "legend", title),
        ],
    )
}

pub fn field_groups() -> FallbackChain {
    FallbackChain::new(
        "field groups",
        vec![D::css(".form-group"), D::css(".field"), D::css("tr")],
    )
}

pub fn field_label() -> FallbackChain {
    FallbackChain::new(
        "field label",
        vec![D::css("label"), D::css(".label, th, dt")],
    )
}

pub fn workflow_entries() -> FallbackChain {
    FallbackChain::new(
        "workflow entries",
        vec![
            D::css(".timeline-item"),
            D::css(".workflow-entry"),
            D::css("ul.timeline > li"),
        ],
    )
}

pub const WORKFLOW_HEADING: &str = ".timeline-header, h4, h5";
pub const WORKFLOW_BADGE: &str = ".badge, .label";
pub const WORKFLOW_HEADING_DECORATION: &str = "i, small, .time, .sr-only";
/// Start date, end date, assignee, in that order.
pub const WORKFLOW_REGIONS: &str = ".timeline-meta > span, .timeline-body .meta";
pub const WORKFLOW_REMARKS: &str = "pre, .remarks";

pub fn attachment_panels() -> FallbackChain {
    FallbackChain::new(
        "attachment panels",
        vec![
            D::css(".accordion .card"),
            D::css(".panel-group .panel"),
        ],
    )
}

pub fn panel_toggle() -> FallbackChain {
    FallbackChain::new(
        "panel toggle",
        vec![
            D::css(".card-header button"),
            D::css(".panel-title a"),
            D::css("[data-toggle='collapse']"),
        ],
    )
}

pub fn panel_rows() -> FallbackChain {
    FallbackChain::new(
        "attachment rows",
        vec![
            D::css(".card-body tbody tr"),
            D::css(".panel-body tbody tr"),
            D::css(".file-row"),
        ],
    )
}

pub fn download_control() -> FallbackChain {
    FallbackChain::new(
        "download control",
        vec![
            D::icon("a, button", "fa-download"),
            D::css("a[download]"),
            D::text("a, button", "Download"),
        ],
    )
}

pub fn action_dropdown(action_prompt: &str) -> FallbackChain {
    FallbackChain::new(
        "action code",
        vec![
            D::id("actionCode"),
            D::css("select[formcontrolname='actionCode']"),
            D::first_option(action_prompt),
        ],
    )
}

pub fn remarks_box() -> FallbackChain {
    FallbackChain::new(
        "remarks",
        vec![
            D::id("remarks"),
            D::css("textarea[formcontrolname='remarks']"),
            D::css("textarea"),
        ],
    )
}

pub fn submit_button(mode: SubmitMode) -> FallbackChain {
    match mode {
        SubmitMode::Draft => FallbackChain::new(
            "save draft",
            vec![
                D::text("button", "Save as Draft"),
                D::icon("button", "fa-save"),
                D::css("button.btn-draft"),
            ],
        ),
        SubmitMode::Final => FallbackChain::new(
            "submit",
            vec![
                D::text("button", "Submit"),
                D::icon("button", "fa-paper-plane"),
                D::css("button.btn-submit"),
            ],
        ),
    }
}
