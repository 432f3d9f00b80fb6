//! Values produced by one extraction run. All of them are snapshots of the
//! page at the moment they were read; re-run the extraction to refresh.
use chrono::{DateTime, Utc};
use portal_common::{FailureKind, PortalError, PortalModule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Label (or column header) to value.
pub type FieldMap = BTreeMap<String, String>;

/// Filters to apply on the module landing page. `None` leaves the control
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub action: Option<String>,
    pub sector: Option<String>,
    pub search_column: Option<String>,
    pub keyword: Option<String>,
    pub file_number: Option<String>,
    pub applicant_name: Option<String>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.dropdowns().all(|(_, v)| v.is_none()) && self.text_inputs().all(|(_, v)| v.is_none())
    }

    /// Dropdown filters, in the order they are applied.
    pub fn dropdowns(&self) -> impl Iterator<Item = (FilterField, Option<&str>)> {
        [
            (FilterField::Action, self.action.as_deref()),
            (FilterField::Sector, self.sector.as_deref()),
            (FilterField::SearchColumn, self.search_column.as_deref()),
        ]
        .into_iter()
    }

    /// Free-text filters, in the order they are applied.
    pub fn text_inputs(&self) -> impl Iterator<Item = (FilterField, Option<&str>)> {
        [
            (FilterField::Keyword, self.keyword.as_deref()),
            (FilterField::FileNumber, self.file_number.as_deref()),
            (FilterField::ApplicantName, self.applicant_name.as_deref()),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Action,
    Sector,
    SearchColumn,
    Keyword,
    FileNumber,
    ApplicantName,
}

impl FilterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::Action => "action",
            FilterField::Sector => "sector",
            FilterField::SearchColumn => "search_column",
            FilterField::Keyword => "keyword",
            FilterField::FileNumber => "file_number",
            FilterField::ApplicantName => "applicant_name",
        }
    }
}

/// Column headers in page order plus one header-keyed map per body row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    pub headers: Vec<String>,
    pub rows: Vec<FieldMap>,
    /// Headers were not found on the page and the module defaults were used.
    #[serde(default)]
    pub default_headers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Source of `remarks` when it was transcoded from Kruti Dev.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks_original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text_original: Option<String>,
}

impl WorkflowEntry {
    /// Entries without any of these carry nothing worth reporting.
    pub fn has_signal(&self) -> bool {
        self.process_name.is_some() || self.remarks.is_some() || self.raw_text.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInformation {
    pub property_info: FieldMap,
    pub case_details: FieldMap,
    pub gis_coordinates: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub panel_title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub downloaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    Draft,
    Final,
}

/// Write-back performed on a case before leaving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_code: String,
    pub remarks: String,
    pub submit: SubmitMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Option value actually selected in the action dropdown.
    pub action_code: String,
    pub submit: SubmitMode,
    pub remarks_typed: usize,
    pub submitted: bool,
}

/// Everything one orchestrated run collected, plus the first hard failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub run_id: Uuid,
    pub module: PortalModule,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub filters: FilterSpec,
    pub heading: Option<String>,
    pub total_count: Option<u64>,
    pub headers: Vec<String>,
    /// The results table had no header cells; `headers` are the module defaults.
    #[serde(default)]
    pub default_headers: bool,
    pub all_rows: Vec<FieldMap>,
    pub details: FieldMap,
    pub workflow: Vec<WorkflowEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_info: Option<CaseInformation>,
    pub attachments: Vec<AttachmentRecord>,
    /// Files confirmed on disk; may differ from `attachments[..].downloaded`.
    pub downloaded_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_outcome: Option<ActionOutcome>,
    pub error: Option<String>,
    pub error_kind: Option<FailureKind>,
}

impl ExtractionResult {
    pub fn begin(module: PortalModule, filters: FilterSpec) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            module,
            started_at: Utc::now(),
            finished_at: None,
            filters,
            heading: None,
            total_count: None,
            headers: Vec::new(),
            default_headers: false,
            all_rows: Vec::new(),
            details: FieldMap::new(),
            workflow: Vec::new(),
            case_info: None,
            attachments: Vec::new(),
            downloaded_files: Vec::new(),
            action_outcome: None,
            error: None,
            error_kind: None,
        }
    }

    /// Record the first hard failure; later ones are ignored.
    pub fn record_failure(&mut self, message: String, kind: FailureKind) {
        if self.error.is_none() {
            self.error = Some(message);
            self.error_kind = Some(kind);
        }
    }

    pub fn rejected(mut self, err: &PortalError) -> Self {
        self.record_failure(err.to_string(), FailureKind::from(err));
        self.finish()
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}
