//! End-to-end runs for the two portal modules.
//!
//! A run claims the session, drives the sequencer stage by stage and fills
//! an [`ExtractionResult`] as it goes. The first stage that fails ends the
//! run: the failure is tagged on the result, a screenshot is attempted and
//! the page is walked back to the module landing so the next run can start
//! there. A lost session skips both, since nothing more can succeed.
use crate::attachments::{AttachmentDownloader, AttachmentReport};
use crate::locator::ElementLocator;
use crate::selectors::{self, Tab};
use crate::sequencer::Sequencer;
use crate::session::{PortalSession, RunGuard};
use crate::table::{extract_labeled_fields, extract_table};
use crate::types::{ExtractionResult, FieldMap, FilterSpec};
use crate::workflow::extract_workflow;
use portal_common::{FailureKind, PortalError, PortalModule};
use portal_config::ModuleConfig;
use portal_drivers::PageDom;
use std::fmt;
use tracing::{info, warn};

pub mod case;
pub mod permit;

pub use case::run_case;
pub use permit::run_permit;

/// Per-run switches that are not filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Click every attachment's download control and wait for the file.
    /// Without it only the attachment metadata is read.
    pub download_attachments: bool,
}

/// Why a stage ended the run.
#[derive(Debug)]
pub struct StageError {
    pub stage: &'static str,
    pub kind: FailureKind,
    pub source: PortalError,
}

impl StageError {
    pub fn new(stage: &'static str, kind: FailureKind, source: PortalError) -> Self {
        let kind = match source {
            PortalError::SessionLost(_) => FailureKind::SessionLost,
            _ => kind,
        };
        Self { stage, kind, source }
    }

    /// Tag errors from `stage` by their own kind.
    pub fn at(stage: &'static str) -> impl FnOnce(PortalError) -> StageError {
        move |e| {
            let kind = FailureKind::from(&e);
            StageError::new(stage, kind, e)
        }
    }

    /// Tag errors from `stage` as a missing primary signal.
    pub fn primary(stage: &'static str) -> impl FnOnce(PortalError) -> StageError {
        move |e| StageError::new(stage, FailureKind::PrimarySignalMissing, e)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.source)
    }
}

pub(crate) type StageResult<T> = std::result::Result<T, StageError>;

/// Claim the session and resolve the module's configuration section. The
/// caller holds the returned guard for the whole run.
pub(crate) fn claim<P: PageDom>(
    session: &PortalSession<P>,
    module: PortalModule,
) -> Result<(RunGuard<'_>, &ModuleConfig), PortalError> {
    let guard = session.begin_run().inspect_err(|_| {
        warn!(target: "portal.orchestrator", %module, "run rejected: session busy");
    })?;
    let config = session
        .config()
        .module(module_key(module))
        .map_err(|e| PortalError::Config(e.to_string()))?;
    Ok((guard, config))
}

/// State of one orchestrated run.
pub(crate) struct Run<'a, P: PageDom> {
    session: &'a PortalSession<P>,
    seq: Sequencer<'a, P>,
    pub(crate) result: ExtractionResult,
}

impl<'a, P: PageDom> Run<'a, P> {
    pub(crate) fn new(session: &'a PortalSession<P>, module: &'a ModuleConfig, result: ExtractionResult) -> Self {
        info!(
            target: "portal.orchestrator",
            run_id = %result.run_id,
            module = %result.module,
            "run started"
        );
        let seq = Sequencer::new(session.locator(), module, &session.config().timing);
        Self { session, seq, result }
    }

    pub(crate) fn locator(&self) -> &ElementLocator<'a, P> {
        self.seq.locator()
    }

    pub(crate) fn sequencer(&mut self) -> &mut Sequencer<'a, P> {
        &mut self.seq
    }

    pub(crate) fn session(&self) -> &'a PortalSession<P> {
        self.session
    }

    /// Navigate, filter and read the results table. `Ok(None)` when the
    /// table has no rows to open.
    pub(crate) async fn list(&mut self, filters: &FilterSpec, default_headers: &[&str]) -> StageResult<Option<P::Element>> {
        self.session.ensure_alive().await.map_err(StageError::at("session"))?;
        self.seq.enter_module().await.map_err(StageError::at("enter module"))?;
        self.seq.apply_filters(filters).await.map_err(StageError::at("apply filters"))?;

        let table = self
            .seq
            .wait_for_results()
            .await
            .map_err(StageError::primary("results table"))?;

        self.result.total_count = match self.seq.read_total_count().await {
            Ok(count) => count,
            Err(e) if e.is_fatal() => return Err(StageError::at("count badge")(e)),
            Err(e) => {
                warn!(target: "portal.orchestrator", error = %e, "count badge unreadable");
                None
            }
        };

        let record = extract_table(self.seq.locator(), &table, default_headers)
            .await
            .map_err(StageError::at("results table"))?;
        self.result.headers = record.headers;
        self.result.default_headers = record.default_headers;
        self.result.all_rows = record.rows;
        if self.result.all_rows.is_empty() {
            info!(target: "portal.orchestrator", "no records matched the filters");
            return Ok(None);
        }
        Ok(Some(table))
    }

    /// Open the first record and read its heading and summary fields.
    pub(crate) async fn open_detail(&mut self, table: &P::Element) -> StageResult<bool> {
        let opened = self
            .seq
            .open_first_record(table)
            .await
            .map_err(StageError::at("open record"))?;
        if !opened {
            return Ok(false);
        }

        let (heading, details) = read_detail(self.seq.locator())
            .await
            .map_err(StageError::at("detail fields"))?;
        self.result.heading = heading;
        self.result.details = details;
        Ok(true)
    }

    pub(crate) async fn workflow(&mut self) -> StageResult<()> {
        self.seq
            .select_tab(Tab::Workflow)
            .await
            .map_err(StageError::at("workflow tab"))?;
        let pane = self
            .seq
            .tab_pane(Tab::Workflow)
            .await
            .map_err(StageError::at("workflow tab"))?;
        self.result.workflow = extract_workflow(self.seq.locator(), pane.as_ref())
            .await
            .map_err(StageError::at("workflow"))?;
        Ok(())
    }

    pub(crate) async fn attachments(&mut self, options: &RunOptions) -> StageResult<()> {
        self.seq
            .select_tab(Tab::Attachment)
            .await
            .map_err(StageError::at("attachment tab"))?;

        let config = self.session.config();
        let mut downloader = AttachmentDownloader::new(self.seq.locator(), &config.timing, &config.downloads_dir)
            .within(selectors::tab_pane(Tab::Attachment));
        if !options.download_attachments {
            downloader = downloader.metadata_only();
        }
        let mut report = AttachmentReport::default();
        let outcome = downloader.run(&mut report).await;
        self.result.attachments = report.records;
        self.result.downloaded_files = report.files;
        outcome.map_err(StageError::at("attachments"))
    }

    /// Close out the run: tag a failure, then walk back to the landing page.
    pub(crate) async fn finish(mut self, outcome: StageResult<()>) -> ExtractionResult {
        match outcome {
            Ok(()) => {
                if let Err(e) = self.seq.return_to_landing().await {
                    warn!(target: "portal.orchestrator", error = %e, "could not return to module landing");
                    let err = StageError::at("return to landing")(e);
                    self.result.record_failure(err.to_string(), err.kind);
                }
            }
            Err(err) => {
                warn!(
                    target: "portal.orchestrator",
                    stage = err.stage,
                    kind = ?err.kind,
                    error = %err.source,
                    "run ended early"
                );
                self.result.record_failure(err.to_string(), err.kind);
                if err.kind != FailureKind::SessionLost {
                    let label = format!("{}-{}", self.result.module, err.stage);
                    self.session.capture_screenshot(&label).await;
                    if let Err(e) = self.seq.return_to_landing().await {
                        warn!(target: "portal.orchestrator", error = %e, "could not return to module landing");
                    }
                }
            }
        }

        let result = self.result.finish();
        info!(
            target: "portal.orchestrator",
            run_id = %result.run_id,
            module = %result.module,
            rows = result.all_rows.len(),
            workflow = result.workflow.len(),
            attachments = result.attachments.len(),
            error = ?result.error_kind,
            "run finished"
        );
        result
    }
}

async fn read_detail<P: PageDom>(locator: &ElementLocator<'_, P>) -> Result<(Option<String>, FieldMap), PortalError> {
    let mut heading = None;
    if let Some(el) = locator.try_locate(None, &selectors::detail_heading()).await? {
        let text = locator.text_of(&el).await?;
        heading = (!text.is_empty()).then_some(text);
    }
    let details = match locator.try_locate(None, &selectors::detail_summary()).await? {
        Some(summary) => extract_labeled_fields(locator, &summary).await?,
        None => FieldMap::new(),
    };
    Ok((heading, details))
}

/// Configuration section of a module and screenshot labels.
pub(crate) fn module_key(module: PortalModule) -> &'static str {
    match module {
        PortalModule::Permit => "permit",
        PortalModule::CaseManagement => "case",
    }
}
