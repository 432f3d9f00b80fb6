use super::{claim, Run, RunOptions, StageError, StageResult};
use crate::selectors::{self, Tab};
use crate::sequencer::Sequencer;
use crate::session::PortalSession;
use crate::table::{extract_section, CASE_DEFAULT_HEADERS};
use crate::types::{ActionOutcome, ActionRequest, CaseInformation, ExtractionResult, FilterSpec};
use portal_common::{PortalError, PortalModule, Result};
use portal_drivers::PageDom;
use tracing::info;

pub const PROPERTY_INFORMATION: &str = "Property Information";
pub const CASE_DETAILS: &str = "Case Details";
pub const GIS_COORDINATES: &str = "GIS Coordinates";

/// Search the case-management module with `filters`, read the first case and,
/// when `action` is given, record a decision on it before leaving.
///
/// Like [`super::run_permit`] this never returns an error; see
/// [`ExtractionResult::error_kind`].
pub async fn run_case<P: PageDom>(
    session: &PortalSession<P>,
    filters: FilterSpec,
    options: &RunOptions,
    action: Option<ActionRequest>,
) -> ExtractionResult {
    let result = ExtractionResult::begin(PortalModule::CaseManagement, filters.clone());
    let (_guard, module) = match claim(session, PortalModule::CaseManagement) {
        Ok(claimed) => claimed,
        Err(e) => return result.rejected(&e),
    };

    let mut run = Run::new(session, module, result);
    let outcome = stages(&mut run, &filters, options, action.as_ref()).await;
    run.finish(outcome).await
}

async fn stages<P: PageDom>(
    run: &mut Run<'_, P>,
    filters: &FilterSpec,
    options: &RunOptions,
    action: Option<&ActionRequest>,
) -> StageResult<()> {
    let Some(table) = run.list(filters, CASE_DEFAULT_HEADERS).await? else {
        return Ok(());
    };
    if !run.open_detail(&table).await? {
        return Ok(());
    }
    case_information(run).await?;
    run.workflow().await?;
    run.attachments(options).await?;
    if let Some(request) = action {
        write_back(run, request).await?;
    }
    Ok(())
}

async fn case_information<P: PageDom>(run: &mut Run<'_, P>) -> StageResult<()> {
    let seq = run.sequencer();
    seq.select_tab(Tab::CaseInfo)
        .await
        .map_err(StageError::at("case information tab"))?;
    let pane = seq
        .tab_pane(Tab::CaseInfo)
        .await
        .map_err(StageError::at("case information tab"))?;

    let locator = run.locator();
    let mut info = CaseInformation::default();
    for (title, target) in [
        (PROPERTY_INFORMATION, &mut info.property_info),
        (CASE_DETAILS, &mut info.case_details),
        (GIS_COORDINATES, &mut info.gis_coordinates),
    ] {
        *target = extract_section(locator, pane.as_ref(), title)
            .await
            .map_err(StageError::at("case information"))?;
    }
    run.result.case_info = Some(info);
    Ok(())
}

async fn write_back<P: PageDom>(run: &mut Run<'_, P>, request: &ActionRequest) -> StageResult<()> {
    let session = run.session();
    let seq = run.sequencer();
    seq.select_tab(Tab::Action)
        .await
        .map_err(StageError::at("action tab"))?;
    let outcome = perform_action(seq, session, request)
        .await
        .map_err(StageError::at("write-back"))?;
    info!(
        target: "portal.orchestrator",
        action_code = %outcome.action_code,
        submit = ?outcome.submit,
        "case action recorded"
    );
    run.result.action_outcome = Some(outcome);
    Ok(())
}

async fn perform_action<P: PageDom>(
    seq: &Sequencer<'_, P>,
    session: &PortalSession<P>,
    request: &ActionRequest,
) -> Result<ActionOutcome> {
    let locator = seq.locator();

    let dropdown = locator
        .locate(None, &selectors::action_dropdown(&seq.module().action_prompt))
        .await?
        .ok_or_else(|| PortalError::NotFound("action code dropdown".into()))?;
    let action_code = locator
        .select_option(&dropdown, &request.action_code)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("action code {:?}", request.action_code)))?;

    let remarks_typed = if request.remarks.is_empty() {
        0
    } else {
        let remarks = locator
            .locate(None, &selectors::remarks_box())
            .await?
            .ok_or_else(|| PortalError::NotFound("remarks box".into()))?;
        locator.click(&remarks, "remarks box").await?;
        session
            .behavior()
            .type_text_human_like(locator.page(), &remarks, &request.remarks)
            .await?;
        request.remarks.chars().count()
    };

    let submit = locator
        .locate(None, &selectors::submit_button(request.submit))
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("{:?} button", request.submit)))?;
    locator.click(&submit, "submit").await?;
    locator.settle().await;

    Ok(ActionOutcome {
        action_code,
        submit: request.submit,
        remarks_typed,
        submitted: true,
    })
}
