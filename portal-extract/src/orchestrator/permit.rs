use super::{claim, Run, RunOptions, StageResult};
use crate::session::PortalSession;
use crate::table::PERMIT_DEFAULT_HEADERS;
use crate::types::{ExtractionResult, FilterSpec};
use portal_common::PortalModule;
use portal_drivers::PageDom;

/// Search the permit tracker with `filters` and read the first matching
/// application: table, details, workflow and attachments.
///
/// Never returns an error: a rejected or failed run comes back as a result
/// carrying `error` and `error_kind` next to whatever was read.
pub async fn run_permit<P: PageDom>(
    session: &PortalSession<P>,
    filters: FilterSpec,
    options: &RunOptions,
) -> ExtractionResult {
    let result = ExtractionResult::begin(PortalModule::Permit, filters.clone());
    let (_guard, module) = match claim(session, PortalModule::Permit) {
        Ok(claimed) => claimed,
        Err(e) => return result.rejected(&e),
    };

    let mut run = Run::new(session, module, result);
    let outcome = stages(&mut run, &filters, options).await;
    run.finish(outcome).await
}

async fn stages<P: PageDom>(run: &mut Run<'_, P>, filters: &FilterSpec, options: &RunOptions) -> StageResult<()> {
    let Some(table) = run.list(filters, PERMIT_DEFAULT_HEADERS).await? else {
        return Ok(());
    };
    if !run.open_detail(&table).await? {
        return Ok(());
    }
    run.workflow().await?;
    run.attachments(options).await
}
