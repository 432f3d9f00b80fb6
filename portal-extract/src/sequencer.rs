//! The per-module navigation state machine.
//!
//! Stages only move forward:
//! `Dashboard -> ModuleLanding -> Filtered -> DetailOpen -> TabSelected(..) -> Returned`.
//! A run ends in `Returned`, back on the module landing page, so the next
//! run on the same page skips the dashboard entirely.
use crate::locator::{ElementLocator, FallbackChain, TabActivation};
use crate::selectors::{self, Tab};
use crate::types::{FilterField, FilterSpec};
use portal_common::{PortalError, Result};
use portal_config::{ModuleConfig, TimingConfig};
use portal_drivers::{PageDom, Selector};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dashboard,
    ModuleLanding,
    Filtered,
    DetailOpen,
    TabSelected(Tab),
    Returned,
}

impl Stage {
    fn rank(&self) -> u8 {
        match self {
            Stage::Dashboard => 0,
            Stage::ModuleLanding => 1,
            Stage::Filtered => 2,
            Stage::DetailOpen => 3,
            Stage::TabSelected(_) => 4,
            Stage::Returned => 5,
        }
    }

    /// Forward moves only; tabs may switch among themselves and any stage
    /// past the dashboard may return to the landing page.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        match (self, next) {
            (Stage::TabSelected(_), Stage::TabSelected(_)) => true,
            (Stage::Dashboard, Stage::Returned) => false,
            (_, Stage::Returned) => true,
            (Stage::Returned, Stage::ModuleLanding) => true,
            (from, to) => to.rank() == from.rank() + 1,
        }
    }
}

/// Run `probe` until it yields a value or `budget` runs out. The probe always
/// runs at least once. Absence errors count as "not yet"; fatal errors end
/// the wait immediately.
pub async fn poll_until<T, F, Fut>(budget: Duration, interval: Duration, mut probe: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + budget;
    loop {
        match probe().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!(target: "portal.sequencer", error = %e, "probe failed; retrying"),
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            sleep(interval.min(deadline - now)).await;
        }
    }
}

/// Filters that were requested but could not be applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub applied: Vec<FilterField>,
    pub skipped: Vec<FilterField>,
}

pub struct Sequencer<'a, P: PageDom> {
    locator: ElementLocator<'a, P>,
    module: &'a ModuleConfig,
    timing: &'a TimingConfig,
    stage: Stage,
}

impl<'a, P: PageDom> Sequencer<'a, P> {
    pub fn new(locator: ElementLocator<'a, P>, module: &'a ModuleConfig, timing: &'a TimingConfig) -> Self {
        Self {
            locator,
            module,
            timing,
            stage: Stage::Dashboard,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn locator(&self) -> &ElementLocator<'a, P> {
        &self.locator
    }

    pub fn timing(&self) -> &'a TimingConfig {
        self.timing
    }

    pub fn module(&self) -> &'a ModuleConfig {
        self.module
    }

    fn advance(&mut self, next: Stage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(PortalError::Driver(anyhow::anyhow!(
                "illegal stage transition {:?} -> {:?}",
                self.stage,
                next
            )));
        }
        info!(target: "portal.sequencer", from = ?self.stage, to = ?next, "stage");
        self.stage = next;
        Ok(())
    }

    /// Poll for `chain` within `budget`.
    pub async fn wait_for(&self, chain: &FallbackChain, budget: Duration) -> Result<Option<P::Element>> {
        let locator = &self.locator;
        let found = poll_until(budget, self.timing.poll_interval(), move || async move {
            locator.try_locate(None, chain).await
        })
        .await?;
        if found.is_none() {
            debug!(target: "portal.sequencer", lookup = chain.name, tried = %chain.describe(), ?budget, "wait expired");
        }
        Ok(found)
    }

    async fn on_landing(&self) -> Result<bool> {
        let marker = selectors::landing_marker(&self.module.action_prompt);
        Ok(self.locator.try_locate(None, &marker).await?.is_some())
    }

    /// Dashboard to module landing. Skips straight ahead when a previous run
    /// left the page on the landing view.
    pub async fn enter_module(&mut self) -> Result<()> {
        if self.on_landing().await? {
            info!(target: "portal.sequencer", "already on module landing; skipping dashboard");
            return self.advance(Stage::ModuleLanding);
        }

        let page = self.locator.page();
        page.goto(&self.module.landing_url).await?;

        let card_chain = selectors::module_card(&self.module.module_card);
        let card = self
            .wait_for(&card_chain, self.timing.navigation())
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("dashboard card {:?}", self.module.module_card)))?;
        self.locator.click(&card, "module card").await?;

        let marker = selectors::landing_marker(&self.module.action_prompt);
        if self.wait_for(&marker, self.timing.navigation()).await?.is_none() {
            return Err(PortalError::Timeout(format!(
                "module landing after opening {:?}",
                self.module.module_card
            )));
        }
        self.advance(Stage::ModuleLanding)
    }

    /// Apply every present filter. Missing controls are skipped with a warning;
    /// they never fail the run.
    pub async fn apply_filters(&mut self, filters: &FilterSpec) -> Result<FilterReport> {
        let mut report = FilterReport::default();
        let prompt = self.module.action_prompt.clone();

        for (field, wanted) in filters.dropdowns() {
            let Some(wanted) = wanted else { continue };
            // Re-acquire after every change: selecting re-renders the filter bar.
            let chain = selectors::filter_control(field, &prompt);
            let Some(select) = self.wait_for(&chain, self.timing.secondary_signal()).await? else {
                warn!(target: "portal.sequencer", filter = field.as_str(), "filter control not found");
                report.skipped.push(field);
                continue;
            };
            match self.locator.select_option(&select, wanted).await? {
                Some(_) => report.applied.push(field),
                None => {
                    warn!(target: "portal.sequencer", filter = field.as_str(), wanted, "no option matched");
                    report.skipped.push(field);
                }
            }
        }

        for (field, wanted) in filters.text_inputs() {
            let Some(wanted) = wanted else { continue };
            let chain = selectors::filter_control(field, &prompt);
            match self.locator.locate(None, &chain).await? {
                Some(input) => {
                    self.locator.page().set_value(&input, wanted).await?;
                    report.applied.push(field);
                }
                None => {
                    warn!(target: "portal.sequencer", filter = field.as_str(), "filter input not found");
                    report.skipped.push(field);
                }
            }
        }

        // Without filters the search still lists every record.
        if let Some(button) = self.locator.try_locate(None, &selectors::search_button()).await? {
            self.locator.click(&button, "search button").await?;
        } else {
            debug!(target: "portal.sequencer", "no search button; relying on change events");
        }
        self.locator.settle().await;

        self.advance(Stage::Filtered)?;
        Ok(report)
    }

    /// Primary signal: a results table. Waits for body rows; a table that
    /// stays empty is accepted, no table at all is an error.
    pub async fn wait_for_results(&self) -> Result<P::Element> {
        let locator = &self.locator;
        let with_rows = poll_until(
            self.timing.primary_signal(),
            self.timing.poll_interval(),
            move || table_with_rows(locator),
        )
        .await?;
        if let Some(table) = with_rows {
            return Ok(table);
        }

        match self.locator.locate(None, &selectors::results_table()).await? {
            Some(table) => {
                warn!(target: "portal.sequencer", "results table rendered without rows");
                Ok(table)
            }
            None => Err(PortalError::Timeout("results table".into())),
        }
    }

    /// Secondary signal: the total-count badge. Polls for a non-zero value
    /// and settles for one last reading when the budget runs out.
    pub async fn read_total_count(&self) -> Result<Option<u64>> {
        let locator = &self.locator;
        let nonzero = poll_until(
            self.timing.secondary_signal(),
            self.timing.poll_interval(),
            move || nonzero_badge(locator),
        )
        .await?;
        if nonzero.is_some() {
            return Ok(nonzero);
        }
        let last = read_badge(locator).await?;
        warn!(target: "portal.sequencer", ?last, "count badge never became non-zero");
        Ok(last)
    }

    /// Open the record in the first result row. `Ok(false)` when the table
    /// has no rows.
    pub async fn open_first_record(&mut self, table: &P::Element) -> Result<bool> {
        let rows = self.locator.locate_all(Some(table), &selectors::table_rows()).await?;
        let mut first_data_row = None;
        for row in rows {
            let cells = self
                .locator
                .page()
                .find_all(Some(&row), &Selector::css("td"))
                .await?;
            if !cells.is_empty() {
                first_data_row = Some(row);
                break;
            }
        }
        let Some(row) = first_data_row else {
            info!(target: "portal.sequencer", "no result rows; nothing to open");
            return Ok(false);
        };

        let opener = self
            .locator
            .locate(Some(&row), &selectors::open_record())
            .await?
            .ok_or_else(|| PortalError::NotFound("open control in first result row".into()))?;
        self.locator.click(&opener, "open record").await?;

        if self.wait_for(&selectors::detail_heading(), self.timing.navigation()).await?.is_none() {
            return Err(PortalError::Timeout("detail view".into()));
        }
        self.advance(Stage::DetailOpen)?;
        Ok(true)
    }

    pub async fn select_tab(&mut self, tab: Tab) -> Result<TabActivation> {
        let activation = self.locator.activate_tab(&selectors::tab(tab)).await?;
        match activation {
            TabActivation::NotFound => {
                warn!(target: "portal.sequencer", tab = tab.label(), "tab not found; reading page as is");
            }
            _ => self.advance(Stage::TabSelected(tab))?,
        }
        Ok(activation)
    }

    /// Content pane of `tab` if it can be told apart from the page.
    pub async fn tab_pane(&self, tab: Tab) -> Result<Option<P::Element>> {
        self.locator.try_locate(None, &selectors::tab_pane(tab)).await
    }

    /// Leave the detail view. Falls back to re-navigating from the dashboard
    /// when the back control is missing or does not land on the module page.
    pub async fn return_to_landing(&mut self) -> Result<()> {
        if let Some(back) = self.locator.try_locate(None, &selectors::back_button()).await? {
            self.locator.click(&back, "back button").await?;
            let marker = selectors::landing_marker(&self.module.action_prompt);
            if self.wait_for(&marker, self.timing.navigation()).await?.is_some() {
                return self.advance(Stage::Returned);
            }
        }

        warn!(target: "portal.sequencer", "back navigation did not reach module landing; re-navigating");
        self.stage = Stage::Dashboard;
        self.enter_module().await?;
        self.advance(Stage::Returned)
    }
}

async fn table_with_rows<P: PageDom>(locator: &ElementLocator<'_, P>) -> Result<Option<P::Element>> {
    let Some(table) = locator.try_locate(None, &selectors::results_table()).await? else {
        return Ok(None);
    };
    let rows = locator.page().find_all(Some(&table), &Selector::css("tbody tr")).await?;
    Ok((!rows.is_empty()).then_some(table))
}

async fn nonzero_badge<P: PageDom>(locator: &ElementLocator<'_, P>) -> Result<Option<u64>> {
    Ok(read_badge(locator).await?.filter(|c| *c > 0))
}

async fn read_badge<P: PageDom>(locator: &ElementLocator<'_, P>) -> Result<Option<u64>> {
    let Some(badge) = locator.try_locate(None, &selectors::count_badge()).await? else {
        return Ok(None);
    };
    Ok(parse_count(&locator.text_of(&badge).await?))
}

/// Digits in the badge text, ignoring separators: `"Total: 1,204"` is 1204.
pub fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text
        .split_whitespace()
        .flat_map(|w| w.chars())
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
