//! The one page every run drives, and the lock that keeps runs apart.
use crate::locator::ElementLocator;
use chrono::{DateTime, Utc};
use portal_common::{PortalError, Result};
use portal_config::PortalConfig;
use portal_drivers::portal_browser::behavioral::BehavioralEngine;
use portal_drivers::{BrowserLifecycle, PageDom};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Proof that the holder owns the session for the duration of one run.
pub type RunGuard<'a> = MutexGuard<'a, ()>;

/// An explicit handle on the shared page. Orchestrators take it by
/// reference; only one run may hold it at a time.
pub struct PortalSession<P: PageDom> {
    page: P,
    config: PortalConfig,
    behavior: BehavioralEngine,
    run_lock: Mutex<()>,
}

impl<P: PageDom> PortalSession<P> {
    pub fn new(page: P, config: PortalConfig) -> Self {
        let behavior = BehavioralEngine::new(config.timing.typing_min_ms, config.timing.typing_max_ms);
        Self {
            page,
            config,
            behavior,
            run_lock: Mutex::new(()),
        }
    }

    /// Take the page from a lifecycle manager; no page means no session.
    pub fn from_lifecycle<L>(lifecycle: &L, config: PortalConfig) -> Result<Self>
    where
        L: BrowserLifecycle<Page = P>,
    {
        let page = lifecycle
            .get_page()
            .ok_or_else(|| PortalError::SessionLost("browser lifecycle has no page".into()))?;
        Ok(Self::new(page, config))
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn behavior(&self) -> &BehavioralEngine {
        &self.behavior
    }

    pub fn locator(&self) -> ElementLocator<'_, P> {
        ElementLocator::new(&self.page, &self.behavior, self.config.timing.settle())
    }

    /// Claim the session for one run. A second concurrent claim is rejected
    /// with [`PortalError::Busy`] rather than queued.
    pub fn begin_run(&self) -> Result<RunGuard<'_>> {
        self.run_lock.try_lock().map_err(|_| PortalError::Busy)
    }

    pub async fn ensure_alive(&self) -> Result<()> {
        if self.page.is_alive().await {
            Ok(())
        } else {
            Err(PortalError::SessionLost("page no longer responds".into()))
        }
    }

    /// Save a screenshot under the configured directory. Never fails the
    /// caller: any problem is logged and `None` returned.
    pub async fn capture_screenshot(&self, label: &str) -> Option<PathBuf> {
        let png = match self.page.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                debug!(target: "portal.orchestrator", error = %e, label, "screenshot unavailable");
                return None;
            }
        };
        let dir = &self.config.screenshots_dir;
        let path = dir.join(screenshot_name(Utc::now(), label));
        match write_png(dir, &path, png).await {
            Ok(()) => {
                info!(target: "portal.orchestrator", path = %path.display(), "screenshot saved");
                Some(path)
            }
            Err(e) => {
                debug!(target: "portal.orchestrator", error = %e, path = %path.display(), "screenshot not written");
                None
            }
        }
    }
}

async fn write_png(dir: &Path, path: &Path, png: Vec<u8>) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, png).await
}

/// `<unix millis>-<label>.png`, so a directory listing sorts by capture time.
fn screenshot_name(at: DateTime<Utc>, label: &str) -> String {
    format!("{}-{}.png", at.timestamp_millis(), sanitise_label(label))
}

fn sanitise_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "capture".into()
    } else {
        trimmed.to_string()
    }
}
