use crate::dom::BrowserLifecycle;
use crate::portal_browser::{behavioral::BehavioralEngine, page::PortalPage};
use anyhow::Context;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use portal_common::{PortalError, Result};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use webdriver::capabilities::Capabilities;

/// Options for attaching to a running WebDriver service.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub webdriver_url: String,
    pub headless: bool,
    /// Where the browser saves downloads; must be absolute for Chrome.
    pub downloads_dir: PathBuf,
}

/// Thin wrapper around a `fantoccini` WebDriver client. Connects to an
/// already running chromedriver; launching and tearing down the browser
/// process is left to the caller.
pub struct PortalDriver {
    pub client: Client,
    pub behavioral_engine: BehavioralEngine,
    downloads_dir: PathBuf,
}

impl PortalDriver {
    /// Create a new driver connected to the WebDriver service in `options`.
    pub async fn connect(options: &DriverOptions, behavioral_engine: BehavioralEngine) -> Result<Self> {
        let downloads_dir = absolute(&options.downloads_dir)?;
        std::fs::create_dir_all(&downloads_dir)?;

        let caps = chrome_capabilities(options.headless, &downloads_dir);
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&options.webdriver_url)
            .await
            .with_context(|| format!("connect to webdriver at {}", options.webdriver_url))?;

        info!(
            target: "portal.driver",
            url = %options.webdriver_url,
            headless = options.headless,
            downloads = %downloads_dir.display(),
            "webdriver session attached"
        );

        Ok(Self {
            client,
            behavioral_engine,
            downloads_dir,
        })
    }

    pub fn page(&self) -> PortalPage {
        PortalPage::new(self.client.clone())
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// End the WebDriver session. The browser itself stays with its owner.
    pub async fn close(self) -> Result<()> {
        self.client.close().await.map_err(anyhow::Error::from)?;
        Ok(())
    }
}

#[async_trait]
impl BrowserLifecycle for PortalDriver {
    type Page = PortalPage;

    fn get_page(&self) -> Option<PortalPage> {
        Some(self.page())
    }

    async fn is_alive(&self) -> bool {
        self.client.current_url().await.is_ok()
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(PortalError::Io)?;
    Ok(cwd.join(path))
}

/// Chrome options: optional headless mode plus silent downloads into `downloads_dir`.
pub fn chrome_capabilities(headless: bool, downloads_dir: &Path) -> Capabilities {
    let mut caps = Capabilities::new();
    let mut chrome_opts = HashMap::new();

    let mut args = vec![
        json!("--disable-dev-shm-usage"),
        json!("--no-sandbox"),
        json!("--window-size=1920,1080"),
    ];
    if headless {
        args.push(json!("--headless=new"));
        args.push(json!("--disable-gpu"));
    }
    chrome_opts.insert("args".to_string(), json!(args));
    chrome_opts.insert(
        "prefs".to_string(),
        json!({
            "download.default_directory": downloads_dir.display().to_string(),
            "download.prompt_for_download": false,
            "download.directory_upgrade": true,
            "plugins.always_open_pdf_externally": true,
        }),
    );

    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
    caps
}
