use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use portal_common::observability::{init_logging, LogConfig, LogFormat};
use portal_config::{PortalConfig, PortalConfigLoader};
use portal_drivers::portal_browser::behavioral::BehavioralEngine;
use portal_drivers::portal_browser::driver::{DriverOptions, PortalDriver};
use portal_drivers::portal_browser::page::PortalPage;
use portal_extract::{run_case, run_permit, ActionRequest, FilterSpec, PortalSession, RunOptions, SubmitMode};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Structured extraction from the permit and case portals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the building-permission module and read the first application.
    Permit(RunArgs),
    /// Search the case-management module, read the first case and optionally act on it.
    Case {
        #[command(flatten)]
        run: RunArgs,
        /// Action code (value or label) to record on the case.
        #[arg(long)]
        action_code: Option<String>,
        /// Remarks typed alongside the action.
        #[arg(long, default_value = "", requires = "action_code")]
        remarks: String,
        /// Submit instead of saving a draft.
        #[arg(long = "final", requires = "action_code")]
        final_submit: bool,
    },
    /// Convert Kruti Dev text to Unicode Devanagari.
    Transcode {
        text: String,
        /// Convert even when the text does not look like Kruti Dev.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Configuration file (YAML); `PORTAL__*` variables override it.
    #[arg(long, env = "PORTAL_CONFIG", default_value = "portal.yaml")]
    config: PathBuf,
    /// Download attachments instead of only listing them.
    #[arg(long)]
    download: bool,
    #[arg(long)]
    action: Option<String>,
    #[arg(long)]
    sector: Option<String>,
    #[arg(long)]
    search_column: Option<String>,
    #[arg(long)]
    keyword: Option<String>,
    #[arg(long)]
    file_number: Option<String>,
    #[arg(long)]
    applicant_name: Option<String>,
}

impl RunArgs {
    fn filters(&self) -> FilterSpec {
        FilterSpec {
            action: self.action.clone(),
            sector: self.sector.clone(),
            search_column: self.search_column.clone(),
            keyword: self.keyword.clone(),
            file_number: self.file_number.clone(),
            applicant_name: self.applicant_name.clone(),
        }
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            download_attachments: self.download,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Transcode { text, force } => {
            let out = if force {
                portal_transcode::transcode(&text)
            } else {
                portal_transcode::autoconvert(&text)
            };
            println!("{out}");
            Ok(())
        }
        Command::Permit(run) => {
            let (driver, session) = connect(&run).await?;
            let result = run_permit(&session, run.filters(), &run.options()).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            driver.close().await?;
            Ok(())
        }
        Command::Case {
            run,
            action_code,
            remarks,
            final_submit,
        } => {
            let action = action_code.map(|action_code| ActionRequest {
                action_code,
                remarks,
                submit: if final_submit {
                    SubmitMode::Final
                } else {
                    SubmitMode::Draft
                },
            });
            let (driver, session) = connect(&run).await?;
            let result = run_case(&session, run.filters(), &run.options(), action).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            driver.close().await?;
            Ok(())
        }
    }
}

/// Load configuration, start logging and attach to the running browser.
async fn connect(run: &RunArgs) -> Result<(PortalDriver, PortalSession<PortalPage>)> {
    let mut config: PortalConfig = PortalConfigLoader::new()
        .with_optional_file(&run.config)
        .load()
        .with_context(|| format!("load configuration from {}", run.config.display()))?;

    let log_path = init_logging(LogConfig {
        app_name: "portal-extract",
        format: LogFormat::from_env(),
        ..LogConfig::default()
    })?;

    let driver = PortalDriver::connect(
        &DriverOptions {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            downloads_dir: config.downloads_dir.clone(),
        },
        BehavioralEngine::new(config.timing.typing_min_ms, config.timing.typing_max_ms),
    )
    .await?;
    // The browser saves into the absolute path the driver resolved.
    config.downloads_dir = driver.downloads_dir().to_path_buf();

    info!(target: "portal.app", log = %log_path.display(), "session ready");
    let session = PortalSession::from_lifecycle(&driver, config)?;
    Ok((driver, session))
}
