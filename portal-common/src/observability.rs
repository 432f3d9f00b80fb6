//! Process-wide `tracing` setup for the portal binary and its tests.
//!
//! Runs are unattended, so every event lands in a daily log file; `stderr`
//! gets a copy only when asked. The first [`init_logging`] call wins and
//! later calls return the file it opened.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

pub const LOG_DIR_ENV: &str = "PORTAL_LOG_DIR";
pub const LOG_FORMAT_ENV: &str = "PORTAL_LOG_FORMAT";

/// Where logs go when neither the caller nor the environment says.
const DEFAULT_LOG_ROOT: &str = "~/.local/state";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON lines; anything else is text.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) if raw.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the log file and the default directory.
    pub app_name: &'static str,
    /// Beats `PORTAL_LOG_DIR`. A leading `~` is expanded.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "portal-extract",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info",
        }
    }
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = log_dir(&config, std::env::var(LOG_DIR_ENV).ok().as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let prefix = format!("{}.log", config.app_name);
    let path = dir.join(format!("{prefix}.{}", Local::now().format("%Y-%m-%d")));
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &prefix));
    let _ = LOG_GUARD.set(guard);

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    layers.push(match config.format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    });
    if config.emit_stderr {
        layers.push(match config.format {
            LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        });
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_filter));
    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))?;

    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

/// Debug-level logging mirrored to `stderr`. Every test may call it.
pub fn init_test_tracing() {
    let _ = init_logging(LogConfig {
        app_name: "portal-tests",
        log_dir: Some(std::env::temp_dir().join("portal-tests")),
        emit_stderr: true,
        format: LogFormat::from_env(),
        default_filter: "debug",
    });
}

/// Explicit directory, then the environment override, then
/// `~/.local/state/<app_name>`.
fn log_dir(config: &LogConfig, env_dir: Option<&str>) -> PathBuf {
    match (&config.log_dir, env_dir) {
        (Some(dir), _) => expand(&dir.to_string_lossy()),
        (None, Some(dir)) if !dir.trim().is_empty() => expand(dir.trim()),
        _ => expand(DEFAULT_LOG_ROOT).join(config.app_name),
    }
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
