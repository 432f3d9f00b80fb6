//! Loader for portal configuration with YAML + environment overlays.
//!
//! Files and inline snippets are merged in the order they are attached;
//! `PORTAL__`-prefixed environment variables are layered last and win.
//! Nested keys use `__` as the separator: `PORTAL__TIMING__SETTLE_MS=0`.
//! String values may reference `${VAR}`; expansion is recursive up to
//! [`MAXIMUM_ENV_EXPANSION_DEPTH`] passes.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub permit: Option<ModuleConfig>,
    #[serde(default)]
    pub case: Option<ModuleConfig>,
}

/// Where a portal module lives and how to reach it from the dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    pub landing_url: Url,
    /// Header text of the dashboard card that opens the module.
    pub module_card: String,
    /// Text of the first option of the action dropdown, used to identify it.
    #[serde(default = "default_action_prompt")]
    pub action_prompt: String,
}

/// Wait budgets and delays, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub navigation_ms: u64,
    pub primary_signal_ms: u64,
    pub secondary_signal_ms: u64,
    pub poll_interval_ms: u64,
    pub settle_ms: u64,
    pub download_ms: u64,
    pub typing_min_ms: u64,
    pub typing_max_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 15_000,
            primary_signal_ms: 20_000,
            secondary_signal_ms: 5_000,
            poll_interval_ms: 250,
            settle_ms: 800,
            download_ms: 30_000,
            typing_min_ms: 30,
            typing_max_ms: 120,
        }
    }
}

impl TimingConfig {
    /// All waits collapsed to zero; polling loops still run at least once.
    pub fn instant() -> Self {
        Self {
            navigation_ms: 0,
            primary_signal_ms: 0,
            secondary_signal_ms: 0,
            poll_interval_ms: 0,
            settle_ms: 0,
            download_ms: 0,
            typing_min_ms: 0,
            typing_max_ms: 0,
        }
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }
    pub fn primary_signal(&self) -> Duration {
        Duration::from_millis(self.primary_signal_ms)
    }
    pub fn secondary_signal(&self) -> Duration {
        Duration::from_millis(self.secondary_signal_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn download(&self) -> Duration {
        Duration::from_millis(self.download_ms)
    }
}

impl PortalConfig {
    /// Module section or a configuration error naming the missing key.
    pub fn module(&self, key: &str) -> Result<&ModuleConfig, ConfigError> {
        let section = match key {
            "permit" => self.permit.as_ref(),
            "case" => self.case.as_ref(),
            _ => None,
        };
        section.ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./downloads")
}
fn default_screenshots_dir() -> PathBuf {
    PathBuf::from("./screenshots")
}
fn default_action_prompt() -> String {
    "Select Action".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct PortalConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for PortalConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PortalConfigLoader {
    /// Start with no file sources; the environment overlay is applied in
    /// [`PortalConfigLoader::load`].
    ///
    /// ```
    /// use portal_config::PortalConfigLoader;
    ///
    /// let config = PortalConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.webdriver_url, "http://localhost:9515");
    /// assert!(config.permit.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file only if it exists, so environment-only deployments work.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use portal_config::PortalConfigLoader;
    ///
    /// let cfg = PortalConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// permit:
    ///   landing_url: "https://permits.example.gov/dashboard"
    ///   module_card: "Building Permission"
    /// timing:
    ///   settle_ms: 10
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let permit = cfg.module("permit").unwrap();
    /// assert_eq!(permit.module_card, "Building Permission");
    /// assert_eq!(permit.action_prompt, "Select Action");
    /// assert_eq!(cfg.timing.settle_ms, 10);
    /// assert_eq!(cfg.timing.download_ms, 30_000);
    /// assert!(cfg.module("case").is_err());
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded before the strongly typed structs are
    /// materialised.
    ///
    /// ```
    /// use portal_config::PortalConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_CASE_HOST", "courts.example.gov"); }
    ///
    /// let config = PortalConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// case:
    ///   landing_url: "https://${DOCTEST_CASE_HOST}/home"
    ///   module_card: "Case Management"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// let case = config.module("case").unwrap();
    /// assert_eq!(case.landing_url.host_str(), Some("courts.example.gov"));
    ///
    /// unsafe { std::env::remove_var("DOCTEST_CASE_HOST"); }
    /// ```
    pub fn load(self) -> Result<PortalConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("PORTAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: PortalConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
