use portal_config::PortalConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
version: "0.1"
webdriver_url: "http://127.0.0.1:4444"
downloads_dir: "${PORTAL_TEST_ROOT}/downloads"
timing:
  settle_ms: 200
  download_ms: 1000
permit:
  landing_url: "https://permits.example.gov/dashboard"
  module_card: "Building Permission"
case:
  landing_url: "https://courts.example.gov/home"
  module_card: "Case Management"
  action_prompt: "-- Select --"
"#;

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "portal.yaml", FILE_YAML);

    let config = temp_env::with_var("PORTAL_TEST_ROOT", Some("/srv/portal"), || {
        PortalConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load portal config")
    });

    assert_eq!(config.version.as_deref(), Some("0.1"));
    assert_eq!(config.webdriver_url, "http://127.0.0.1:4444");
    assert_eq!(
        config.downloads_dir,
        PathBuf::from("/srv/portal/downloads")
    );
    assert_eq!(config.timing.settle_ms, 200);
    assert_eq!(config.timing.poll_interval_ms, 250);
    assert!(!config.headless);

    let case = config.module("case").expect("case section");
    assert_eq!(case.action_prompt, "-- Select --");
    assert_eq!(case.landing_url.host_str(), Some("courts.example.gov"));
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "portal.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("PORTAL_TEST_ROOT", Some("/srv/portal")),
            ("PORTAL__HEADLESS", Some("true")),
            ("PORTAL__TIMING__SETTLE_MS", Some("0")),
        ],
        || PortalConfigLoader::new().with_file(&p).load().expect("load"),
    );

    assert!(config.headless);
    assert_eq!(config.timing.settle_ms, 0);
    assert_eq!(config.timing.download_ms, 1000);
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = PortalConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults only");

    assert_eq!(config.screenshots_dir, PathBuf::from("./screenshots"));
    assert!(config.module("permit").is_err());
}

#[test]
#[serial]
fn malformed_landing_url_is_rejected() {
    let result = PortalConfigLoader::new()
        .with_yaml_str(
            r#"
permit:
  landing_url: "not a url"
  module_card: "Building Permission"
"#,
        )
        .load();

    assert!(result.is_err());
}
