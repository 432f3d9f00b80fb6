#![allow(dead_code)]

use portal_config::{ModuleConfig, PortalConfig, TimingConfig};
use portal_drivers::stub::StubPage;
use portal_extract::PortalSession;
use std::path::Path;
use url::Url;

pub const PERMIT_HOME: &str = "https://permits.example.gov/dashboard";
pub const CASE_HOME: &str = "https://courts.example.gov/home";

pub const DASHBOARD: &str = r#"<html><body>
  <div class="card" id="permit-card" data-stub-goto="permit-landing">
    <div class="card-header">Building Permission</div>
  </div>
  <div class="card" id="case-card" data-stub-goto="case-landing">
    <div class="card-header">Case Management</div>
  </div>
</body></html>"#;

const FILTERS: &str = r#"
  <div class="filters">
    <select formcontrolname="action">
      <option value="">Select Action</option>
      <option value="1">Sec Verification</option>
      <option value="2">Scrutiny</option>
    </select>
    <select formcontrolname="sector">
      <option value="">Select Sector</option>
      <option value="7">Sector 7</option>
    </select>
    <input id="keyword" formcontrolname="keyword" value="">
    <button id="btnSearch" data-stub-goto="__SEARCH__">Search</button>
  </div>"#;

pub fn landing(search_target: &str) -> String {
    format!(
        "<html><body>{}</body></html>",
        FILTERS.replace("__SEARCH__", search_target)
    )
}

/// Landing page plus a results table with one row opening `detail`.
pub fn results(search_target: &str, open_control: &str) -> String {
    format!(
        r#"<html><body>{}
  <span class="total-count">Total: 1</span>
  <table class="table results">
    <thead><tr><th>S.No</th><th>File No</th><th>Applicant Name</th><th>Action</th></tr></thead>
    <tbody>
      <tr><td>1</td><td>BP/2024/001</td><td>Ram Lal</td><td>{}</td></tr>
    </tbody>
  </table>
</body></html>"#,
        FILTERS.replace("__SEARCH__", search_target),
        open_control
    )
}

pub const OPEN_DETAIL: &str = r#"<a class="view" data-stub-goto="detail">View</a>"#;

pub const WORKFLOW_PANE: &str = r#"
    <div id="workflow" class="tab-pane">
      <div class="timeline-item">
        <h4 class="timeline-header"><span class="badge">Completed</span> Scrutiny <small>2 days ago</small></h4>
        <div class="timeline-meta">
          <span>Start: 01/02/2024 10:30</span>
          <span>End: 03/02/2024</span>
          <span>Assigned To: JE North</span>
        </div>
        <pre>आवेदन स्वीकृत</pre>
      </div>
      <div class="timeline-item"><span>ok</span></div>
    </div>"#;

pub const ATTACHMENT_PANE: &str = r#"
    <div id="attachment" class="tab-pane">
      <div class="accordion">
        <div class="card">
          <div class="card-header"><button aria-expanded="false" data-stub-toggle="">Site Plans</button></div>
          <div class="collapse">
            <div class="card-body">
              <table><tbody>
                <tr><td>1</td><td>Site plan</td><td>05/01/2024</td>
                    <td><a data-stub-download="a.pdf"><i class="fa fa-download"></i></a></td></tr>
                <tr><td>2</td><td>Elevation</td><td>06/01/2024</td>
                    <td><a data-stub-download="b.pdf" data-stub-download-pending><i class="fa fa-download"></i></a></td></tr>
              </tbody></table>
            </div>
          </div>
        </div>
      </div>
    </div>"#;

pub fn permit_detail() -> String {
    format!(
        r#"<html><body><div class="modal">
  <div class="modal-header">
    <h4 class="modal-title">Application BP/2024/001</h4>
    <button class="back" data-stub-goto="permit-landing">Back</button>
  </div>
  <div class="modal-body">
    <div class="detail-summary">
      <div class="form-group"><label>Applicant Name <span class="required">*</span></label><input value="Ram Lal"></div>
      <div class="form-group"><label>Sector:</label><p class="form-control-static">Sector 7</p></div>
      <div class="form-group"><label>Sector</label><p class="form-control-static">duplicate</p></div>
    </div>
    <ul class="nav nav-tabs">
      <li><a id="workflow-tab" role="tab" class="nav-link">Workflow</a></li>
      <li><a id="attachment-tab" role="tab" class="nav-link">Attachment</a></li>
    </ul>
    <div class="tab-content">{WORKFLOW_PANE}{ATTACHMENT_PANE}</div>
  </div>
</div></body></html>"#
    )
}

pub fn config(root: &Path) -> PortalConfig {
    PortalConfig {
        version: Some("1".into()),
        webdriver_url: "http://localhost:9515".into(),
        headless: true,
        downloads_dir: root.join("downloads"),
        screenshots_dir: root.join("screenshots"),
        timing: TimingConfig::instant(),
        permit: Some(ModuleConfig {
            landing_url: Url::parse(PERMIT_HOME).unwrap(),
            module_card: "Building Permission".into(),
            action_prompt: "Select Action".into(),
        }),
        case: Some(ModuleConfig {
            landing_url: Url::parse(CASE_HOME).unwrap(),
            module_card: "Case Management".into(),
            action_prompt: "Select Action".into(),
        }),
    }
}

/// Dashboard, landing, results and detail for the permit module.
pub fn permit_page(root: &Path) -> StubPage {
    StubPage::new()
        .fixture("dashboard", DASHBOARD)
        .fixture("permit-landing", &landing("permit-results"))
        .fixture("permit-results", &results("permit-results", OPEN_DETAIL))
        .fixture("detail", &permit_detail())
        .route(PERMIT_HOME, "dashboard")
        .route(CASE_HOME, "dashboard")
        .start_at("dashboard")
        .downloads_into(root.join("downloads"))
}

pub fn session(page: &StubPage, root: &Path) -> PortalSession<StubPage> {
    portal_common::observability::init_test_tracing();
    PortalSession::new(page.clone(), config(root))
}

pub fn count(clicks: &[String], label: &str) -> usize {
    clicks.iter().filter(|c| c.as_str() == label).count()
}
