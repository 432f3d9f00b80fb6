mod common;

use common::*;
use portal_common::FailureKind;
use portal_drivers::stub::StubPage;
use portal_extract::{run_case, ActionRequest, FilterSpec, RunOptions, SubmitMode};

fn case_detail() -> String {
    format!(
        r#"<html><body><div class="modal">
  <div class="modal-header">
    <h5 class="modal-title">Case RRC/112/2023</h5>
    <button class="back" data-stub-goto="case-landing"><i class="fa fa-arrow-left"></i> Back</button>
  </div>
  <div class="modal-body">
    <ul class="nav nav-tabs">
      <li><a id="caseinfo-tab" role="tab" class="nav-link">Case Information</a></li>
      <li><a id="workflow-tab" role="tab" class="nav-link">Workflow</a></li>
      <li><a id="attachment-tab" role="tab" class="nav-link">Attachment</a></li>
      <li><a id="action-tab" role="tab" class="nav-link">Action</a></li>
    </ul>
    <div class="tab-content">
      <div id="caseinfo" class="tab-pane">
        <div class="card">
          <div class="card-header">Property Information</div>
          <div class="card-body">
            <div class="form-group"><label>Khasra No.<sup>1</sup></label><span class="value">112/4</span></div>
            <div class="form-group"><label>Village</label><select><option value="">--</option><option value="9" selected>Bassi</option></select></div>
          </div>
        </div>
        <div class="card">
          <div class="card-header">Case Details <span class="badge">Open</span></div>
          <div class="card-body">
            <div class="form-group"><label>Court:</label><input value="SDM Court"></div>
            <div class="form-group"><label>Remarks</label><textarea>Listed for hearing</textarea></div>
          </div>
        </div>
      </div>
      {WORKFLOW_PANE}
      {ATTACHMENT_PANE}
      <div id="action" class="tab-pane">
        <select id="actionCode">
          <option value="">Select Action</option>
          <option value="APR">Approve</option>
          <option value="REJ">Reject</option>
        </select>
        <textarea id="remarks"></textarea>
        <button class="btn-draft">Save as Draft</button>
        <button class="btn-submit"><i class="fa fa-paper-plane"></i> Submit</button>
      </div>
    </div>
  </div>
</div></body></html>"#
    )
}

fn case_page(root: &std::path::Path) -> StubPage {
    StubPage::new()
        .fixture("dashboard", DASHBOARD)
        .fixture("case-landing", &landing("case-results"))
        .fixture(
            "case-results",
            &results("case-results", r#"<button class="view" data-stub-goto="case-detail">Open</button>"#),
        )
        .fixture("case-detail", &case_detail())
        .route(CASE_HOME, "dashboard")
        .start_at("dashboard")
        .downloads_into(root.join("downloads"))
}

#[tokio::test]
async fn case_information_and_draft_action() {
    let root = tempfile::tempdir().unwrap();
    let page = case_page(root.path());
    let session = session(&page, root.path());
    let request = ActionRequest {
        action_code: "approve".into(),
        remarks: "Site verified".into(),
        submit: SubmitMode::Draft,
    };

    let result = run_case(&session, FilterSpec::default(), &RunOptions::default(), Some(request)).await;

    assert!(result.is_complete(), "unexpected failure: {:?}", result.error);
    assert_eq!(result.heading.as_deref(), Some("Case RRC/112/2023"));
    assert_eq!(result.all_rows.len(), 1);

    let info = result.case_info.as_ref().unwrap();
    assert_eq!(info.property_info["Khasra No."], "112/4");
    assert_eq!(info.property_info["Village"], "Bassi");
    assert_eq!(info.case_details["Court"], "SDM Court");
    assert_eq!(info.case_details["Remarks"], "Listed for hearing");
    assert!(info.gis_coordinates.is_empty());

    assert_eq!(result.workflow.len(), 1);
    assert_eq!(result.attachments.len(), 2);

    let outcome = result.action_outcome.as_ref().unwrap();
    assert_eq!(outcome.action_code, "APR");
    assert_eq!(outcome.submit, SubmitMode::Draft);
    assert_eq!(outcome.remarks_typed, "Site verified".len());
    assert!(outcome.submitted);

    let clicks = page.clicks();
    assert_eq!(count(&clicks, "Save as Draft"), 1);
    assert_eq!(count(&clicks, "Submit"), 0);
    assert!(page.events().contains(&"change:actionCode=APR".to_string()));
    assert_eq!(page.current_fixture().as_deref(), Some("case-landing"));
}

#[tokio::test]
async fn final_submission_types_remarks_into_the_box() {
    let root = tempfile::tempdir().unwrap();
    let page = case_page(root.path());
    let session = session(&page, root.path());
    let request = ActionRequest {
        action_code: "REJ".into(),
        remarks: "दस्तावेज़ अपूर्ण".into(),
        submit: SubmitMode::Final,
    };

    let result = run_case(&session, FilterSpec::default(), &RunOptions::default(), Some(request)).await;

    assert!(result.is_complete(), "unexpected failure: {:?}", result.error);
    let outcome = result.action_outcome.unwrap();
    assert_eq!(outcome.action_code, "REJ");
    assert_eq!(outcome.remarks_typed, "दस्तावेज़ अपूर्ण".chars().count());
    assert_eq!(count(&page.clicks(), "Submit"), 1);
    assert_eq!(count(&page.clicks(), "Save as Draft"), 0);
}

#[tokio::test]
async fn unknown_action_code_keeps_everything_read_before_it() {
    let root = tempfile::tempdir().unwrap();
    let page = case_page(root.path());
    let session = session(&page, root.path());
    let request = ActionRequest {
        action_code: "transfer".into(),
        remarks: String::new(),
        submit: SubmitMode::Draft,
    };

    let result = run_case(&session, FilterSpec::default(), &RunOptions::default(), Some(request)).await;

    assert_eq!(result.error_kind, Some(FailureKind::StageFailed));
    assert!(result.error.as_deref().unwrap().starts_with("write-back"));
    assert!(result.action_outcome.is_none());
    assert!(result.case_info.is_some());
    assert_eq!(result.workflow.len(), 1);
    assert_eq!(count(&page.clicks(), "Save as Draft"), 0);
    assert_eq!(page.current_fixture().as_deref(), Some("case-landing"));
}

#[tokio::test]
async fn missing_case_section_is_a_configuration_failure() {
    let root = tempfile::tempdir().unwrap();
    let page = case_page(root.path());
    let mut config = config(root.path());
    config.case = None;
    let session = portal_extract::PortalSession::new(page.clone(), config);

    let result = run_case(&session, FilterSpec::default(), &RunOptions::default(), None).await;

    assert_eq!(result.error_kind, Some(FailureKind::Config));
    assert!(page.clicks().is_empty());
}
