mod common;

use common::*;
use portal_common::FailureKind;
use portal_drivers::stub::StubPage;
use portal_extract::table::PERMIT_DEFAULT_HEADERS;
use portal_extract::{run_permit, FilterSpec, RunOptions};

fn sec_verification() -> FilterSpec {
    FilterSpec {
        action: Some("sec verification".into()),
        keyword: Some("BP/2024".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn one_row_and_one_workflow_entry_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let page = permit_page(root.path());
    let session = session(&page, root.path());

    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;

    assert!(result.is_complete(), "unexpected failure: {:?}", result.error);
    assert_eq!(result.all_rows.len(), 1);
    assert_eq!(result.all_rows[0]["File No"], "BP/2024/001");
    assert_eq!(result.all_rows[0]["Applicant Name"], "Ram Lal");
    assert_eq!(result.headers, vec!["S.No", "File No", "Applicant Name", "Action"]);
    assert!(!result.default_headers);
    assert_eq!(result.total_count, Some(1));

    assert_eq!(result.heading.as_deref(), Some("Application BP/2024/001"));
    assert_eq!(result.details["Applicant Name"], "Ram Lal");
    assert_eq!(result.details["Sector"], "Sector 7");

    assert_eq!(result.workflow.len(), 1);
    let entry = &result.workflow[0];
    assert_eq!(entry.status.as_deref(), Some("Completed"));
    assert_eq!(entry.process_name.as_deref(), Some("Scrutiny"));
    assert_eq!(entry.start_date.as_deref(), Some("01/02/2024 10:30"));
    assert_eq!(entry.end_date.as_deref(), Some("03/02/2024"));
    assert_eq!(entry.assigned_to.as_deref(), Some("JE North"));
    assert_eq!(entry.remarks.as_deref(), Some("आवेदन स्वीकृत"));
    assert!(entry.remarks_original.is_none());

    // Metadata only without the download option.
    assert_eq!(result.attachments.len(), 2);
    assert!(result.attachments.iter().all(|a| !a.downloaded));
    assert_eq!(result.attachments[0].panel_title, "Site Plans");
    assert_eq!(result.attachments[0].description, "Site plan");
    assert_eq!(result.attachments[0].date.as_deref(), Some("05/01/2024"));

    assert!(page.events().contains(&"change:select=1".to_string()));
    assert!(page.events().contains(&"input:keyword=BP/2024".to_string()));
    assert_eq!(page.current_fixture().as_deref(), Some("permit-landing"));
    assert!(result.finished_at.is_some());
}

#[tokio::test]
async fn downloads_are_confirmed_per_row() {
    let root = tempfile::tempdir().unwrap();
    let page = permit_page(root.path());
    let session = session(&page, root.path());
    let options = RunOptions {
        download_attachments: true,
    };

    let result = run_permit(&session, sec_verification(), &options).await;

    assert!(result.is_complete(), "unexpected failure: {:?}", result.error);
    let flags: Vec<bool> = result.attachments.iter().map(|a| a.downloaded).collect();
    assert_eq!(flags, vec![true, false]);
    assert_eq!(result.downloaded_files, vec!["a.pdf"]);
    assert!(root.path().join("downloads/a.pdf").exists());
    assert!(root.path().join("downloads/b.pdf.crdownload").exists());
}

#[tokio::test]
async fn second_run_starts_from_the_module_landing() {
    let root = tempfile::tempdir().unwrap();
    let page = permit_page(root.path());
    let session = session(&page, root.path());

    let first = run_permit(&session, sec_verification(), &RunOptions::default()).await;
    let second = run_permit(&session, FilterSpec::default(), &RunOptions::default()).await;

    assert!(first.is_complete());
    assert!(second.is_complete(), "unexpected failure: {:?}", second.error);
    assert_eq!(second.all_rows.len(), 1);
    assert_eq!(count(&page.clicks(), "permit-card"), 1);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn concurrent_run_is_rejected_as_busy() {
    let root = tempfile::tempdir().unwrap();
    let page = permit_page(root.path());
    let session = session(&page, root.path());

    let _held = session.begin_run().unwrap();
    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;

    assert_eq!(result.error_kind, Some(FailureKind::Busy));
    assert!(result.all_rows.is_empty());
    assert!(page.clicks().is_empty());
}

#[tokio::test]
async fn lost_session_is_tagged_and_not_retried() {
    let root = tempfile::tempdir().unwrap();
    let page = permit_page(root.path());
    let session = session(&page, root.path());
    page.kill();

    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;

    assert_eq!(result.error_kind, Some(FailureKind::SessionLost));
    assert!(result.error.unwrap().contains("session"));
    assert!(!root.path().join("screenshots").exists());
}

#[tokio::test]
async fn missing_results_table_fails_the_run_with_a_screenshot() {
    let root = tempfile::tempdir().unwrap();
    let page = StubPage::new()
        .fixture("dashboard", DASHBOARD)
        .fixture("permit-landing", &landing("permit-landing"))
        .route(PERMIT_HOME, "dashboard")
        .start_at("dashboard");
    let session = session(&page, root.path());

    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;

    assert_eq!(result.error_kind, Some(FailureKind::PrimarySignalMissing));
    assert!(result.all_rows.is_empty());
    let shots: Vec<_> = std::fs::read_dir(root.path().join("screenshots"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(shots.len(), 1);
    assert!(shots[0].ends_with("-permit-results-table.png"), "{shots:?}");
    assert_eq!(page.current_fixture().as_deref(), Some("permit-landing"));
}

#[tokio::test]
async fn rows_survive_a_later_stage_failure() {
    let root = tempfile::tempdir().unwrap();
    let page = StubPage::new()
        .fixture("dashboard", DASHBOARD)
        .fixture("permit-landing", &landing("permit-results"))
        .fixture("permit-results", &results("permit-results", "no link"))
        .route(PERMIT_HOME, "dashboard")
        .start_at("dashboard");
    let session = session(&page, root.path());

    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;

    assert_eq!(result.error_kind, Some(FailureKind::StageFailed));
    assert!(result.error.as_deref().unwrap().starts_with("open record"));
    assert_eq!(result.all_rows.len(), 1);
    assert!(result.workflow.is_empty());
}

#[tokio::test]
async fn result_serialises_for_front_ends() {
    let root = tempfile::tempdir().unwrap();
    let page = permit_page(root.path());
    let session = session(&page, root.path());

    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["module"], "permit");
    assert_eq!(json["filters"]["action"], "sec verification");
    assert_eq!(json["all_rows"][0]["File No"], "BP/2024/001");
    assert!(json["error"].is_null());
}

#[tokio::test]
async fn failed_download_keeps_the_row_and_moves_on() {
    let root = tempfile::tempdir().unwrap();
    let detail = permit_detail()
        .replace(
            r#"data-stub-download="b.pdf" data-stub-download-pending"#,
            r#"data-stub-download="missing/b.pdf""#,
        )
        .replace(
            "</tbody></table>",
            r#"<tr><td>3</td><td>Section</td><td>07/01/2024</td>
                    <td><a data-stub-download="c.pdf"><i class="fa fa-download"></i></a></td></tr>
              </tbody></table>"#,
        );
    let page = permit_page(root.path()).fixture("detail", &detail);
    let session = session(&page, root.path());
    let options = RunOptions {
        download_attachments: true,
    };

    let result = run_permit(&session, sec_verification(), &options).await;

    assert!(result.is_complete(), "unexpected failure: {:?}", result.error);
    let flags: Vec<bool> = result.attachments.iter().map(|a| a.downloaded).collect();
    assert_eq!(flags, vec![true, false, true]);
    assert_eq!(result.attachments[1].description, "Elevation");
    assert_eq!(result.downloaded_files, vec!["a.pdf", "c.pdf"]);
}

#[tokio::test]
async fn collapsed_panel_is_closed_again_after_reading() {
    let root = tempfile::tempdir().unwrap();
    let page = permit_page(root.path());
    let session = session(&page, root.path());

    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;

    assert!(result.is_complete(), "unexpected failure: {:?}", result.error);
    assert_eq!(result.attachments.len(), 2);
    // One click to open the panel, one to fold it back.
    assert_eq!(count(&page.clicks(), "Site Plans"), 2);
}

#[tokio::test]
async fn headerless_results_use_the_module_defaults() {
    let root = tempfile::tempdir().unwrap();
    let headerless = results("permit-results", OPEN_DETAIL).replace(
        "<thead><tr><th>S.No</th><th>File No</th><th>Applicant Name</th><th>Action</th></tr></thead>",
        "",
    );
    let page = permit_page(root.path()).fixture("permit-results", &headerless);
    let session = session(&page, root.path());

    let result = run_permit(&session, sec_verification(), &RunOptions::default()).await;

    assert!(result.is_complete(), "unexpected failure: {:?}", result.error);
    assert!(result.default_headers);
    assert_eq!(result.headers, PERMIT_DEFAULT_HEADERS);
    assert_eq!(result.all_rows.len(), 1);
    assert_eq!(result.all_rows[0]["File No"], "BP/2024/001");
    assert_eq!(result.all_rows[0]["Applicant Name"], "Ram Lal");
    assert_eq!(result.all_rows[0]["Status"], "");
}
