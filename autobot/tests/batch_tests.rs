mod common;

use autobot::batch::{prepare_tasks, run_batch};
use autobot::{AutomationError, BatchRequest, FileStatus};
use common::{fast_config, FakeBrowser, FakeInput, Journal};
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn receipts(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
    }
    dir
}

fn request(dir: &tempfile::TempDir) -> BatchRequest {
    BatchRequest::new("operador", "s3cret", dir.path().to_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_batch_continues_past_a_failed_file() {
    let dir = receipts(&["1.2024.pdf", "2.2024.pdf", "3.2024.pdf", "notes.txt"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    assert_eq!(tasks.len(), 3);
    let order: Vec<String> = tasks.iter().map(|t| t.file_name.clone()).collect();
    let unlucky = tasks[1].case_id.as_ref().unwrap().as_str().to_string();

    let journal = Journal::default();
    let browser = FakeBrowser::new(journal.clone()).without_record(&unlucky);
    let input = FakeInput::new(journal.clone());

    let report = run_batch(
        Arc::new(browser),
        Arc::new(input),
        &config,
        &request,
        tasks,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());
    assert_eq!(report.tasks[1].status, FileStatus::Failed);

    // processed in discovery order, one search each
    let reported: Vec<String> = report.tasks.iter().map(|t| t.file_name.clone()).collect();
    assert_eq!(reported, order);
    let searched: Vec<String> = journal
        .with_prefix("search:")
        .into_iter()
        .map(|s| s.trim_start_matches("search:").to_string())
        .collect();
    let expected: Vec<String> = report
        .tasks
        .iter()
        .map(|t| t.case_id.as_ref().unwrap().as_str().to_string())
        .collect();
    assert_eq!(searched, expected);

    // the file after the failure starts from the top-level document
    let entries = journal.entries();
    let third = journal
        .position(&format!("search:{}", expected[2]))
        .unwrap();
    let last_reset = entries[..third].iter().rposition(|e| e == "frame:top").unwrap();
    assert!(entries[last_reset..third]
        .iter()
        .all(|e| !e.starts_with("frame:css:")));

    assert_eq!(journal.with_prefix("quit").len(), 1);
    assert_eq!(entries.last().map(String::as_str), Some("quit"));
}

#[tokio::test]
async fn test_batch_logs_in_before_processing() {
    let dir = receipts(&["100.2024.pdf"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    let journal = Journal::default();

    let report = run_batch(
        Arc::new(FakeBrowser::new(journal.clone())),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(report.is_success());
    let entries = journal.entries();
    assert_eq!(entries[0], format!("navigate:{}", config.base_url));
    assert_eq!(entries[1], "keys:#txtUsuario:operador");
    assert_eq!(entries[2], "keys:#pwdSenha:s3cret");
    assert_eq!(entries[3], "click:#sbmAcessar");
    assert!(journal.position("search:100/2024").unwrap() > 3);
}

#[tokio::test]
async fn test_empty_directory_yields_empty_report() {
    let dir = receipts(&["readme.txt"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    assert!(tasks.is_empty());
    let journal = Journal::default();

    let report = run_batch(
        Arc::new(FakeBrowser::new(journal.clone())),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.total(), 0);
    assert!(report.is_success());
    assert!(journal.with_prefix("search:").is_empty());
    assert_eq!(journal.with_prefix("quit").len(), 1);
}

#[tokio::test]
async fn test_missing_directory_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let request = BatchRequest::new("u", "p", missing.to_str().unwrap()).unwrap();

    assert!(matches!(
        prepare_tasks(&request, &fast_config()),
        Err(AutomationError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_session_closed_when_login_fails() {
    let dir = receipts(&["1.2024.pdf"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    let journal = Journal::default();
    let browser = FakeBrowser::new(journal.clone()).failing_navigate();

    let result = run_batch(
        Arc::new(browser),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(AutomationError::PlatformError(ref m)) if m == "connection refused"));
    assert_eq!(journal.entries(), vec!["quit"]);
}

#[tokio::test]
async fn test_teardown_error_surfaces_after_clean_run() {
    let dir = receipts(&["1.2024.pdf"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    let journal = Journal::default();
    let browser = FakeBrowser::new(journal.clone()).failing_quit();

    let result = run_batch(
        Arc::new(browser),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(AutomationError::PlatformError(ref m)) if m == "driver went away"));
    assert!(journal.position("search:1/2024").is_some());
}

#[tokio::test]
async fn test_teardown_error_does_not_mask_login_error() {
    let dir = receipts(&["1.2024.pdf"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    let journal = Journal::default();
    let browser = FakeBrowser::new(journal.clone())
        .failing_navigate()
        .failing_quit();

    let result = run_batch(
        Arc::new(browser),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(AutomationError::PlatformError(ref m)) if m == "connection refused"));
}

#[tokio::test]
async fn test_report_serializes_case_ids() {
    let dir = receipts(&["100.2024.pdf"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    let journal = Journal::default();

    let report = run_batch(
        Arc::new(FakeBrowser::new(journal.clone())),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["tasks"][0]["case_id"], "100/2024");
    assert_eq!(json["tasks"][0]["status"], "Succeeded");
    assert_eq!(json["tasks"][0]["state"], "Done");
}

#[tokio::test]
async fn test_cancellation_stops_after_the_current_file() {
    let dir = receipts(&["1.2024.pdf", "2.2024.pdf", "3.2024.pdf"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    let first = tasks[0].case_id.as_ref().unwrap().as_str().to_string();
    let journal = Journal::default();
    let cancel = CancellationToken::new();
    let browser = FakeBrowser::new(journal.clone()).cancelling_on_search(cancel.clone());

    let report = run_batch(
        Arc::new(browser),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        cancel,
    )
    .await
    .unwrap();

    // the file underway is finished, not abandoned mid-dialog
    assert_eq!(journal.with_prefix("search:"), vec![format!("search:{first}")]);
    assert_eq!(report.tasks[0].status, FileStatus::Succeeded);
    for task in &report.tasks[1..] {
        assert_eq!(task.status, FileStatus::Failed);
        assert!(task.last_error.as_deref().unwrap().starts_with("Cancelled"));
    }
    assert_eq!(journal.with_prefix("quit").len(), 1);
    assert_eq!(journal.entries().last().map(String::as_str), Some("quit"));
}

#[tokio::test]
async fn test_cancelled_before_start_skips_login_but_closes_session() {
    let dir = receipts(&["1.2024.pdf"]);
    let request = request(&dir);
    let config = fast_config();
    let tasks = prepare_tasks(&request, &config).unwrap();
    let journal = Journal::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_batch(
        Arc::new(FakeBrowser::new(journal.clone())),
        Arc::new(FakeInput::new(journal.clone())),
        &config,
        &request,
        tasks,
        cancel,
    )
    .await
    .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(journal.entries(), vec!["quit"]);
}
