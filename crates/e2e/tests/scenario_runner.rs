//! Whole-scenario runs against a scripted driver

mod common;

use std::time::Duration;

use chrono::NaiveDate;
use common::{FakeBrowser, APP_PAGE};
use sheetprobe_common::{Credentials, RetryBudget};
use sheetprobe_e2e::layout::Timings;
use sheetprobe_e2e::protocol::{DriverCommand, FailureKind, PageId};
use sheetprobe_e2e::runner::{RunnerConfig, ScenarioResult, SCENARIO_NAME};
use sheetprobe_e2e::{Profile, ScenarioRunner, SessionState};
use tempfile::TempDir;

fn credentials() -> Credentials {
    Credentials {
        url: "https://www.office.com".to_string(),
        username: "probe@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

fn runner(output: &TempDir) -> ScenarioRunner {
    let mut profile = Profile {
        timings: Timings::default().without_settling(),
        ..Profile::default()
    };
    profile.sheet.copy_shortcut = Some("Control+C".to_string());

    ScenarioRunner::with_config(RunnerConfig {
        profile,
        retry: RetryBudget::new(3, Duration::ZERO).unwrap(),
        output_dir: output.path().to_path_buf(),
        ..RunnerConfig::default()
    })
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
}

async fn run(browser: &mut FakeBrowser, output: &TempDir) -> ScenarioResult {
    runner(output)
        .run_with_driver(browser, PageId::INITIAL, &credentials(), today())
        .await
        .unwrap()
}

fn screenshots(browser: &FakeBrowser) -> Vec<PageId> {
    browser
        .log
        .iter()
        .filter_map(|c| match c {
            DriverCommand::Screenshot { page, .. } => Some(*page),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn matching_date_passes() {
    let output = TempDir::new().unwrap();
    let mut browser = FakeBrowser::with_clipboard(&["", "05/03/2025"]);

    let result = run(&mut browser, &output).await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.name, SCENARIO_NAME);
    assert_eq!(result.expected, "05/03/2025");
    assert_eq!(result.observed.as_deref(), Some("05/03/2025"));
    assert!(result.error.is_none());
    assert_eq!(result.final_state, Some(SessionState::ValueVerified));
    assert!(result.screenshot_path.is_none());

    let names: Vec<_> = result.steps.iter().map(|s| s.step_name.as_str()).collect();
    assert_eq!(
        names,
        [
            "login.goto",
            "login.login",
            "open_app",
            "create_workbook",
            "enter_formula",
            "dismiss_popup",
            "auto_fit_first_column",
            "read_verified_date",
        ]
    );
    assert!(result.steps.iter().all(|s| s.success));
    assert!(screenshots(&browser).is_empty());
}

#[tokio::test]
async fn login_fills_credentials_in_order() {
    let output = TempDir::new().unwrap();
    let mut browser = FakeBrowser::with_clipboard(&["05/03/2025"]);

    run(&mut browser, &output).await;

    match browser.log.first() {
        Some(DriverCommand::Goto { page, url, .. }) => {
            assert_eq!(*page, PageId::INITIAL);
            assert_eq!(url, "https://www.office.com");
        }
        other => panic!("expected navigation first, got {:?}", other),
    }

    let filled: Vec<_> = browser
        .log
        .iter()
        .filter_map(|c| match c {
            DriverCommand::Fill { value, .. } => Some(value.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(filled, ["probe@example.com", "hunter2"]);
}

#[tokio::test]
async fn different_date_fails_with_screenshot() {
    let output = TempDir::new().unwrap();
    let mut browser = FakeBrowser::with_clipboard(&["04/03/2025"]);

    let result = run(&mut browser, &output).await;

    assert!(!result.success);
    assert_eq!(result.observed.as_deref(), Some("04/03/2025"));
    assert_eq!(result.expected, "05/03/2025");
    let error = result.error.unwrap();
    assert!(error.contains("05/03/2025") && error.contains("04/03/2025"));

    assert_eq!(screenshots(&browser), [PageId(APP_PAGE)]);
    let path = result.screenshot_path.unwrap();
    assert!(path.starts_with(output.path()));
}

#[tokio::test]
async fn exhausted_read_fails_scenario() {
    let output = TempDir::new().unwrap();
    let mut browser = FakeBrowser::with_clipboard(&["####", "####", "####"]);

    let result = run(&mut browser, &output).await;

    assert!(!result.success);
    assert!(result.observed.is_none());
    assert_eq!(result.final_state, Some(SessionState::VerificationFailed));
    let last = result.steps.last().unwrap();
    assert_eq!(last.step_name, "read_verified_date");
    assert!(!last.success);
    assert_eq!(browser.count("read_clipboard"), 3);
}

#[tokio::test]
async fn login_timeout_stops_before_session() {
    let output = TempDir::new().unwrap();
    let mut browser = FakeBrowser::default().fail("wait_visible", 1, FailureKind::Timeout);

    let result = run(&mut browser, &output).await;

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    assert!(result.final_state.is_none());
    assert_eq!(result.steps[0].step_name, "login.goto");
    assert!(result.steps[0].error.as_deref().unwrap().contains("Timeout"));
    assert_eq!(browser.count("click_expect_page"), 0);
    assert_eq!(screenshots(&browser), [PageId::INITIAL]);
}

#[tokio::test]
async fn results_are_written_as_json() {
    let output = TempDir::new().unwrap();
    let mut browser = FakeBrowser::with_clipboard(&["05/03/2025"]);
    let runner = runner(&output);

    let result = runner
        .run_with_driver(&mut browser, PageId::INITIAL, &credentials(), today())
        .await
        .unwrap();
    let path = runner.write_results(&result).unwrap();

    let written: ScenarioResult =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert!(written.success);
    assert_eq!(written.steps.len(), result.steps.len());
    assert_eq!(written.observed, result.observed);
    assert_eq!(written.final_state, Some(SessionState::ValueVerified));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(
        output.path().join("scenario-results.json"),
    )
    .unwrap())
    .unwrap();
    assert_eq!(raw["final_state"], "value_verified");
}
