//! Scenario runner: sign in, enter `=TODAY()`, verify the rendered date

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use sheetprobe_common::{Credentials, RetryBudget};

use crate::driver::DriverTransport;
use crate::error::{E2eError, E2eResult};
use crate::layout::Profile;
use crate::login::LoginFlow;
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};
use crate::protocol::PageId;
use crate::session::{SessionState, SpreadsheetSession};

/// Result of executing one scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of a whole scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    /// Value read back from the cell, when one was verified
    pub observed: Option<String>,
    /// Today's date in the configured format
    pub expected: String,
    /// Where the spreadsheet session stopped; `None` if login failed
    pub final_state: Option<SessionState>,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub profile: Profile,
    pub retry: RetryBudget,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            profile: Profile::default(),
            retry: RetryBudget::default(),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

pub const SCENARIO_NAME: &str = "today-formula-renders-current-date";

/// Runs the TODAY() verification scenario end to end
pub struct ScenarioRunner {
    config: RunnerConfig,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Launch a browser and run the scenario against today's local date.
    pub async fn run(&self, credentials: &Credentials) -> E2eResult<ScenarioResult> {
        let mut driver = PlaywrightHandle::spawn(self.config.playwright.clone()).await?;
        let today = chrono::Local::now().date_naive();

        let result = self
            .run_with_driver(&mut driver, PageId::INITIAL, credentials, today)
            .await;

        if let Err(e) = driver.shutdown().await {
            warn!("Browser shutdown failed: {}", e);
        }
        result
    }

    /// Run the scenario on an already launched browser.
    ///
    /// Step failures, including a date mismatch, are reported in the
    /// returned [`ScenarioResult`] rather than as errors.
    pub async fn run_with_driver<D: DriverTransport>(
        &self,
        driver: &mut D,
        portal_page: PageId,
        credentials: &Credentials,
        today: NaiveDate,
    ) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        let profile = &self.config.profile;
        let expected = profile.date_format.format_date(today);
        let mut steps = Vec::new();

        info!("Running {}", SCENARIO_NAME);

        let login = LoginFlow::new(portal_page, credentials, &profile.login, &profile.timings);
        let mut outcome = record(&mut steps, "login.goto", timed(login.goto(driver)).await);
        if outcome.is_ok() {
            outcome = record(&mut steps, "login.login", timed(login.login(driver)).await);
        }

        let mut observed = None;
        let mut app_page = None;
        let mut final_state = None;
        if outcome.is_ok() {
            let mut session = SpreadsheetSession::new(driver, portal_page, profile);
            outcome = self.drive_session(&mut session, &mut steps).await;
            if session.state() == SessionState::ValueVerified {
                observed = session.cell_value().ok();
            }
            app_page = session.app_page();
            final_state = Some(session.state());
        }

        if let Some(actual) = &observed {
            info!("Value in cell after {}: {}", profile.sheet.formula, actual);
            info!("Expected today: {}", expected);
            if outcome.is_ok() && *actual != expected {
                outcome = Err(E2eError::AssertionFailed {
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
        }

        let error = outcome.err().map(|e| e.to_string());
        let success = error.is_none();
        let screenshot_path = if success {
            None
        } else {
            self.capture_failure(driver, app_page.unwrap_or(portal_page))
                .await
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &error {
            None => info!("✓ {} ({} ms)", SCENARIO_NAME, duration_ms),
            Some(e) => error!("✗ {} - {}", SCENARIO_NAME, e),
        }

        Ok(ScenarioResult {
            name: SCENARIO_NAME.to_string(),
            success,
            duration_ms,
            steps,
            observed,
            expected,
            final_state,
            error,
            screenshot_path,
        })
    }

    async fn drive_session<D: DriverTransport>(
        &self,
        session: &mut SpreadsheetSession<'_, D>,
        steps: &mut Vec<StepResult>,
    ) -> E2eResult<()> {
        record(steps, "open_app", timed(session.open_app()).await)?;
        record(steps, "create_workbook", timed(session.create_workbook()).await)?;
        record(steps, "enter_formula", timed(session.enter_formula()).await)?;
        record(steps, "dismiss_popup", timed(session.dismiss_popup()).await)?;
        record(
            steps,
            "auto_fit_first_column",
            timed(session.auto_fit_first_column()).await,
        )?;
        record(
            steps,
            "read_verified_date",
            timed(session.read_verified_date(&self.config.retry)).await,
        )?;
        Ok(())
    }

    /// Best-effort screenshot of `page` for diagnosis
    async fn capture_failure<D: DriverTransport>(
        &self,
        driver: &mut D,
        page: PageId,
    ) -> Option<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
            warn!("Cannot create {}: {}", self.config.output_dir.display(), e);
            return None;
        }

        let path = self.config.output_dir.join(format!("{}-failure.png", SCENARIO_NAME));
        match driver.screenshot(page, &path.to_string_lossy()).await {
            Ok(()) => {
                info!("Failure screenshot: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failure screenshot not captured: {}", e);
                None
            }
        }
    }

    /// Write scenario results to a JSON file
    pub fn write_results(&self, result: &ScenarioResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("scenario-results.json");
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Await `step`, measuring how long it took.
async fn timed<T, F>(step: F) -> (E2eResult<T>, u64)
where
    F: Future<Output = E2eResult<T>>,
{
    let start = Instant::now();
    let outcome = step.await;
    (outcome, start.elapsed().as_millis() as u64)
}

/// Append a [`StepResult`] for a timed step and pass its outcome through.
fn record<T>(
    steps: &mut Vec<StepResult>,
    name: &str,
    (outcome, duration_ms): (E2eResult<T>, u64),
) -> E2eResult<T> {
    debug!("Step {} finished in {} ms", name, duration_ms);
    steps.push(StepResult {
        success: outcome.is_ok(),
        step_name: name.to_string(),
        duration_ms,
        error: outcome.as_ref().err().map(|e| e.to_string()),
    });
    outcome
}
