//! Spreadsheet session: open the app, enter a formula, read the result back
//!
//! ```text
//! Start -> NewTabOpened -> EmbeddedAppLoaded -> WorkbookCreated
//!       -> FormulaEntered -> (PopupDismissed | NoPopup) -> ColumnAutoFitted
//!       -> ValueVerified | VerificationFailed
//! ```
//!
//! Steps must be called in this order. Each bounded wait that expires fails
//! the step; the only retry is the clipboard poll in
//! [`SpreadsheetSession::read_verified_date`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sheetprobe_common::{poll, DateFormat, DateToken, PollOutcome, RetryBudget};

use crate::canvas::{CanvasInteractor, InteractiveSurface};
use crate::clipboard::{ClipboardReader, ClipboardSampler};
use crate::driver::DriverTransport;
use crate::error::{E2eError, E2eResult};
use crate::layout::{Profile, SheetLayout, Timings};
use crate::protocol::{LoadState, Locator, MouseButton, PageId, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Start,
    NewTabOpened,
    EmbeddedAppLoaded,
    WorkbookCreated,
    FormulaEntered,
    PopupDismissed,
    NoPopup,
    ColumnAutoFitted,
    ValueVerified,
    VerificationFailed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::ValueVerified | SessionState::VerificationFailed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct SpreadsheetSession<'d, D> {
    driver: &'d mut D,
    portal_page: PageId,
    app_page: Option<PageId>,
    surface: Option<InteractiveSurface>,
    state: SessionState,
    layout: SheetLayout,
    timings: Timings,
    date_format: DateFormat,
    interactor: CanvasInteractor,
    reader: ClipboardReader,
    verified: Option<DateToken>,
}

impl<'d, D: DriverTransport> SpreadsheetSession<'d, D> {
    /// Session driven from an authenticated `portal_page`.
    pub fn new(driver: &'d mut D, portal_page: PageId, profile: &Profile) -> Self {
        let reader = match &profile.sheet.copy_shortcut {
            Some(shortcut) => ClipboardReader::new(shortcut.clone()),
            None => ClipboardReader::for_host(),
        };

        Self {
            driver,
            portal_page,
            app_page: None,
            surface: None,
            state: SessionState::Start,
            layout: profile.sheet.clone(),
            timings: profile.timings.clone(),
            date_format: profile.date_format.clone(),
            interactor: CanvasInteractor::new(&profile.sheet, &profile.timings),
            reader,
            verified: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Tab hosting the app, once opened
    pub fn app_page(&self) -> Option<PageId> {
        self.app_page
    }

    pub fn surface(&self) -> Option<&InteractiveSurface> {
        self.surface.as_ref()
    }

    /// Open the app in a new tab and resolve the grid canvas inside its frame.
    pub async fn open_app(&mut self) -> E2eResult<()> {
        self.require("open_app", &[SessionState::Start])?;
        let result = self.open_app_steps().await;
        self.conclude(result, SessionState::EmbeddedAppLoaded)
    }

    async fn open_app_steps(&mut self) -> E2eResult<()> {
        let launcher = Target::on_page(
            self.portal_page,
            Locator::from_selector(&self.layout.launcher_selector),
        );
        let page = self
            .driver
            .click_expect_page(&launcher, self.timings.app_wait())
            .await?;
        self.app_page = Some(page);
        self.transition(SessionState::NewTabOpened);

        self.driver
            .wait_for_load_state(
                page,
                LoadState::DomContentLoaded,
                self.timings.navigation_timeout(),
            )
            .await?;

        self.surface = Some(InteractiveSurface::new(
            page,
            self.layout.frame_selectors.clone(),
            Locator::css(&self.layout.canvas_selector).first(),
        ));
        Ok(())
    }

    /// Create a blank workbook and wait for its grid to render.
    pub async fn create_workbook(&mut self) -> E2eResult<()> {
        self.require("create_workbook", &[SessionState::EmbeddedAppLoaded])?;
        let result = self.create_workbook_steps().await;
        self.conclude(result, SessionState::WorkbookCreated)
    }

    async fn create_workbook_steps(&mut self) -> E2eResult<()> {
        let surface = self.live_surface("create_workbook")?;
        let button = Target::on_page(
            surface.page(),
            Locator::from_selector(&self.layout.new_workbook_selector),
        );

        self.driver
            .wait_visible(&button, self.timings.app_wait())
            .await?;
        self.driver
            .click(&button, MouseButton::Left, None, self.timings.action_timeout())
            .await?;
        self.driver
            .wait_visible(&surface.target(), self.timings.app_wait())
            .await
    }

    /// Type the configured formula into the top-left cell and commit it.
    pub async fn enter_formula(&mut self) -> E2eResult<()> {
        self.require("enter_formula", &[SessionState::WorkbookCreated])?;
        let result = self.enter_formula_steps().await;
        self.conclude(result, SessionState::FormulaEntered)
    }

    async fn enter_formula_steps(&mut self) -> E2eResult<()> {
        let surface = self.live_surface("enter_formula")?;
        self.interactor
            .focus_and_move_to_origin(self.driver, &surface)
            .await?;
        self.interactor
            .type_text(self.driver, &surface, &self.layout.formula)
            .await?;
        self.interactor
            .press_key(self.driver, &surface, &self.layout.commit_key)
            .await?;
        pause(self.timings.formula_settle()).await;
        Ok(())
    }

    /// Close a popup covering the grid, if one is shown. Returns whether one
    /// was dismissed.
    pub async fn dismiss_popup(&mut self) -> E2eResult<bool> {
        self.require("dismiss_popup", &[SessionState::FormulaEntered])?;
        let result = self.dismiss_popup_steps().await;
        let next = match result {
            Ok(true) => SessionState::PopupDismissed,
            _ => SessionState::NoPopup,
        };
        self.conclude(result, next)
    }

    async fn dismiss_popup_steps(&mut self) -> E2eResult<bool> {
        let surface = self.live_surface("dismiss_popup")?;
        let close = surface.sibling(Locator::css(&self.layout.popup_close_selector).first());

        let visible = match self.driver.is_visible(&close).await {
            Ok(visible) => visible,
            Err(e) if e.is_target_closed() => return Err(e),
            Err(e) => {
                warn!("Popup probe failed, assuming no popup: {}", e);
                false
            }
        };
        if !visible {
            return Ok(false);
        }

        info!("Dismissing popup");
        self.driver
            .click(&close, MouseButton::Left, None, self.timings.action_timeout())
            .await?;
        pause(self.timings.popup_settle()).await;
        Ok(true)
    }

    /// Auto-fit the first column so the date renders in full rather than as
    /// `####`.
    pub async fn auto_fit_first_column(&mut self) -> E2eResult<()> {
        self.require(
            "auto_fit_first_column",
            &[SessionState::PopupDismissed, SessionState::NoPopup],
        )?;
        let result = self.auto_fit_steps().await;
        self.conclude(result, SessionState::ColumnAutoFitted)
    }

    async fn auto_fit_steps(&mut self) -> E2eResult<()> {
        let surface = self.live_surface("auto_fit_first_column")?;
        self.interactor
            .open_context_menu_at(self.driver, &surface, self.layout.column_header_offset)
            .await?;
        self.interactor
            .select_menu_item_by_text(self.driver, &surface, &self.layout.column_width_label)
            .await?;
        self.interactor
            .select_menu_item_by_text(self.driver, &surface, &self.layout.autofit_label)
            .await?;
        pause(self.timings.autofit_settle()).await;
        Ok(())
    }

    /// Poll the clipboard until it holds a valid date or `budget` runs out.
    pub async fn read_verified_date(&mut self, budget: &RetryBudget) -> E2eResult<DateToken> {
        self.require("read_verified_date", &[SessionState::ColumnAutoFitted])?;
        let surface = self.live_surface("read_verified_date")?;

        pause(self.timings.pre_read_settle()).await;

        let format = &self.date_format;
        let mut sampler = ClipboardSampler {
            driver: &mut *self.driver,
            reader: &self.reader,
            interactor: &self.interactor,
            surface: &surface,
        };
        let outcome = poll(budget, &mut sampler, |sample| format.parse(sample)).await;

        let result = match outcome {
            Ok(PollOutcome::Success { value, attempts }) => {
                info!(
                    "Read {} after {} attempt(s)",
                    self.date_format.format_token(&value),
                    attempts
                );
                self.verified = Some(value);
                Ok(value)
            }
            Ok(PollOutcome::Exhausted {
                attempts,
                last_value,
            }) => Err(E2eError::VerificationExhausted {
                attempts,
                last_value,
            }),
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.transition(SessionState::VerificationFailed);
        }
        self.conclude(result, SessionState::ValueVerified)
    }

    /// The verified cell value, rendered in the configured date format
    pub fn cell_value(&self) -> E2eResult<String> {
        self.require("cell_value", &[SessionState::ValueVerified])?;
        self.verified
            .as_ref()
            .map(|token| self.date_format.format_token(token))
            .ok_or_else(|| E2eError::Precondition {
                operation: "cell_value",
                expected: "a verified value".to_string(),
                actual: self.state,
            })
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> E2eResult<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(E2eError::Precondition {
            operation,
            expected: allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
            actual: self.state,
        })
    }

    fn live_surface(&self, operation: &'static str) -> E2eResult<InteractiveSurface> {
        self.surface.clone().ok_or(E2eError::Precondition {
            operation,
            expected: "a resolved surface".to_string(),
            actual: self.state,
        })
    }

    /// Advance to `next` on success; drop the cached surface if the tab or
    /// frame went away.
    fn conclude<T>(&mut self, result: E2eResult<T>, next: SessionState) -> E2eResult<T> {
        match &result {
            Ok(_) => self.transition(next),
            Err(e) if e.is_target_closed() => {
                warn!("Surface invalidated: {}", e);
                self.surface = None;
            }
            Err(_) => {}
        }
        result
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!("Session: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

async fn pause(duration: std::time::Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
