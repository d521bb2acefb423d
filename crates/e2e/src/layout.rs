//! Layout, selector and timing configuration
//!
//! The spreadsheet draws its grid on a canvas, so interaction relies on
//! selectors, pixel offsets and keyboard shortcuts that depend on the
//! application's layout. All of them live here, loadable from YAML, with
//! defaults matching Excel on the web.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sheetprobe_common::DateFormat;

use crate::error::E2eResult;
use crate::protocol::Point;

/// Complete run profile as stored in a YAML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub sheet: SheetLayout,
    pub login: LoginSelectors,
    pub timings: Timings,
    /// Format the spreadsheet renders dates in
    pub date_format: DateFormat,
}

impl Profile {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// Where things are inside the embedded spreadsheet application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Element on the portal page that opens the app in a new tab
    pub launcher_selector: String,

    /// "New blank workbook" button on the app's start page
    pub new_workbook_selector: String,

    /// iframe hosting the editor, outermost first
    pub frame_selectors: Vec<String>,

    /// Canvas the grid is drawn on
    pub canvas_selector: String,

    /// Any close button of a popup shown after formula entry
    pub popup_close_selector: String,

    /// Offset of the first column's header from the canvas origin
    pub column_header_offset: Point,

    /// Where to click to focus the grid; `None` clicks the canvas centre
    pub focus_anchor: Option<Point>,

    pub column_width_label: String,
    pub autofit_label: String,

    /// Formula typed into the top-left cell
    pub formula: String,

    /// Shortcut that selects the top-left cell
    pub origin_shortcut: String,

    /// Key that commits the typed formula
    pub commit_key: String,

    /// Copy shortcut; `None` picks the host platform's default
    pub copy_shortcut: Option<String>,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            launcher_selector: r#"//span[text()="Excel"]"#.to_string(),
            new_workbook_selector: r#"button[data-testid="0300"]"#.to_string(),
            frame_selectors: vec![r#"iframe[title="Office on the web Frame"]"#.to_string()],
            canvas_selector: "canvas.ewr-sheettable".to_string(),
            popup_close_selector:
                r#"button[aria-label="Close"], button[title="Close"], button:has-text("Close")"#
                    .to_string(),
            column_header_offset: Point::new(55.0, 20.0),
            focus_anchor: None,
            column_width_label: "Column Width".to_string(),
            autofit_label: "AutoFit".to_string(),
            formula: "=TODAY()".to_string(),
            origin_shortcut: "Control+Home".to_string(),
            commit_key: "Enter".to_string(),
            copy_shortcut: None,
        }
    }
}

/// Accessible names and test ids on the sign-in pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub sign_in_link: String,
    pub email_textbox: String,
    pub next_button: String,
    pub use_password_button: String,
    pub password_textbox: String,
    pub submit_test_id: String,
    pub stay_signed_in_decline_test_id: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            sign_in_link: "Sign in to your account".to_string(),
            email_textbox: "Enter your email, phone, or".to_string(),
            next_button: "Next".to_string(),
            use_password_button: "Use your password".to_string(),
            password_textbox: "Password".to_string(),
            submit_test_id: "primaryButton".to_string(),
            stay_signed_in_decline_test_id: "secondaryButton".to_string(),
        }
    }
}

/// Bounded waits and settle delays, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Navigation and load-state waits
    pub navigation_timeout_ms: u64,
    /// Sign-in page elements
    pub login_wait_ms: u64,
    /// New-workbook button and grid canvas
    pub app_wait_ms: u64,
    /// Clicks and fills on already-visible elements
    pub action_timeout_ms: u64,
    /// After each keyboard or menu action on the canvas
    pub input_settle_ms: u64,
    pub formula_settle_ms: u64,
    pub popup_settle_ms: u64,
    pub autofit_settle_ms: u64,
    /// Before the first clipboard read
    pub pre_read_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            login_wait_ms: 10_000,
            app_wait_ms: 20_000,
            action_timeout_ms: 10_000,
            input_settle_ms: 100,
            formula_settle_ms: 1_000,
            popup_settle_ms: 500,
            autofit_settle_ms: 500,
            pre_read_settle_ms: 500,
        }
    }
}

impl Timings {
    /// All waits kept, all settle delays zeroed
    pub fn without_settling(self) -> Self {
        Self {
            input_settle_ms: 0,
            formula_settle_ms: 0,
            popup_settle_ms: 0,
            autofit_settle_ms: 0,
            pre_read_settle_ms: 0,
            ..self
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn login_wait(&self) -> Duration {
        Duration::from_millis(self.login_wait_ms)
    }

    pub fn app_wait(&self) -> Duration {
        Duration::from_millis(self.app_wait_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn input_settle(&self) -> Duration {
        Duration::from_millis(self.input_settle_ms)
    }

    pub fn formula_settle(&self) -> Duration {
        Duration::from_millis(self.formula_settle_ms)
    }

    pub fn popup_settle(&self) -> Duration {
        Duration::from_millis(self.popup_settle_ms)
    }

    pub fn autofit_settle(&self) -> Duration {
        Duration::from_millis(self.autofit_settle_ms)
    }

    pub fn pre_read_settle(&self) -> Duration {
        Duration::from_millis(self.pre_read_settle_ms)
    }
}
