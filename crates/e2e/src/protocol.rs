//! Line-delimited JSON protocol spoken with the Playwright driver process
//!
//! Each request is one JSON object on its own line, tagged with `op` and a
//! monotonically increasing `id`. The driver answers every request with a
//! single response line carrying the same `id`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{E2eError, E2eResult};

/// Handle of a page (tab) owned by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl PageId {
    /// The page opened together with the browser context
    pub const INITIAL: PageId = PageId(1);
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// How to find an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    Css { selector: String },
    #[serde(rename = "xpath")]
    XPath { expression: String },
    Role { role: String, name: String },
    TestId { id: String },
    Text { text: String },
    /// First match of `inner`
    First { inner: Box<Locator> },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath {
            expression: expression.into(),
        }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId { id: id.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text { text: text.into() }
    }

    pub fn first(self) -> Self {
        Locator::First {
            inner: Box::new(self),
        }
    }

    /// Selectors starting with `//` are XPath, everything else is CSS.
    pub fn from_selector(selector: &str) -> Self {
        if selector.starts_with("//") {
            Locator::xpath(selector)
        } else {
            Locator::css(selector)
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => write!(f, "{}", selector),
            Locator::XPath { expression } => write!(f, "xpath={}", expression),
            Locator::Role { role, name } => write!(f, "role={}[name={:?}]", role, name),
            Locator::TestId { id } => write!(f, "data-testid={}", id),
            Locator::Text { text } => write!(f, "text={:?}", text),
            Locator::First { inner } => write!(f, "{} >> first", inner),
        }
    }
}

/// An element on a page, optionally inside nested iframes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub page: PageId,

    /// iframe selectors from the page down to the element's frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<String>,

    pub locator: Locator,
}

impl Target {
    pub fn on_page(page: PageId, locator: Locator) -> Self {
        Self {
            page,
            frames: Vec::new(),
            locator,
        }
    }

    pub fn in_frames(page: PageId, frames: Vec<String>, locator: Locator) -> Self {
        Self {
            page,
            frames,
            locator,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.page)?;
        for frame in &self.frames {
            write!(f, " >> frame[{}]", frame)?;
        }
        write!(f, " >> {}", self.locator)
    }
}

/// Offset in CSS pixels from an element's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

/// A single driver operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DriverCommand {
    Goto {
        page: PageId,
        url: String,
        timeout_ms: u64,
    },
    WaitVisible {
        target: Target,
        timeout_ms: u64,
    },
    /// Never fails on a missing element; answers `false` instead.
    IsVisible {
        target: Target,
    },
    Click {
        target: Target,
        #[serde(default)]
        button: MouseButton,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
        timeout_ms: u64,
    },
    Fill {
        target: Target,
        value: String,
        timeout_ms: u64,
    },
    Press {
        page: PageId,
        key: String,
    },
    Type {
        page: PageId,
        text: String,
    },
    /// Click `target` while awaiting the context's next page; answers with
    /// the new page's handle.
    ClickExpectPage {
        target: Target,
        timeout_ms: u64,
    },
    WaitForLoadState {
        page: PageId,
        state: LoadState,
        timeout_ms: u64,
    },
    ReadClipboard {
        page: PageId,
    },
    Screenshot {
        page: PageId,
        path: String,
    },
    Close,
}

impl DriverCommand {
    /// Bounded wait the driver itself applies, in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        match self {
            DriverCommand::Goto { timeout_ms, .. }
            | DriverCommand::WaitVisible { timeout_ms, .. }
            | DriverCommand::Click { timeout_ms, .. }
            | DriverCommand::Fill { timeout_ms, .. }
            | DriverCommand::ClickExpectPage { timeout_ms, .. }
            | DriverCommand::WaitForLoadState { timeout_ms, .. } => *timeout_ms,
            _ => 0,
        }
    }

    /// Short label for logs; never includes typed or filled values.
    pub fn describe(&self) -> String {
        match self {
            DriverCommand::Goto { url, .. } => format!("goto:{}", url),
            DriverCommand::WaitVisible { target, .. } => format!("wait_visible:{}", target),
            DriverCommand::IsVisible { target } => format!("is_visible:{}", target),
            DriverCommand::Click {
                target, button, ..
            } => format!("click({:?}):{}", button, target),
            DriverCommand::Fill { target, .. } => format!("fill:{}", target),
            DriverCommand::Press { key, .. } => format!("press:{}", key),
            DriverCommand::Type { text, .. } => format!("type:{} chars", text.chars().count()),
            DriverCommand::ClickExpectPage { target, .. } => {
                format!("click_expect_page:{}", target)
            }
            DriverCommand::WaitForLoadState { page, state, .. } => {
                format!("wait_for_load_state:{}:{:?}", page, state)
            }
            DriverCommand::ReadClipboard { page } => format!("read_clipboard:{}", page),
            DriverCommand::Screenshot { path, .. } => format!("screenshot:{}", path),
            DriverCommand::Close => "close".to_string(),
        }
    }
}

/// Request envelope written to the driver's stdin
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub command: &'a DriverCommand,
}

/// Failure categories reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Timeout,
    Permission,
    Closed,
    #[serde(other)]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Response line read from the driver's stdout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<DriverFailure>,
}

impl Response {
    /// Map the response onto the run's error taxonomy.
    pub fn into_result(self, what: &str) -> E2eResult<Value> {
        if self.ok {
            return Ok(self.value);
        }

        let failure = self.error.unwrap_or(DriverFailure {
            kind: FailureKind::Failed,
            message: "driver reported failure without details".to_string(),
        });
        let message = format!("{}: {}", what, failure.message);

        Err(match failure.kind {
            FailureKind::Timeout => E2eError::Timeout(message),
            FailureKind::Permission => E2eError::ClipboardDenied(message),
            FailureKind::Closed => E2eError::TargetClosed(message),
            FailureKind::Failed => E2eError::Playwright(message),
        })
    }
}

/// First line printed by the driver once the browser is up
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyLine {
    pub ready: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn click_request_wire_shape() {
        let command = DriverCommand::Click {
            target: Target::in_frames(
                PageId(2),
                vec!["iframe[title=\"Office on the web Frame\"]".to_string()],
                Locator::css("canvas.ewr-sheettable").first(),
            ),
            button: MouseButton::Right,
            position: Some(Point::new(55.0, 20.0)),
            timeout_ms: 5000,
        };
        let line = serde_json::to_value(Request {
            id: 7,
            command: &command,
        })
        .unwrap();

        assert_eq!(
            line,
            json!({
                "id": 7,
                "op": "click",
                "target": {
                    "page": 2,
                    "frames": ["iframe[title=\"Office on the web Frame\"]"],
                    "locator": {
                        "kind": "first",
                        "inner": { "kind": "css", "selector": "canvas.ewr-sheettable" }
                    }
                },
                "button": "right",
                "position": { "x": 55.0, "y": 20.0 },
                "timeout_ms": 5000
            })
        );
    }

    #[test]
    fn top_level_target_omits_frames() {
        let command = DriverCommand::IsVisible {
            target: Target::on_page(PageId::INITIAL, Locator::role("link", "Sign in")),
        };
        let value = serde_json::to_value(&command).unwrap();
        assert!(value["target"].get("frames").is_none());
        assert_eq!(value["target"]["locator"]["kind"], "role");
    }

    #[test]
    fn selector_prefix_picks_locator_kind() {
        assert_eq!(
            Locator::from_selector("//span[text()=\"Excel\"]"),
            Locator::xpath("//span[text()=\"Excel\"]")
        );
        assert_eq!(
            Locator::from_selector("button[data-testid=\"0300\"]"),
            Locator::css("button[data-testid=\"0300\"]")
        );
    }

    #[test]
    fn failure_kinds_map_to_error_taxonomy() {
        let failure = |kind: &str| -> Response {
            serde_json::from_value(json!({
                "id": 1,
                "ok": false,
                "error": { "kind": kind, "message": "boom" }
            }))
            .unwrap()
        };

        assert!(matches!(
            failure("timeout").into_result("x"),
            Err(E2eError::Timeout(_))
        ));
        assert!(matches!(
            failure("permission").into_result("x"),
            Err(E2eError::ClipboardDenied(_))
        ));
        assert!(matches!(
            failure("closed").into_result("x"),
            Err(E2eError::TargetClosed(_))
        ));
        assert!(matches!(
            failure("something-new").into_result("x"),
            Err(E2eError::Playwright(_))
        ));
    }

    #[test]
    fn describe_hides_filled_values() {
        let command = DriverCommand::Fill {
            target: Target::on_page(PageId::INITIAL, Locator::role("textbox", "Password")),
            value: "hunter2".to_string(),
            timeout_ms: 1000,
        };
        assert!(!command.describe().contains("hunter2"));
    }
}
