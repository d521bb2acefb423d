//! SheetProbe E2E
//!
//! Verifies that a canvas-rendered spreadsheet in the browser computes
//! `=TODAY()` correctly. The grid has no readable DOM text, so the cell is
//! copied and read back through the system clipboard.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ScenarioRunner (Rust)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LoginFlow            goto() / login()                      │
//! │  SpreadsheetSession   open_app() -> create_workbook()       │
//! │                       -> enter_formula() -> dismiss_popup() │
//! │                       -> auto_fit_first_column()            │
//! │                       -> read_verified_date()               │
//! │    ├── CanvasInteractor   clicks, shortcuts, context menu   │
//! │    └── ClipboardReader    focus, copy, read clipboard       │
//! │         └── poll(RetryBudget) + DateFormat::parse           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  DriverTransport  ── JSON lines ──>  Playwright (Node)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod canvas;
pub mod clipboard;
pub mod driver;
pub mod error;
pub mod layout;
pub mod login;
pub mod playwright;
pub mod protocol;
pub mod runner;
pub mod session;

pub use canvas::{CanvasInteractor, InteractiveSurface};
pub use clipboard::ClipboardReader;
pub use driver::DriverTransport;
pub use error::{E2eError, E2eResult};
pub use layout::Profile;
pub use runner::ScenarioRunner;
pub use session::{SessionState, SpreadsheetSession};
