//! Transport seam between the session logic and the browser

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{E2eError, E2eResult};
use crate::protocol::{DriverCommand, LoadState, MouseButton, PageId, Point, Target};

/// Executes driver commands one at a time.
///
/// [`crate::playwright::PlaywrightHandle`] is the real implementation; tests
/// substitute a scripted fake. The provided methods are typed wrappers over
/// [`DriverTransport::execute`].
#[async_trait]
pub trait DriverTransport: Send {
    async fn execute(&mut self, command: DriverCommand) -> E2eResult<Value>;

    async fn goto(&mut self, page: PageId, url: &str, timeout: Duration) -> E2eResult<()> {
        self.execute(DriverCommand::Goto {
            page,
            url: url.to_string(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn wait_visible(&mut self, target: &Target, timeout: Duration) -> E2eResult<()> {
        self.execute(DriverCommand::WaitVisible {
            target: target.clone(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn is_visible(&mut self, target: &Target) -> E2eResult<bool> {
        let value = self
            .execute(DriverCommand::IsVisible {
                target: target.clone(),
            })
            .await?;
        value
            .as_bool()
            .ok_or_else(|| E2eError::Protocol(format!("is_visible answered {}", value)))
    }

    async fn click(
        &mut self,
        target: &Target,
        button: MouseButton,
        position: Option<Point>,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.execute(DriverCommand::Click {
            target: target.clone(),
            button,
            position,
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn fill(&mut self, target: &Target, value: &str, timeout: Duration) -> E2eResult<()> {
        self.execute(DriverCommand::Fill {
            target: target.clone(),
            value: value.to_string(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn press(&mut self, page: PageId, key: &str) -> E2eResult<()> {
        self.execute(DriverCommand::Press {
            page,
            key: key.to_string(),
        })
        .await
        .map(drop)
    }

    async fn type_text(&mut self, page: PageId, text: &str) -> E2eResult<()> {
        self.execute(DriverCommand::Type {
            page,
            text: text.to_string(),
        })
        .await
        .map(drop)
    }

    /// Click `target` and return the page it opens.
    async fn click_expect_page(&mut self, target: &Target, timeout: Duration) -> E2eResult<PageId> {
        let value = self
            .execute(DriverCommand::ClickExpectPage {
                target: target.clone(),
                timeout_ms: millis(timeout),
            })
            .await?;
        serde_json::from_value(value.clone())
            .map_err(|_| E2eError::Protocol(format!("click_expect_page answered {}", value)))
    }

    async fn wait_for_load_state(
        &mut self,
        page: PageId,
        state: LoadState,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.execute(DriverCommand::WaitForLoadState {
            page,
            state,
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn read_clipboard(&mut self, page: PageId) -> E2eResult<String> {
        let value = self.execute(DriverCommand::ReadClipboard { page }).await?;
        match value {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            other => Err(E2eError::Protocol(format!("read_clipboard answered {}", other))),
        }
    }

    async fn screenshot(&mut self, page: PageId, path: &str) -> E2eResult<()> {
        self.execute(DriverCommand::Screenshot {
            page,
            path: path.to_string(),
        })
        .await
        .map(drop)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
