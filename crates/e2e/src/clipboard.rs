//! Reading a cell's rendered value through the system clipboard

use async_trait::async_trait;
use sheetprobe_common::Sampler;
use tracing::debug;

use crate::canvas::{CanvasInteractor, InteractiveSurface};
use crate::driver::DriverTransport;
use crate::error::{E2eError, E2eResult};

/// Copy chord for a host operating system (`std::env::consts::OS` naming)
pub fn copy_shortcut_for(os: &str) -> &'static str {
    match os {
        "macos" | "ios" => "Meta+C",
        _ => "Control+C",
    }
}

/// One "select origin, copy, read clipboard" cycle
#[derive(Debug, Clone)]
pub struct ClipboardReader {
    copy_shortcut: String,
}

impl ClipboardReader {
    pub fn new(copy_shortcut: impl Into<String>) -> Self {
        Self {
            copy_shortcut: copy_shortcut.into(),
        }
    }

    /// Reader using the copy chord of the machine running the browser
    pub fn for_host() -> Self {
        Self::new(copy_shortcut_for(std::env::consts::OS))
    }

    pub fn copy_shortcut(&self) -> &str {
        &self.copy_shortcut
    }

    /// Copy the top-left cell and return the clipboard text verbatim.
    ///
    /// A denied clipboard surfaces as [`E2eError::ClipboardDenied`], never as
    /// an empty sample.
    pub async fn read_once<D: DriverTransport>(
        &self,
        driver: &mut D,
        interactor: &CanvasInteractor,
        surface: &InteractiveSurface,
    ) -> E2eResult<String> {
        interactor.focus_and_move_to_origin(driver, surface).await?;
        driver.press(surface.page(), &self.copy_shortcut).await?;
        let text = driver.read_clipboard(surface.page()).await?;
        debug!("Clipboard holds {:?}", text);
        Ok(text)
    }
}

/// Adapts [`ClipboardReader::read_once`] to the poller, trimming each sample
pub struct ClipboardSampler<'a, D> {
    pub driver: &'a mut D,
    pub reader: &'a ClipboardReader,
    pub interactor: &'a CanvasInteractor,
    pub surface: &'a InteractiveSurface,
}

#[async_trait]
impl<'a, D: DriverTransport> Sampler for ClipboardSampler<'a, D> {
    type Error = E2eError;

    async fn sample(&mut self, attempt: u32) -> Result<String, E2eError> {
        debug!("Clipboard read attempt {}", attempt);
        let raw = self
            .reader
            .read_once(self.driver, self.interactor, self.surface)
            .await?;
        Ok(raw.trim().to_string())
    }
}
